use chrono::{DateTime, Local, NaiveDateTime, Utc};

pub fn format_bytes(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let bytes = bytes as f64;
    let exponent = ((bytes.ln() / 1024f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = bytes / 1024f64.powi(exponent as i32);

    if exponent == 0 {
        format!("{} {}", value, UNITS[0])
    } else if value >= 100.0 {
        format!("{:.0} {}", value, UNITS[exponent])
    } else if value >= 10.0 {
        format!("{:.1} {}", value, UNITS[exponent])
    } else {
        format!("{:.2} {}", value, UNITS[exponent])
    }
}

pub fn format_number(num: i64) -> String {
    let digits = num.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if num < 0 {
        out.insert(0, '-');
    }
    out
}

pub fn format_interval(seconds: Option<f64>) -> String {
    let seconds = match seconds {
        Some(s) if s != 0.0 => s,
        _ => return String::new(),
    };

    if seconds < 60.0 {
        format!("{}s", seconds)
    } else if seconds < 3600.0 {
        let minutes = seconds / 60.0;
        if minutes >= 10.0 {
            format!("{:.1}min", minutes)
        } else {
            format!("{:.2}min", minutes)
        }
    } else {
        let hours = seconds / 3600.0;
        if hours >= 10.0 {
            format!("{:.1}h", hours)
        } else {
            format!("{:.2}h", hours)
        }
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

pub fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        format!("{} minute{}", minutes, plural(minutes))
    } else if seconds < 86_400 {
        let hours = seconds / 3600;
        format!("{} hour{}", hours, plural(hours))
    } else {
        let days = seconds / 86_400;
        format!("{} day{}", days, plural(days))
    }
}

/// Parses the recorder's timestamp strings: RFC 3339, or naive
/// `YYYY-MM-DD HH:MM:SS[.f]` / `YYYY-MM-DDTHH:MM:SS[.f]` taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn timestamp_millis(value: Option<&str>) -> i64 {
    value
        .and_then(parse_timestamp)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

pub fn format_date(value: Option<&str>) -> String {
    match value {
        None => String::new(),
        Some(raw) => parse_timestamp(raw)
            .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_precision() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(15 * 1024), "15.0 KB");
        assert_eq!(format_bytes(150 * 1024 * 1024), "150 MB");
    }

    #[test]
    fn test_format_number_groups_thousands() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_234_567), "1,234,567");
        assert_eq!(format_number(-4200), "-4,200");
    }

    #[test]
    fn test_format_interval_and_duration() {
        assert_eq!(format_interval(None), "");
        assert_eq!(format_interval(Some(30.0)), "30s");
        assert_eq!(format_interval(Some(90.0)), "1.50min");
        assert_eq!(format_interval(Some(7200.0)), "2.00h");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(60), "1 minute");
        assert_eq!(format_duration(7200), "2 hours");
        assert_eq!(format_duration(86_400 * 3), "3 days");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let a = parse_timestamp("2024-03-01T12:00:00+00:00").unwrap();
        let b = parse_timestamp("2024-03-01 12:00:00").unwrap();
        let c = parse_timestamp("2024-03-01T12:00:00.000000").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(parse_timestamp("yesterday").is_none());
        assert_eq!(timestamp_millis(None), 0);
        assert_eq!(timestamp_millis(Some("garbage")), 0);
    }
}
