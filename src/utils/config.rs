use std::path::{Path, PathBuf};

use crate::models::Settings;

const ENV_BASE_URL: &str = "ORPHAN_FINDER_URL";
const ENV_ACCESS_TOKEN: &str = "ORPHAN_FINDER_TOKEN";
const ENV_DATA_DIR: &str = "ORPHAN_FINDER_DATA_DIR";

pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn data_dir() -> PathBuf {
    env_value(ENV_DATA_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".orphan-finder"))
}

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config").join("settings.json")
}

pub fn apply_env_defaults(settings: &mut Settings) {
    if let Some(url) = env_value(ENV_BASE_URL) {
        settings.connection.base_url = url;
    }
    if settings.connection.access_token.trim().is_empty() {
        settings.connection.access_token = env_value(ENV_ACCESS_TOKEN).unwrap_or_default();
    }
    settings.connection.base_url = settings.connection.base_url.trim_end_matches('/').to_string();
}

/// Reads `config/settings.json` under `data_dir`, falling back to defaults
/// when the file is missing. A file that exists but does not parse is an error.
pub fn load_settings(data_dir: &Path) -> anyhow::Result<Settings> {
    let path = settings_path(data_dir);
    let mut settings = if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str::<Settings>(&content)
            .map_err(|e| anyhow::anyhow!("invalid settings file {}: {}", path.display(), e))?
    } else {
        Settings::default()
    };
    apply_env_defaults(&mut settings);
    Ok(settings)
}

pub fn save_settings(data_dir: &Path, settings: &Settings) -> anyhow::Result<()> {
    let path = settings_path(data_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(settings)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.cache.stale_after_ms, 12 * 60 * 60 * 1000);
        assert_eq!(settings.connection.endpoint, "statistics_orphan_finder");
    }

    #[test]
    fn test_partial_settings_file_keeps_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = settings_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"connection": {"base_url": "http://ha.test:8123/", "access_token": "abc", "endpoint": "statistics_orphan_finder", "request_timeout_secs": 10}}"#,
        )
        .unwrap();

        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.connection.request_timeout_secs, 10);
        assert_eq!(settings.connection.access_token, "abc");
        assert_eq!(settings.cache.fresh_within_ms, 5000);
        assert!(!settings.connection.base_url.ends_with('/'));
    }

    #[test]
    fn test_save_then_load_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.connection.access_token = "token".to_string();
        settings.cache.stale_after_ms = 1000;
        save_settings(dir.path(), &settings).unwrap();

        let loaded = load_settings(dir.path()).unwrap();
        assert_eq!(loaded.cache.stale_after_ms, 1000);
        assert_eq!(loaded.connection.access_token, "token");
    }
}
