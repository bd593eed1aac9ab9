use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub scan: ScanSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            connection: ConnectionSettings::default(),
            cache: CacheSettings::default(),
            scan: ScanSettings::default(),
        }
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub base_url: String,
    pub access_token: String,
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            base_url: "http://homeassistant.local:8123".to_string(),
            access_token: String::new(),
            endpoint: "statistics_orphan_finder".to_string(),
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub database_file: String,
    pub cache_key: String,
    /// Age after which cached data is shown as outdated.
    pub stale_after_ms: i64,
    /// Age under which data counts as "just refreshed".
    pub fresh_within_ms: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            database_file: "orphan_finder.db".to_string(),
            cache_key: "statistics_orphan_finder_cache".to_string(),
            stale_after_ms: 12 * 60 * 60 * 1000,
            fresh_within_ms: 5 * 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub default_histogram_hours: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            default_histogram_hours: 24,
        }
    }
}
