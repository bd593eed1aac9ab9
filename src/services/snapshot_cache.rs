use std::sync::Arc;

use serde_json::Value;

use crate::database::KeyValueStore;
use crate::models::{
    CacheMetadata, CachedSnapshot, DatabaseSize, SnapshotData, StorageEntity, StorageSummary,
};

pub const CACHE_VERSION: u32 = 1;
pub const DEFAULT_CACHE_KEY: &str = "statistics_orphan_finder_cache";

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Clone)]
pub struct SnapshotCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, DEFAULT_CACHE_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn save(
        &self,
        database_size: Option<&DatabaseSize>,
        entities: &[StorageEntity],
        summary: Option<&StorageSummary>,
    ) -> bool {
        let snapshot = CachedSnapshot {
            version: CACHE_VERSION,
            timestamp: now_millis(),
            data: SnapshotData {
                database_size: database_size.cloned(),
                storage_entities: entities.to_vec(),
                storage_summary: summary.cloned(),
            },
        };

        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("[SnapshotCache] Failed to serialize snapshot: {}", e);
                return false;
            }
        };

        match self.store.set(&self.key, &json) {
            Ok(()) => {
                log::debug!(
                    "[SnapshotCache] Saved {} entities ({} bytes)",
                    entities.len(),
                    json.len()
                );
                true
            }
            Err(e) => {
                log::warn!("[SnapshotCache] Failed to save snapshot: {}", e);
                false
            }
        }
    }

    pub fn load(&self) -> Option<CachedSnapshot> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("[SnapshotCache] Failed to read snapshot: {}", e);
                return None;
            }
        };

        match parse_snapshot(&raw) {
            Ok(snapshot) => {
                log::debug!(
                    "[SnapshotCache] Loaded {} entities, {}",
                    snapshot.data.storage_entities.len(),
                    Self::format_age(Self::age(Some(&snapshot)))
                );
                Some(snapshot)
            }
            Err(reason) => {
                log::info!("[SnapshotCache] Discarding cached snapshot: {}", reason);
                self.clear();
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            log::warn!("[SnapshotCache] Failed to clear snapshot: {}", e);
        }
    }

    pub fn age(snapshot: Option<&CachedSnapshot>) -> Option<i64> {
        snapshot.map(|s| now_millis() - s.timestamp)
    }

    /// A missing snapshot counts as stale.
    pub fn is_stale(max_age_ms: i64, snapshot: Option<&CachedSnapshot>) -> bool {
        match Self::age(snapshot) {
            Some(age) => age > max_age_ms,
            None => true,
        }
    }

    pub fn format_age(age_ms: Option<i64>) -> String {
        let Some(age_ms) = age_ms else {
            return "unknown".to_string();
        };

        let seconds = age_ms.max(0) / 1000;
        let minutes = seconds / 60;
        let hours = minutes / 60;
        let days = hours / 24;

        let (n, unit) = if days > 0 {
            (days, "day")
        } else if hours > 0 {
            (hours, "hour")
        } else if minutes > 0 {
            (minutes, "minute")
        } else {
            (seconds, "second")
        };
        format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
    }

    pub fn metadata(&self) -> Option<CacheMetadata> {
        let snapshot = self.load()?;
        let age = now_millis() - snapshot.timestamp;
        Some(CacheMetadata {
            timestamp: snapshot.timestamp,
            age,
            age_formatted: Self::format_age(Some(age)),
        })
    }
}

// Shape is checked on the untyped value first so a slot written by another
// version is rejected as a whole instead of half-deserialized.
fn parse_snapshot(raw: &str) -> Result<CachedSnapshot, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))?;

    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or("missing version")?;
    if version != u64::from(CACHE_VERSION) {
        return Err(format!("version {} (expected {})", version, CACHE_VERSION));
    }
    if !value.get("timestamp").is_some_and(Value::is_number) {
        return Err("missing timestamp".to_string());
    }

    let data = value
        .get("data")
        .and_then(Value::as_object)
        .ok_or("missing data")?;
    if !data.get("storageEntities").is_some_and(Value::is_array) {
        return Err("storageEntities is not an array".to_string());
    }
    for field in ["databaseSize", "storageSummary"] {
        match data.get(field) {
            Some(v) if v.is_object() || v.is_null() => {}
            Some(_) => return Err(format!("{} has the wrong shape", field)),
            None => return Err(format!("missing {}", field)),
        }
    }

    serde_json::from_value(value).map_err(|e| format!("invalid snapshot: {}", e))
}
