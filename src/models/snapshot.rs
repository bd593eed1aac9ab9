use serde::{Deserialize, Serialize};

use super::{DatabaseSize, StorageEntity, StorageSummary};

/// Envelope persisted in the snapshot slot. Key names match what earlier
/// panel builds wrote so an existing slot stays readable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedSnapshot {
    pub version: u32,
    pub timestamp: i64,
    pub data: SnapshotData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotData {
    pub database_size: Option<DatabaseSize>,
    pub storage_entities: Vec<StorageEntity>,
    pub storage_summary: Option<StorageSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheMetadata {
    pub timestamp: i64,
    pub age: i64,
    pub age_formatted: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Cache,
}
