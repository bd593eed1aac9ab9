use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{BulkProgress, DataSource, DatabaseSize, ScanProgress, StorageEntity, StorageSummary};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionType {
    Deleted,
    Disabled,
    NotSelectable,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SelectionBreakdown {
    pub deleted: Vec<StorageEntity>,
    pub disabled: Vec<StorageEntity>,
}

impl SelectionBreakdown {
    pub fn total(&self) -> usize {
        self.deleted.len() + self.disabled.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Discarded,
}

#[derive(Debug, Clone)]
pub enum PanelEvent {
    Progress(ScanProgress),
    Completed {
        entities: Arc<[StorageEntity]>,
        summary: StorageSummary,
    },
    CacheState {
        age: Option<i64>,
        is_stale: bool,
        /// `None` when nothing has been loaded yet.
        source: Option<DataSource>,
    },
    Rows(Arc<[StorageEntity]>),
    Selection(SelectionBreakdown),
    BulkProgress(BulkProgress),
    Error {
        message: String,
        retryable: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageOverview {
    pub entities: Vec<StorageEntity>,
    pub summary: Option<StorageSummary>,
    pub database_size: Option<DatabaseSize>,
    pub source: Option<DataSource>,
    pub cache_age: Option<i64>,
}
