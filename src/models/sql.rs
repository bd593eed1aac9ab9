use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerateSqlResponse {
    pub sql: String,
    #[serde(default)]
    pub storage_saved: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkSqlEntry {
    pub entity_id: String,
    pub sql: String,
    pub storage_saved: i64,
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BulkStatus {
    Success,
    Partial,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkSqlResult {
    pub status: BulkStatus,
    pub entities: Vec<BulkSqlEntry>,
    pub total_storage_saved: i64,
    pub total_count: i64,
    pub success_count: usize,
    pub error_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkProgress {
    pub done: usize,
    pub total: usize,
}
