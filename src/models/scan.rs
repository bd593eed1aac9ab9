use serde::{Deserialize, Serialize};

use super::{DatabaseSize, StorageEntity, StorageSummary};

pub const TOTAL_STEPS: u8 = 9;
pub const FINAL_STEP: u8 = TOTAL_STEPS - 1;
pub const DATABASE_SIZE_STEP: u8 = TOTAL_STEPS;

pub const STEP_LABELS: [&str; TOTAL_STEPS as usize] = [
    "Initializing",
    "Scanning states_meta table",
    "Scanning states table",
    "Scanning statistics_meta table",
    "Scanning statistics_short_term table",
    "Scanning statistics (long-term) table",
    "Reading entity registry and state machine",
    "Calculating storage for deleted entities",
    "Finalizing and generating summary",
];

pub const DATABASE_SIZE_LABEL: &str = "Fetching database statistics";

pub fn step_label(step: u8) -> &'static str {
    STEP_LABELS
        .get(step as usize)
        .copied()
        .unwrap_or(DATABASE_SIZE_LABEL)
}

/// Raw payload of one scan step. Which fields must be present depends on the
/// step, so everything is optional here and the controller validates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StepResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_steps: Option<u32>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub entities: Option<Vec<StorageEntity>>,
    #[serde(default)]
    pub summary: Option<StorageSummary>,
    #[serde(default)]
    pub entities_found: Option<i64>,
    #[serde(default)]
    pub total_entities: Option<i64>,
    #[serde(default)]
    pub deleted_storage_bytes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanProgress {
    pub step_index: u8,
    pub total_steps: u8,
    pub label: String,
}

impl ScanProgress {
    pub fn for_step(step_index: u8) -> Self {
        Self {
            step_index,
            total_steps: TOTAL_STEPS,
            label: step_label(step_index).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResumeState {
    pub session_id: Option<String>,
    /// -1 when nothing has completed yet.
    pub last_completed_step: i8,
    pub last_failed_step: Option<u8>,
    /// Inventory already returned by step 8 when only the database-size
    /// fetch is left to retry.
    pub pending_inventory: Option<(Vec<StorageEntity>, StorageSummary)>,
}

impl ResumeState {
    pub fn resume_step(&self) -> u8 {
        self.last_failed_step
            .unwrap_or_else(|| (self.last_completed_step + 1).max(0) as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Running(u8),
    Succeeded,
    Failed {
        step: u8,
        session_id: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub database_size: DatabaseSize,
    pub entities: Vec<StorageEntity>,
    pub summary: StorageSummary,
}
