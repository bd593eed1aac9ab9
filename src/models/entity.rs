use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RegistryStatus {
    Enabled,
    Disabled,
    #[default]
    #[serde(rename = "Not in Registry")]
    NotInRegistry,
}

impl RegistryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryStatus::Enabled => "Enabled",
            RegistryStatus::Disabled => "Disabled",
            RegistryStatus::NotInRegistry => "Not in Registry",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum StateStatus {
    Available,
    Unavailable,
    #[default]
    #[serde(rename = "Not Present")]
    NotPresent,
}

impl StateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateStatus::Available => "Available",
            StateStatus::Unavailable => "Unavailable",
            StateStatus::NotPresent => "Not Present",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrphanOrigin {
    States,
    #[serde(rename = "Long-term")]
    LongTerm,
    #[serde(rename = "Short-term")]
    ShortTerm,
    Both,
    #[serde(rename = "States+Statistics")]
    StatesAndStatistics,
}

impl OrphanOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrphanOrigin::States => "States",
            OrphanOrigin::LongTerm => "Long-term",
            OrphanOrigin::ShortTerm => "Short-term",
            OrphanOrigin::Both => "Both",
            OrphanOrigin::StatesAndStatistics => "States+Statistics",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StorageEntity {
    pub entity_id: String,
    #[serde(default)]
    pub in_entity_registry: bool,
    #[serde(default)]
    pub registry_status: RegistryStatus,
    #[serde(default)]
    pub in_state_machine: bool,
    #[serde(default)]
    pub state_status: StateStatus,
    #[serde(default)]
    pub in_states_meta: bool,
    #[serde(default)]
    pub in_states: bool,
    #[serde(default)]
    pub in_statistics_meta: bool,
    #[serde(default)]
    pub in_statistics_short_term: bool,
    #[serde(default)]
    pub in_statistics_long_term: bool,
    #[serde(default)]
    pub states_count: i64,
    #[serde(default)]
    pub stats_short_count: i64,
    #[serde(default)]
    pub stats_long_count: i64,
    #[serde(default)]
    pub last_state_update: Option<String>,
    #[serde(default)]
    pub last_stats_update: Option<String>,
    // Registry / device metadata
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub disabled_by: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub device_disabled: bool,
    #[serde(default)]
    pub config_entry_state: Option<String>,
    #[serde(default)]
    pub config_entry_title: Option<String>,
    #[serde(default)]
    pub availability_reason: Option<String>,
    #[serde(default)]
    pub unavailable_duration_seconds: Option<f64>,
    #[serde(default)]
    pub update_interval: Option<String>,
    #[serde(default)]
    pub update_interval_seconds: Option<f64>,
    #[serde(default)]
    pub update_count_24h: Option<i64>,
    #[serde(default)]
    pub statistics_eligibility_reason: Option<String>,
    #[serde(default)]
    pub metadata_id: Option<i64>,
    #[serde(default)]
    pub origin: Option<OrphanOrigin>,
}

impl StorageEntity {
    pub fn has_recorded_data(&self) -> bool {
        self.in_states_meta || self.in_statistics_meta
    }

    pub fn is_deleted(&self) -> bool {
        !self.in_entity_registry && !self.in_state_machine
    }

    /// Origin and record count used when asking the backend for a delete statement.
    /// `None` when the entity is not in any recorder table.
    pub fn delete_target(&self) -> Option<(OrphanOrigin, i64)> {
        match (self.in_states_meta, self.in_statistics_meta) {
            (true, true) => Some((
                OrphanOrigin::StatesAndStatistics,
                self.states_count + self.stats_short_count + self.stats_long_count,
            )),
            (true, false) => Some((OrphanOrigin::States, self.states_count)),
            (false, true) => {
                let origin = match (self.in_statistics_long_term, self.in_statistics_short_term) {
                    (true, true) => OrphanOrigin::Both,
                    (true, false) => OrphanOrigin::LongTerm,
                    _ => OrphanOrigin::ShortTerm,
                };
                Some((origin, self.stats_short_count + self.stats_long_count))
            }
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StorageSummary {
    pub total_entities: i64,
    pub in_entity_registry: i64,
    pub registry_enabled: i64,
    pub registry_disabled: i64,
    pub in_state_machine: i64,
    pub state_available: i64,
    pub state_unavailable: i64,
    pub in_states_meta: i64,
    pub in_states: i64,
    pub in_statistics_meta: i64,
    pub in_statistics_short_term: i64,
    pub in_statistics_long_term: i64,
    pub only_in_states: i64,
    pub only_in_statistics: i64,
    pub in_both_states_and_stats: i64,
    pub orphaned_states_meta: i64,
    pub orphaned_statistics_meta: i64,
    pub deleted_from_registry: i64,
    pub deleted_storage_bytes: i64,
    pub disabled_storage_bytes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DatabaseSize {
    pub states: i64,
    pub statistics: i64,
    pub statistics_short_term: i64,
    pub other: i64,
    pub states_size: i64,
    pub statistics_size: i64,
    pub statistics_short_term_size: i64,
    pub other_size: i64,
    pub version: Option<String>,
}

impl DatabaseSize {
    pub fn total_size(&self) -> i64 {
        self.states_size + self.statistics_size + self.statistics_short_term_size + self.other_size
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MessageHistogram {
    #[serde(default)]
    pub hourly_counts: Vec<i64>,
    #[serde(default)]
    pub total_messages: i64,
}
