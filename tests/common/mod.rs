#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use statistics_orphan_finder::error::ClientError;
use statistics_orphan_finder::models::{
    DatabaseSize, GenerateSqlResponse, MessageHistogram, OrphanOrigin, RegistryStatus,
    StateStatus, StepResponse, StorageEntity, StorageSummary, FINAL_STEP,
};
use statistics_orphan_finder::services::api_client::AcquisitionClient;
use statistics_orphan_finder::services::panel::PanelHandle;

/// In-process stand-in for the recorder backend. Sessions behave like the
/// real endpoint: opened by step 0, required for steps 1-8, dropped after 8.
pub struct ScriptedClient {
    entities: Vec<StorageEntity>,
    session: Mutex<Option<String>>,
    pub step_calls: Mutex<Vec<(u8, Option<String>)>>,
    pub database_size_calls: Mutex<u32>,
    pub sql_calls: Mutex<Vec<(String, OrphanOrigin)>>,
    step_failures: Mutex<HashMap<u8, VecDeque<String>>>,
    database_size_failures: Mutex<u32>,
    sql_failures: Mutex<HashSet<String>>,
    histogram_delays: Mutex<HashMap<String, u64>>,
    detach_at: Mutex<Option<(u8, PanelHandle)>>,
    malformed_step: Mutex<Option<u8>>,
    pub omit_session_id: Mutex<bool>,
    pub omit_final_payload: Mutex<bool>,
}

impl ScriptedClient {
    pub fn new(entities: Vec<StorageEntity>) -> Self {
        Self {
            entities,
            session: Mutex::new(None),
            step_calls: Mutex::new(Vec::new()),
            database_size_calls: Mutex::new(0),
            sql_calls: Mutex::new(Vec::new()),
            step_failures: Mutex::new(HashMap::new()),
            database_size_failures: Mutex::new(0),
            sql_failures: Mutex::new(HashSet::new()),
            histogram_delays: Mutex::new(HashMap::new()),
            detach_at: Mutex::new(None),
            malformed_step: Mutex::new(None),
            omit_session_id: Mutex::new(false),
            omit_final_payload: Mutex::new(false),
        }
    }

    /// Next call of `step` fails with a 500 carrying `message`.
    pub fn fail_step_once(&self, step: u8, message: &str) {
        self.step_failures
            .lock()
            .unwrap()
            .entry(step)
            .or_default()
            .push_back(message.to_string());
    }

    /// Forget the open session, as a backend restart would.
    pub fn expire_session(&self) {
        *self.session.lock().unwrap() = None;
    }

    pub fn fail_database_size_once(&self) {
        *self.database_size_failures.lock().unwrap() += 1;
    }

    pub fn fail_sql_for(&self, entity_id: &str) {
        self.sql_failures.lock().unwrap().insert(entity_id.to_string());
    }

    pub fn delay_histogram(&self, entity_id: &str, millis: u64) {
        self.histogram_delays
            .lock()
            .unwrap()
            .insert(entity_id.to_string(), millis);
    }

    /// `step` answers with a body whose fields have the wrong types.
    pub fn malformed_payload_at(&self, step: u8) {
        *self.malformed_step.lock().unwrap() = Some(step);
    }

    pub fn clear_malformed_payload(&self) {
        *self.malformed_step.lock().unwrap() = None;
    }

    pub fn detach_during_step(&self, step: u8, handle: PanelHandle) {
        *self.detach_at.lock().unwrap() = Some((step, handle));
    }

    pub fn steps_issued(&self) -> Vec<u8> {
        self.step_calls.lock().unwrap().iter().map(|(step, _)| *step).collect()
    }

    pub fn clear_calls(&self) {
        self.step_calls.lock().unwrap().clear();
        *self.database_size_calls.lock().unwrap() = 0;
    }

    fn summary(&self) -> StorageSummary {
        StorageSummary {
            total_entities: self.entities.len() as i64,
            deleted_from_registry: self.entities.iter().filter(|e| e.is_deleted()).count() as i64,
            ..Default::default()
        }
    }
}

fn backend_error(status: u16, message: impl Into<String>) -> ClientError {
    ClientError::Status {
        status,
        message: message.into(),
    }
}

#[async_trait]
impl AcquisitionClient for ScriptedClient {
    async fn fetch_step(&self, step: u8, session_id: Option<&str>) -> Result<StepResponse, ClientError> {
        self.step_calls
            .lock()
            .unwrap()
            .push((step, session_id.map(str::to_string)));

        if let Some((at, handle)) = self.detach_at.lock().unwrap().as_ref() {
            if *at == step {
                handle.detach();
            }
        }

        let queued = self
            .step_failures
            .lock()
            .unwrap()
            .get_mut(&step)
            .and_then(VecDeque::pop_front);
        if let Some(message) = queued {
            return Err(backend_error(500, message));
        }

        if step == 0 {
            let id = uuid::Uuid::new_v4().to_string();
            *self.session.lock().unwrap() = Some(id.clone());
            return Ok(StepResponse {
                status: Some("initialized".to_string()),
                total_steps: Some(9),
                session_id: if *self.omit_session_id.lock().unwrap() {
                    None
                } else {
                    Some(id)
                },
                ..Default::default()
            });
        }

        // The endpoint hides the session error behind a generic 400.
        let open = self.session.lock().unwrap().clone();
        if session_id.is_none() || session_id.map(str::to_string) != open {
            return Err(backend_error(400, "Invalid parameters provided"));
        }

        if step == FINAL_STEP {
            *self.session.lock().unwrap() = None;
        }

        if *self.malformed_step.lock().unwrap() == Some(step) {
            let body = r#"{"entities":"oops","summary":{}}"#;
            return serde_json::from_str::<StepResponse>(body).map_err(ClientError::Decode);
        }

        if step == FINAL_STEP {
            if *self.omit_final_payload.lock().unwrap() {
                return Ok(StepResponse::default());
            }
            return Ok(StepResponse {
                entities: Some(self.entities.clone()),
                summary: Some(self.summary()),
                ..Default::default()
            });
        }

        Ok(StepResponse {
            status: Some("ok".to_string()),
            entities_found: Some(self.entities.len() as i64),
            ..Default::default()
        })
    }

    async fn fetch_database_size(&self) -> Result<DatabaseSize, ClientError> {
        *self.database_size_calls.lock().unwrap() += 1;
        let mut failures = self.database_size_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(backend_error(500, "database is locked"));
        }
        Ok(DatabaseSize {
            states: 1000,
            states_size: 4096,
            statistics: 50,
            statistics_size: 1024,
            ..Default::default()
        })
    }

    async fn generate_delete_sql(
        &self,
        entity_id: &str,
        origin: OrphanOrigin,
        _in_states_meta: bool,
        _in_statistics_meta: bool,
    ) -> Result<GenerateSqlResponse, ClientError> {
        self.sql_calls
            .lock()
            .unwrap()
            .push((entity_id.to_string(), origin));
        if self.sql_failures.lock().unwrap().contains(entity_id) {
            return Err(backend_error(500, "Entity not found in database"));
        }
        Ok(GenerateSqlResponse {
            sql: format!("DELETE FROM states_meta WHERE entity_id = '{}';", entity_id),
            storage_saved: 2048,
        })
    }

    async fn fetch_message_histogram(
        &self,
        entity_id: &str,
        hours: u32,
    ) -> Result<MessageHistogram, ClientError> {
        let delay = self.histogram_delays.lock().unwrap().get(entity_id).copied();
        if let Some(millis) = delay {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
        Ok(MessageHistogram {
            hourly_counts: vec![1; hours as usize],
            total_messages: hours as i64,
        })
    }
}

pub fn deleted_entity(id: &str) -> StorageEntity {
    StorageEntity {
        entity_id: id.to_string(),
        in_states_meta: true,
        in_states: true,
        states_count: 120,
        ..Default::default()
    }
}

pub fn disabled_entity(id: &str) -> StorageEntity {
    StorageEntity {
        entity_id: id.to_string(),
        in_entity_registry: true,
        registry_status: RegistryStatus::Disabled,
        in_statistics_meta: true,
        in_statistics_long_term: true,
        stats_long_count: 30,
        last_stats_update: Some("2024-01-01T00:00:00+00:00".to_string()),
        ..Default::default()
    }
}

pub fn active_entity(id: &str) -> StorageEntity {
    StorageEntity {
        entity_id: id.to_string(),
        in_entity_registry: true,
        registry_status: RegistryStatus::Enabled,
        in_state_machine: true,
        state_status: StateStatus::Available,
        in_states_meta: true,
        in_states: true,
        in_statistics_meta: true,
        in_statistics_short_term: true,
        states_count: 500,
        stats_short_count: 80,
        ..Default::default()
    }
}

pub fn sample_inventory() -> Vec<StorageEntity> {
    vec![
        deleted_entity("sensor.old_kitchen_temp"),
        disabled_entity("sensor.garage_door_battery"),
        active_entity("sensor.living_room_temp"),
    ]
}
