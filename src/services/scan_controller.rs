use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::error::{ClientError, PanelError, PanelResult};
use crate::models::{
    ResumeState, ScanOutcome, ScanProgress, ScanState, StorageEntity, StorageSummary,
    DATABASE_SIZE_STEP, FINAL_STEP,
};
use crate::services::api_client::AcquisitionClient;

fn session_expiry_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)session.*\b(invalid|expired|not found|missing|required|unknown)\b|\b(invalid|expired|unknown)\b.*session",
            )
            .ok()
        })
        .as_ref()
}

pub fn is_session_expired(message: &str) -> bool {
    session_expiry_pattern().is_some_and(|re| re.is_match(message))
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub struct ScanController {
    client: Arc<dyn AcquisitionClient>,
    resume: Option<ResumeState>,
    state: ScanState,
}

impl ScanController {
    pub fn new(client: Arc<dyn AcquisitionClient>) -> Self {
        Self {
            client,
            resume: None,
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn resume_state(&self) -> Option<&ResumeState> {
        self.resume.as_ref()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ScanState::Running(_))
    }

    pub fn acknowledge(&mut self) {
        if self.state == ScanState::Succeeded {
            self.state = ScanState::Idle;
        }
    }

    /// Forget any failed session so the next `start` begins at step 0.
    pub fn reset(&mut self) {
        if let Some(resume) = self.resume.take() {
            log::debug!(
                "[ScanController] Discarding resume point at step {:?} (session {})",
                resume.last_failed_step,
                resume.session_id.as_deref().map(short_id).unwrap_or("none")
            );
        }
        self.state = ScanState::Idle;
    }

    /// Run the scan, resuming from the last failed step when one is recorded.
    ///
    /// `on_progress` is called after each completed step except the last one,
    /// and once more before the trailing database-size fetch.
    pub async fn start<F>(&mut self, mut on_progress: F) -> PanelResult<ScanOutcome>
    where
        F: FnMut(&ScanProgress),
    {
        let (mut first_step, mut session_id, mut inventory) = match self.resume.take() {
            Some(resume) => {
                let step = resume.resume_step();
                log::info!(
                    "[ScanController] Resuming scan at step {} (session {})",
                    step,
                    resume.session_id.as_deref().map(short_id).unwrap_or("none")
                );
                (step, resume.session_id, resume.pending_inventory)
            }
            None => (0, None, None),
        };

        if inventory.is_none() && first_step > 0 && session_id.is_none() {
            log::warn!("[ScanController] Resume point has no session id, restarting from step 0");
            first_step = 0;
        }

        if inventory.is_none() {
            for step in first_step..=FINAL_STEP {
                self.state = ScanState::Running(step);

                let response = match self.client.fetch_step(step, session_id.as_deref()).await {
                    Ok(response) => response,
                    Err(ClientError::Decode(err)) => {
                        return Err(self.abort(PanelError::protocol(step, err.to_string())))
                    }
                    Err(err) => return Err(self.fail_step(step, session_id, err)),
                };

                if step == 0 {
                    match response.session_id.filter(|id| !id.is_empty()) {
                        Some(id) => {
                            log::debug!("[ScanController] Opened scan session {}", short_id(&id));
                            session_id = Some(id);
                        }
                        None => {
                            return Err(self.abort(PanelError::protocol(
                                step,
                                "response did not include a session_id",
                            )))
                        }
                    }
                }

                if step == FINAL_STEP {
                    match (response.entities, response.summary) {
                        (Some(entities), Some(summary)) => inventory = Some((entities, summary)),
                        _ => {
                            return Err(self.abort(PanelError::protocol(
                                step,
                                "final step must return entities and summary",
                            )))
                        }
                    }
                } else {
                    on_progress(&ScanProgress::for_step(step));
                }
            }
        }

        let Some((entities, summary)) = inventory else {
            return Err(self.abort(PanelError::protocol(FINAL_STEP, "scan produced no inventory")));
        };

        on_progress(&ScanProgress::for_step(DATABASE_SIZE_STEP));
        self.state = ScanState::Running(DATABASE_SIZE_STEP);

        let database_size = match self.client.fetch_database_size().await {
            Ok(size) => size,
            Err(err) => return Err(self.fail_database_size(entities, summary, err.to_string())),
        };

        log::info!(
            "[ScanController] Scan complete: {} entities",
            entities.len()
        );
        self.resume = None;
        self.state = ScanState::Succeeded;

        Ok(ScanOutcome {
            database_size,
            entities,
            summary,
        })
    }

    fn fail_step(&mut self, step: u8, session_id: Option<String>, err: ClientError) -> PanelError {
        // The endpoint answers a stale session with a bare 400 "Invalid parameters provided".
        let rejected = matches!(err, ClientError::Status { status: 400, .. }) && session_id.is_some();
        let message = err.to_string();
        if rejected || is_session_expired(&message) {
            log::warn!(
                "[ScanController] Session {} rejected at step {}: {}",
                session_id.as_deref().map(short_id).unwrap_or("none"),
                step,
                message
            );
            self.resume = None;
            self.state = ScanState::Failed {
                step,
                session_id: None,
            };
            return PanelError::SessionExpired { step, message };
        }

        log::error!("[ScanController] Step {} failed: {}", step, message);
        self.state = ScanState::Failed {
            step,
            session_id: session_id.clone(),
        };
        self.resume = Some(ResumeState {
            session_id,
            last_completed_step: step as i8 - 1,
            last_failed_step: Some(step),
            pending_inventory: None,
        });
        PanelError::transport(step, message)
    }

    // The server drops the session once step 8 answers, so the finished
    // inventory is kept instead of a session id.
    fn fail_database_size(
        &mut self,
        entities: Vec<StorageEntity>,
        summary: StorageSummary,
        message: String,
    ) -> PanelError {
        log::error!("[ScanController] Database size fetch failed: {}", message);
        self.state = ScanState::Failed {
            step: DATABASE_SIZE_STEP,
            session_id: None,
        };
        self.resume = Some(ResumeState {
            session_id: None,
            last_completed_step: FINAL_STEP as i8,
            last_failed_step: Some(DATABASE_SIZE_STEP),
            pending_inventory: Some((entities, summary)),
        });
        PanelError::transport(DATABASE_SIZE_STEP, message)
    }

    fn abort(&mut self, err: PanelError) -> PanelError {
        log::error!("[ScanController] Aborting scan: {}", err);
        self.resume = None;
        self.state = ScanState::Failed {
            step: err.step().unwrap_or(0),
            session_id: None,
        };
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry_messages() {
        assert!(is_session_expired("Invalid or missing session_id for step 1"));
        assert!(is_session_expired("backend returned 400: session_id parameter required for steps 1-8"));
        assert!(is_session_expired("Session 1a2b3c4d not found"));
        assert!(is_session_expired("session expired"));
        assert!(!is_session_expired("An error occurred processing the request"));
        assert!(!is_session_expired("request failed: connection refused"));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
