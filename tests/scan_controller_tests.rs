mod common;

use std::sync::Arc;

use common::{sample_inventory, ScriptedClient};
use statistics_orphan_finder::models::{ScanState, DATABASE_SIZE_LABEL, DATABASE_SIZE_STEP};
use statistics_orphan_finder::services::scan_controller::ScanController;
use statistics_orphan_finder::PanelError;

fn controller() -> (Arc<ScriptedClient>, ScanController) {
    let client = Arc::new(ScriptedClient::new(sample_inventory()));
    let controller = ScanController::new(client.clone());
    (client, controller)
}

#[tokio::test]
async fn test_full_scan_reuses_session() {
    let (client, mut scan) = controller();
    let outcome = scan.start(|_| {}).await.unwrap();

    assert_eq!(outcome.entities.len(), 3);
    assert_eq!(outcome.summary.total_entities, 3);
    assert_eq!(outcome.database_size.total_size(), 5120);
    assert_eq!(client.steps_issued(), (0..=8).collect::<Vec<u8>>());

    let calls = client.step_calls.lock().unwrap().clone();
    assert!(calls[0].1.is_none());
    let session = calls[1].1.clone().unwrap();
    assert!(calls[1..].iter().all(|(_, id)| id.as_deref() == Some(session.as_str())));

    assert_eq!(scan.state(), &ScanState::Succeeded);
    assert!(scan.resume_state().is_none());

    scan.acknowledge();
    assert_eq!(scan.state(), &ScanState::Idle);
}

#[tokio::test]
async fn test_progress_reported_per_step() {
    let (_, mut scan) = controller();
    let mut seen = Vec::new();
    scan.start(|p| seen.push((p.step_index, p.total_steps, p.label.clone())))
        .await
        .unwrap();

    let steps: Vec<u8> = seen.iter().map(|(step, _, _)| *step).collect();
    assert_eq!(steps, vec![0, 1, 2, 3, 4, 5, 6, 7, DATABASE_SIZE_STEP]);
    assert!(seen.iter().all(|(_, total, _)| *total == 9));
    assert_eq!(seen[0].2, "Initializing");
    assert_eq!(seen[6].2, "Reading entity registry and state machine");
    assert_eq!(seen.last().unwrap().2, DATABASE_SIZE_LABEL);
}

#[tokio::test]
async fn test_transport_failure_at_step_five_resumes_there() {
    let (client, mut scan) = controller();
    client.fail_step_once(5, "An error occurred processing the request");

    let err = scan.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, PanelError::Transport { step: 5, .. }));
    assert!(err.is_resumable());
    assert!(err.to_string().contains("step 6 of 9"));

    let resume = scan.resume_state().unwrap().clone();
    assert_eq!(resume.last_failed_step, Some(5));
    assert_eq!(resume.last_completed_step, 4);
    let session = resume.session_id.clone().unwrap();
    assert!(matches!(scan.state(), ScanState::Failed { step: 5, session_id: Some(_) }));

    client.clear_calls();
    let outcome = scan.start(|_| {}).await.unwrap();
    assert_eq!(outcome.entities.len(), 3);
    assert_eq!(client.steps_issued(), vec![5, 6, 7, 8]);
    let calls = client.step_calls.lock().unwrap().clone();
    assert!(calls.iter().all(|(_, id)| id.as_deref() == Some(session.as_str())));
}

#[tokio::test]
async fn test_resume_from_step_four() {
    let (client, mut scan) = controller();
    client.fail_step_once(4, "timed out");

    scan.start(|_| {}).await.unwrap_err();
    client.clear_calls();

    let mut progress = Vec::new();
    scan.start(|p| progress.push(p.step_index)).await.unwrap();
    assert_eq!(client.steps_issued(), vec![4, 5, 6, 7, 8]);
    assert_eq!(progress, vec![4, 5, 6, 7, DATABASE_SIZE_STEP]);
}

#[tokio::test]
async fn test_expired_session_is_never_replayed() {
    let (client, mut scan) = controller();
    client.fail_step_once(3, "connection reset by peer");
    scan.start(|_| {}).await.unwrap_err();
    assert!(scan.resume_state().is_some());

    client.expire_session();
    client.clear_calls();
    let err = scan.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, PanelError::SessionExpired { step: 3, .. }));
    assert!(!err.is_resumable());
    assert!(scan.resume_state().is_none());
    assert_eq!(client.steps_issued(), vec![3]);

    client.clear_calls();
    scan.start(|_| {}).await.unwrap();
    let calls = client.step_calls.lock().unwrap().clone();
    assert_eq!(calls[0], (0, None));
    assert_eq!(calls.len(), 9);
}

#[tokio::test]
async fn test_first_step_failure_restarts_from_zero() {
    let (client, mut scan) = controller();
    client.fail_step_once(0, "Service unavailable");

    let err = scan.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, PanelError::Transport { step: 0, .. }));
    assert_eq!(scan.resume_state().unwrap().resume_step(), 0);

    client.clear_calls();
    scan.start(|_| {}).await.unwrap();
    assert_eq!(client.steps_issued(), (0..=8).collect::<Vec<u8>>());
}

#[tokio::test]
async fn test_missing_session_id_is_protocol_error() {
    let (client, mut scan) = controller();
    *client.omit_session_id.lock().unwrap() = true;

    let err = scan.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, PanelError::Protocol { step: 0, .. }));
    assert!(scan.resume_state().is_none());
    assert_eq!(client.steps_issued(), vec![0]);
}

#[tokio::test]
async fn test_final_step_without_inventory_clears_resume() {
    let (client, mut scan) = controller();
    *client.omit_final_payload.lock().unwrap() = true;

    let err = scan.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, PanelError::Protocol { step: 8, .. }));
    assert!(scan.resume_state().is_none());
    assert_eq!(*client.database_size_calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_database_size_failure_keeps_inventory() {
    let (client, mut scan) = controller();
    client.fail_database_size_once();

    let err = scan.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, PanelError::Transport { step: DATABASE_SIZE_STEP, .. }));
    let resume = scan.resume_state().unwrap();
    assert_eq!(resume.last_failed_step, Some(DATABASE_SIZE_STEP));
    assert!(resume.pending_inventory.is_some());

    client.clear_calls();
    let outcome = scan.start(|_| {}).await.unwrap();
    assert!(client.steps_issued().is_empty());
    assert_eq!(*client.database_size_calls.lock().unwrap(), 1);
    assert_eq!(outcome.entities.len(), 3);
}

#[tokio::test]
async fn test_reset_discards_resume_point() {
    let (client, mut scan) = controller();
    client.fail_step_once(6, "Bad gateway");
    scan.start(|_| {}).await.unwrap_err();

    scan.reset();
    assert_eq!(scan.state(), &ScanState::Idle);
    assert!(scan.resume_state().is_none());

    client.clear_calls();
    scan.start(|_| {}).await.unwrap();
    assert_eq!(client.steps_issued().first(), Some(&0));
}

#[tokio::test]
async fn test_malformed_final_payload_is_protocol_error() {
    let (client, mut scan) = controller();
    client.malformed_payload_at(8);

    let err = scan.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, PanelError::Protocol { step: 8, .. }));
    assert!(!err.is_resumable());
    assert!(err.is_retryable());
    assert!(scan.resume_state().is_none());
    assert!(matches!(scan.state(), ScanState::Failed { step: 8, session_id: None }));

    client.clear_malformed_payload();
    client.clear_calls();
    scan.start(|_| {}).await.unwrap();
    let calls = client.step_calls.lock().unwrap().clone();
    assert_eq!(calls[0], (0, None));
    assert_eq!(calls.len(), 9);
}

#[tokio::test]
async fn test_generic_bad_request_on_session_step_ends_session() {
    let (client, mut scan) = controller();
    client.fail_step_once(2, "Bad gateway");
    scan.start(|_| {}).await.unwrap_err();

    client.expire_session();
    let err = scan.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, PanelError::SessionExpired { step: 2, .. }));
    assert!(err.to_string().contains("Invalid parameters provided"));
    assert!(scan.resume_state().is_none());
}

#[tokio::test]
async fn test_session_message_from_server_error_ends_session() {
    let (client, mut scan) = controller();
    client.fail_step_once(4, "Session 1a2b3c4d not found");

    let err = scan.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, PanelError::SessionExpired { step: 4, .. }));
    assert!(scan.resume_state().is_none());
}
