use thiserror::Error;

use crate::models::{step_label, TOTAL_STEPS};

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("step {} of 9 ({}) failed: {message}", step_number(.step), step_label_of(.step))]
    Transport { step: u8, message: String },
    #[error("step {} of 9 returned an unexpected response: {message}", step_number(.step))]
    Protocol { step: u8, message: String },
    #[error("scan session expired at step {}; please refresh to start over: {message}", step_number(.step))]
    SessionExpired { step: u8, message: String },
    #[error(transparent)]
    Request(#[from] ClientError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("no storage data available; run a scan first")]
    NoData,
}

impl PanelError {
    pub fn transport(step: u8, message: impl Into<String>) -> Self {
        Self::Transport {
            step,
            message: message.into(),
        }
    }

    pub fn protocol(step: u8, message: impl Into<String>) -> Self {
        Self::Protocol {
            step,
            message: message.into(),
        }
    }

    /// Only transport failures keep resumption state.
    pub fn is_resumable(&self) -> bool {
        matches!(self, PanelError::Transport { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, PanelError::Transport { .. } | PanelError::Protocol { .. })
    }

    pub fn step(&self) -> Option<u8> {
        match self {
            PanelError::Transport { step, .. }
            | PanelError::Protocol { step, .. }
            | PanelError::SessionExpired { step, .. } => Some(*step),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type PanelResult<T> = Result<T, PanelError>;

// Steps are zero-based internally and one-based in messages.
fn step_number(step: &u8) -> u8 {
    step.saturating_add(1).min(TOTAL_STEPS)
}

fn step_label_of(step: &u8) -> &'static str {
    step_label(*step)
}
