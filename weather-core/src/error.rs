//! Error kinds raised by the ingestion pipeline.
//!
//! None of these are fatal: the scheduler logs them and keeps cycling.

use thiserror::Error;

/// Failure to obtain a reading from the upstream weather provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {provider} failed: {message}")]
    Network { provider: &'static str, message: String },

    #[error("request to {provider} timed out")]
    Timeout { provider: &'static str },

    #[error("{provider} responded with status {status}: {body}")]
    Status { provider: &'static str, status: u16, body: String },

    #[error("{provider} returned a malformed payload: {message}")]
    Malformed { provider: &'static str, message: String },
}

impl UpstreamError {
    pub(crate) fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout { provider }
        } else {
            UpstreamError::Network { provider, message: err.to_string() }
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, UpstreamError::Malformed { .. })
    }
}

/// Failure writing to or reading from summary storage.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to open summary database: {0}")]
    Open(String),

    #[error("failed to write daily summary: {0}")]
    Write(String),

    #[error("failed to read daily summaries: {0}")]
    Read(String),
}

/// Failure delivering an alert. Only ever logged.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("mail relay rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}
