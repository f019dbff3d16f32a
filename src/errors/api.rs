use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Could not reach server: {0}")]
    Connect(String),

    #[error("Server responded {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status {
        status: u16,
        detail: Option<String>,
    },

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// Classifies a reqwest failure; timeouts surface through the same path as other
    /// transport errors but keep the configured limit for the message.
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout_secs)
        } else if err.is_connect() {
            ApiError::Connect(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    /// Server-provided detail message, when the backend sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A status check that failed; fatal to the polling session unless retries are configured.
#[derive(Error, Debug)]
#[error("status check #{sequence} for task {task_id} failed: {source}")]
pub struct PollingError {
    pub task_id: String,
    pub sequence: u64,
    #[source]
    pub source: ApiError,
}
