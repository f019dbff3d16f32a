// Typed errors for every failure path of the client; nothing is only logged.
use thiserror::Error;

pub mod api;
pub mod display;
pub mod validation;

pub use api::{ApiError, PollingError};
pub use validation::ValidationError;

#[derive(Error, Debug)]
pub enum GenolabError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // Upload transport/server failures keep the server-provided detail when there is one.
    #[error("Upload error: {}", .detail.as_deref().unwrap_or("request failed"))]
    Submission {
        detail: Option<String>,
        #[source]
        source: ApiError,
    },

    #[error("Polling error: {0}")]
    Polling(#[from] PollingError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Chart export error: {0}")]
    ChartExport(String),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),
}

impl GenolabError {
    /// Wraps a transport error raised while uploading.
    pub fn submission(source: ApiError) -> Self {
        let detail = source.detail().map(str::to_string);
        GenolabError::Submission { detail, source }
    }
}

// Custom result type
pub type GenolabResult<T> = Result<T, GenolabError>;
