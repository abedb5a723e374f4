use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("Sync was cancelled.")]
    Cancelled,

    #[error("{0}")]
    Api(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl SyncError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        SyncError::Api(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
