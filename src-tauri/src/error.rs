use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetouchError {
    #[error("Processor unreachable: {0}")]
    Connectivity(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Processing failed: {0}")]
    Process(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Processor did not settle within {0:?}")]
    Timeout(Duration),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl RetouchError {
    /// Connectivity problems stay on screen until a health check succeeds;
    /// everything else is shown once.
    pub fn is_persistent(&self) -> bool {
        matches!(self, RetouchError::Connectivity(_))
    }
}

impl From<RetouchError> for String {
    fn from(err: RetouchError) -> Self {
        err.to_string()
    }
}
