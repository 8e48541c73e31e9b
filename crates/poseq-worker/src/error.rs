//! Worker error types.

use poseq_core::PipelineError;
use std::path::PathBuf;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input {path}: {message}")]
    InvalidInput { path: PathBuf, message: String },

    #[error("Run failed: {0}")]
    RunFailed(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_input(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn run_failed(msg: impl Into<String>) -> Self {
        Self::RunFailed(msg.into())
    }

    /// Whether retrying the same input could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Io(_) | WorkerError::RunFailed(_) => true,
            WorkerError::Pipeline(e) => matches!(e, PipelineError::Io(_) | PipelineError::Cancelled),
            _ => false,
        }
    }
}
