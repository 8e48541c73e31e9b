//! Error types for pipeline runs.
//!
//! Only whole-run invariant violations are errors. Per-frame problems
//! (missing detections, low confidence, degenerate geometry) are resolved by
//! documented fallbacks and reported through diagnostics instead.

use poseq_models::TopologyError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Declared frame count is zero")]
    EmptySequence,

    #[error("Duplicate frame index {0}")]
    DuplicateFrame(usize),

    #[error("Frame index {index} is outside the declared frame count {frame_count}")]
    FrameOutOfRange { index: usize, frame_count: usize },

    #[error("Frame index {index} arrived after frame {previous}")]
    OutOfOrder { index: usize, previous: usize },

    #[error("Invalid stream: {0}")]
    InvalidStream(String),

    #[error("No usable detection to reconstruct from ({0} frames)")]
    NoReliableFrames(usize),

    #[error("Detector keypoints do not match the topology ({matched} of {expected} names recognized)")]
    TopologyMismatch { expected: usize, matched: usize },

    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Create an invalid-stream error.
    pub fn invalid_stream(message: impl Into<String>) -> Self {
        Self::InvalidStream(message.into())
    }

    /// Create an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the input itself was rejected (as opposed to I/O or cancellation).
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::EmptySequence
                | Self::DuplicateFrame(_)
                | Self::FrameOutOfRange { .. }
                | Self::OutOfOrder { .. }
                | Self::InvalidStream(_)
                | Self::NoReliableFrames(_)
                | Self::TopologyMismatch { .. }
        )
    }
}
