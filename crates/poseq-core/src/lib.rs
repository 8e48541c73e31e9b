#![deny(unreachable_patterns)]
//! Pose sequence reconstruction.
//!
//! This crate provides:
//! - Detector stream validation (`ingest`)
//! - Per-frame quality analysis and gap/outlier resolution
//! - Dense reconstruction by interpolation and edge duplication
//! - Confidence-weighted temporal smoothing
//! - Limb-length constraints and body-scale normalization
//! - Original ↔ stored index mapping and JSON export

pub mod camera;
pub mod cancel;
pub mod config;
pub mod error;
pub mod export;
pub mod index_map;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod quality;
pub mod reconstruct;
pub mod resolver;
pub mod sequence;
pub mod skeleton;
pub mod smoother;
pub mod stats;


pub use camera::{CropCamera, DEFAULT_FOCAL_LENGTH};
pub use cancel::CancelFlag;
pub use config::{
    LimbConfig, NormalizationConfig, PipelineConfig, QualityConfig, ResolverConfig,
    SmoothingConfig,
};
pub use error::{PipelineError, PipelineResult};
pub use export::SequenceExporter;
pub use index_map::IndexMap;
pub use ingest::{ingest, IngestedStream};
pub use logging::{RunLogger, StageTiming};
pub use pipeline::{PipelineOutput, PosePipeline};
pub use quality::{ImageBounds, QualityAnalyzer, QualityRecord};
pub use reconstruct::{ReconstructionCache, SequenceReconstructor};
pub use resolver::{Decision, DecisionReason, FrameDecision, GapResolver, Resolution};
pub use sequence::{FrameLookup, PoseSequence};
pub use skeleton::{LimbBaselines, LimbConstraint, ScaleNormalizer};
pub use smoother::TemporalSmoother;
