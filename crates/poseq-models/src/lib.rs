//! Shared data models for pose sequence reconstruction.
//!
//! This crate provides Serde-serializable types for:
//! - 3D geometry primitives and keypoints
//! - Skeleton topologies (SMPL-24, COCO-17, custom)
//! - Frames, meshes and provenance tags
//! - The detector input boundary (`DetectionStream`)
//! - The export boundary (`SequenceExport`, `DiagnosticReport`)

pub mod detection;
pub mod export;
pub mod frame;
pub mod geometry;
pub mod keypoint;
pub mod run;
pub mod topology;

// Re-export common types
pub use detection::{
    CameraRecord, DetectionRecord, DetectionStream, MeshRecord, NamedKeypoint, DEFAULT_FPS,
};
pub use export::{
    CoordinateConvention, DiagnosticReport, FrameExport, IndexMapExport, LimbCorrection,
    SequenceExport, EXPORT_VERSION,
};
pub use frame::{timestamp_for, Derivation, Frame, FrameStatus, Mesh, NormalizedPose, ReferenceKind};
pub use geometry::Point3;
pub use keypoint::Keypoint;
pub use run::RunId;
pub use topology::{Limb, SkeletonTopology, TopologyError, TopologyResult, TorsoLandmarks};
