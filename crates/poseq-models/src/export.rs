//! Export boundary: the finalized sequence as handed to storage and
//! rendering collaborators.

use crate::frame::{Derivation, FrameStatus, NormalizedPose};
use crate::geometry::Point3;
use crate::keypoint::Keypoint;
use crate::run::RunId;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Schema version for compatibility checking.
pub const EXPORT_VERSION: &str = "1.0";

/// Coordinate convention of exported positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateConvention {
    /// As emitted by the detector (image-down Y, camera-forward Z).
    #[default]
    Detector,
    /// Y-up viewer space: rotated 180° about X, camera X mirrored.
    ViewerYUp,
}

/// One limb-length correction applied to one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LimbCorrection {
    pub frame_index: usize,
    /// `parent->child` label.
    pub limb: String,
    pub baseline: f64,
    pub length_before: f64,
    pub length_after: f64,
    /// Distance the child keypoint moved.
    pub magnitude: f64,
}

/// Observability summary for one run. Not required for correctness.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DiagnosticReport {
    pub frame_count: usize,
    /// Detector frames kept as-is.
    pub frames_kept: usize,
    /// Frames routed to removal (emitted as `rejected`).
    pub frames_removed: usize,
    /// Frames routed to reconstruction.
    pub frames_reconstructed: usize,
    /// Frames the detector never reported.
    pub frames_missing: usize,
    pub low_confidence_frames: usize,
    pub off_screen_frames: usize,
    pub outlier_frames: usize,
    pub defective_frames: usize,
    /// Flagged detections kept because no frame was reliable.
    #[serde(default)]
    pub anchor_frames: usize,
    /// Total limb corrections across all frames.
    pub limb_corrections: usize,
    /// Frames with at least one limb correction.
    pub frames_corrected: usize,
    pub largest_correction: f64,
    pub normalization_skipped: usize,
    /// Gaps longer than the configured ceiling, as `[start, end)`.
    pub long_gaps: Vec<[usize; 2]>,
    /// Mean quality score over frames the detector reported.
    pub average_quality_score: f64,
}

/// Index map as two pair lists plus the removed set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct IndexMapExport {
    /// `(original, stored)` pairs.
    pub original_to_stored: Vec<(usize, usize)>,
    /// `(stored, original)` pairs.
    pub stored_to_original: Vec<(usize, usize)>,
    pub removed: Vec<usize>,
}

/// Exported frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameExport {
    pub index: usize,
    pub timestamp: f64,
    pub status: FrameStatus,
    pub keypoints: Vec<Keypoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_vertices: Option<Vec<Point3>>,
    /// Set only when this frame's triangles differ from the shared list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_faces: Option<Vec<[u32; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<Point3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation: Option<Derivation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized: Option<NormalizedPose>,
}

/// Complete exported sequence for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SequenceExport {
    pub version: String,
    pub run_id: RunId,
    pub generated_at: DateTime<Utc>,
    pub convention: CoordinateConvention,
    pub fps: f64,
    pub frame_count: usize,
    pub keypoint_names: Vec<String>,
    /// Triangle list of the first meshed frame; frames with a different
    /// topology carry their own `mesh_faces`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mesh_faces: Vec<[u32; 3]>,
    pub frames: Vec<FrameExport>,
    pub index_map: IndexMapExport,
    pub diagnostics: DiagnosticReport,
}
