//! Frames, meshes and provenance tags.

use crate::geometry::Point3;
use crate::keypoint::Keypoint;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Dense body mesh: vertex list plus triangle list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Mesh {
    pub vertices: Vec<Point3>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Point3>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Where a frame's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Detector output, kept.
    #[default]
    Source,
    /// Synthesized to close a gap.
    Reconstructed,
    /// Detector output discarded; the skeleton shown is synthesized.
    Rejected,
}

impl FrameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameStatus::Source => "source",
            FrameStatus::Reconstructed => "reconstructed",
            FrameStatus::Rejected => "rejected",
        }
    }
}

/// How a synthesized frame was produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    /// Linear blend of two kept frames.
    Interpolated {
        before: usize,
        after: usize,
        factor: f64,
    },
    /// Copy of the nearest kept frame (edge gaps).
    Duplicated { source: usize },
}

impl Derivation {
    /// Source frame indices this derivation reads from.
    pub fn sources(&self) -> Vec<usize> {
        match *self {
            Derivation::Interpolated { before, after, .. } => vec![before, after],
            Derivation::Duplicated { source } => vec![source],
        }
    }
}

/// Which body dimension a normalization divided by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Shoulder midpoint to hip midpoint.
    Torso,
    /// Left to right shoulder.
    ShoulderWidth,
}

/// Scale-normalized copy of a frame's keypoint positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedPose {
    pub reference: ReferenceKind,
    pub reference_length: f64,
    pub positions: Vec<Point3>,
}

/// One time-indexed unit of the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Source video frame number.
    pub index: usize,
    /// Seconds, `index / fps`.
    pub timestamp: f64,
    pub status: FrameStatus,
    /// Canonical keypoints in topology order.
    pub keypoints: Vec<Keypoint>,
    pub mesh: Option<Mesh>,
    /// Full-image camera translation.
    pub camera: Option<Point3>,
    /// Set for every synthesized frame.
    pub derivation: Option<Derivation>,
    /// Keypoints before temporal smoothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfiltered: Option<Vec<Keypoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized: Option<NormalizedPose>,
    /// No usable reference dimension was found for normalization.
    #[serde(default)]
    pub normalization_skipped: bool,
}

impl Frame {
    /// Create a detector frame.
    pub fn source(index: usize, fps: f64, keypoints: Vec<Keypoint>) -> Self {
        Self {
            index,
            timestamp: timestamp_for(index, fps),
            status: FrameStatus::Source,
            keypoints,
            mesh: None,
            camera: None,
            derivation: None,
            unfiltered: None,
            normalized: None,
            normalization_skipped: false,
        }
    }

    /// Create a synthesized frame.
    pub fn synthesized(
        index: usize,
        fps: f64,
        status: FrameStatus,
        keypoints: Vec<Keypoint>,
        derivation: Derivation,
    ) -> Self {
        Self {
            status,
            derivation: Some(derivation),
            ..Self::source(index, fps, keypoints)
        }
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_camera(mut self, camera: Point3) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Mean keypoint confidence, 0 for an empty keypoint set.
    pub fn mean_confidence(&self) -> f64 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        self.keypoints.iter().map(|k| k.confidence).sum::<f64>() / self.keypoints.len() as f64
    }

    /// Frame content was produced by the reconstructor.
    pub fn is_synthesized(&self) -> bool {
        self.derivation.is_some()
    }
}

/// Timestamp in seconds for a frame index.
#[inline]
pub fn timestamp_for(index: usize, fps: f64) -> f64 {
    if fps > 0.0 {
        index as f64 / fps
    } else {
        0.0
    }
}
