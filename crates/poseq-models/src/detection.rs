//! Detector input boundary.
//!
//! The pose/mesh estimator is a black box emitting one record per frame. It
//! is untrusted: records may be missing, confidences may be zero or out of
//! range, positions may be implausible. These types only describe the wire
//! shape; validation happens in the pipeline's ingest stage.
//!
//! # Schema
//! ```json
//! {
//!   "frame_count": 140,
//!   "fps": 30.0,
//!   "image_width": 1920,
//!   "image_height": 1080,
//!   "frames": [
//!     {
//!       "frame_index": 0,
//!       "keypoints": [{"name": "pelvis", "x": 960.0, "y": 540.0, "z": 0.1, "confidence": 0.93}],
//!       "mesh": {"vertices": [[0.0, 0.1, 0.2]], "faces": [[0, 1, 2]]},
//!       "camera": {"tx": 0.02, "ty": 0.3, "tz": 41.0}
//!     }
//!   ]
//! }
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Frame rate assumed when the stream omits one.
pub const DEFAULT_FPS: f64 = 30.0;

fn default_fps() -> f64 {
    DEFAULT_FPS
}

/// Complete detector output for one video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectionStream {
    /// Number of frames in the source video.
    pub frame_count: usize,
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Width of the image the detector ran on, in pixels.
    pub image_width: u32,
    /// Height of the image the detector ran on, in pixels.
    pub image_height: u32,
    /// Per-frame records, ordered by `frame_index`. Frames may be absent.
    #[serde(default)]
    pub frames: Vec<DetectionRecord>,
}

/// One detector record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectionRecord {
    pub frame_index: usize,
    #[serde(default)]
    pub keypoints: Vec<NamedKeypoint>,
    #[serde(default)]
    pub mesh: Option<MeshRecord>,
    #[serde(default)]
    pub camera: Option<CameraRecord>,
}

/// Keypoint as emitted by the detector.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NamedKeypoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    pub confidence: f64,
}

impl NamedKeypoint {
    pub fn new(name: impl Into<String>, x: f64, y: f64, z: f64, confidence: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            z,
            confidence,
        }
    }
}

/// Mesh as emitted by the detector.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MeshRecord {
    pub vertices: Vec<[f64; 3]>,
    #[serde(default)]
    pub faces: Vec<[u32; 3]>,
}

/// Camera parameters: either already in full-image space, or the crop-space
/// weak-perspective camera HMR2 predicts together with its crop box.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CameraRecord {
    Crop {
        scale: f64,
        tx: f64,
        ty: f64,
        box_center: [f64; 2],
        box_size: f64,
    },
    Full {
        tx: f64,
        ty: f64,
        tz: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_defaults() {
        let json = r#"{"frame_count": 3, "image_width": 640, "image_height": 480}"#;
        let stream: DetectionStream = serde_json::from_str(json).unwrap();
        assert_eq!(stream.fps, DEFAULT_FPS);
        assert!(stream.frames.is_empty());
    }

    #[test]
    fn test_camera_record_variants() {
        let full: CameraRecord = serde_json::from_str(r#"{"tx":1.0,"ty":2.0,"tz":3.0}"#).unwrap();
        assert!(matches!(full, CameraRecord::Full { .. }));

        let crop: CameraRecord = serde_json::from_str(
            r#"{"scale":0.9,"tx":0.1,"ty":0.2,"box_center":[320.0,240.0],"box_size":200.0}"#,
        )
        .unwrap();
        assert!(matches!(crop, CameraRecord::Crop { .. }));
    }

    #[test]
    fn test_keypoint_z_defaults_to_zero() {
        let kp: NamedKeypoint =
            serde_json::from_str(r#"{"name":"nose","x":1.0,"y":2.0,"confidence":0.5}"#).unwrap();
        assert_eq!(kp.z, 0.0);
    }
}
