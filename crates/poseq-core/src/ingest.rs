//! Detector stream validation and conversion.
//!
//! Whole-stream violations (empty, duplicate, out of range, out of order,
//! unrecognizable keypoints) are fatal. Everything else is repaired and
//! logged: confidences are clamped into [0, 1], unknown keypoint names are
//! dropped and topology keypoints the record omits get confidence 0.
//! Non-finite positions are kept so quality analysis marks the frame
//! defective.

use crate::camera::{CropCamera, DEFAULT_FOCAL_LENGTH};
use crate::error::{PipelineError, PipelineResult};
use crate::quality::ImageBounds;
use poseq_models::{
    CameraRecord, DetectionRecord, DetectionStream, Frame, Keypoint, Mesh, Point3,
    SkeletonTopology, DEFAULT_FPS,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Largest `frame_count` a stream may declare: a little over 92 hours at 30 fps.
pub const MAX_FRAME_COUNT: usize = 10_000_000;

/// Validated detections laid out by frame index.
#[derive(Debug, Clone)]
pub struct IngestedStream {
    /// `frames[i]` is `None` when the detector reported nothing for frame `i`.
    pub frames: Vec<Option<Frame>>,
    pub bounds: ImageBounds,
    pub fps: f64,
    /// Confidence values that had to be clamped.
    pub clamped_confidences: usize,
    /// Keypoint names the topology does not know.
    pub unknown_names: BTreeSet<String>,
}

impl IngestedStream {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn missing(&self) -> usize {
        self.frames.iter().filter(|f| f.is_none()).count()
    }
}

/// Validate a detector stream against a topology.
pub fn ingest(stream: &DetectionStream, topology: &SkeletonTopology) -> PipelineResult<IngestedStream> {
    if stream.frame_count == 0 {
        return Err(PipelineError::EmptySequence);
    }
    if stream.frame_count > MAX_FRAME_COUNT {
        return Err(PipelineError::invalid_stream(format!(
            "frame_count {} exceeds the maximum of {}",
            stream.frame_count, MAX_FRAME_COUNT
        )));
    }
    if stream.image_width == 0 || stream.image_height == 0 {
        return Err(PipelineError::invalid_stream(format!(
            "image dimensions must be non-zero, got {}x{}",
            stream.image_width, stream.image_height
        )));
    }

    let fps = if stream.fps.is_finite() && stream.fps > 0.0 {
        stream.fps
    } else {
        warn!(fps = stream.fps, default = DEFAULT_FPS, "Invalid frame rate; using default");
        DEFAULT_FPS
    };
    let bounds = ImageBounds::new(stream.image_width as f64, stream.image_height as f64);

    let mut frames: Vec<Option<Frame>> = Vec::new();
    frames.try_reserve_exact(stream.frame_count).map_err(|e| {
        PipelineError::invalid_stream(format!(
            "cannot allocate {} frames: {}",
            stream.frame_count, e
        ))
    })?;
    frames.resize(stream.frame_count, None);
    let mut previous: Option<usize> = None;
    let mut clamped = 0usize;
    let mut unknown = BTreeSet::new();
    let mut matched = BTreeSet::new();
    let mut any_keypoints = false;

    for record in &stream.frames {
        let index = record.frame_index;
        if index >= stream.frame_count {
            return Err(PipelineError::FrameOutOfRange {
                index,
                frame_count: stream.frame_count,
            });
        }
        match previous {
            Some(p) if p == index => return Err(PipelineError::DuplicateFrame(index)),
            Some(p) if index < p => {
                return Err(PipelineError::OutOfOrder {
                    index,
                    previous: p,
                })
            }
            _ => {}
        }
        previous = Some(index);

        any_keypoints |= !record.keypoints.is_empty();
        let mut keypoints = vec![Keypoint::missing(); topology.len()];
        for named in &record.keypoints {
            let Some(k) = topology.index_of(&named.name) else {
                if unknown.insert(named.name.clone()) {
                    warn!(frame_index = index, name = %named.name, "Ignoring unknown keypoint name");
                }
                continue;
            };
            matched.insert(k);
            let (confidence, was_clamped) = clamp_confidence(named.confidence);
            if was_clamped {
                clamped += 1;
                debug!(
                    frame_index = index,
                    keypoint = %named.name,
                    raw = named.confidence,
                    clamped = confidence,
                    "Confidence clamped"
                );
            }
            keypoints[k] = Keypoint::new(Point3::new(named.x, named.y, named.z), confidence);
        }

        frames[index] = Some(to_frame(record, keypoints, fps, &bounds));
    }

    if any_keypoints && matched.is_empty() {
        return Err(PipelineError::TopologyMismatch {
            expected: topology.len(),
            matched: 0,
        });
    }
    if clamped > 0 {
        warn!(count = clamped, "Clamped out-of-range confidence values");
    }

    Ok(IngestedStream {
        frames,
        bounds,
        fps,
        clamped_confidences: clamped,
        unknown_names: unknown,
    })
}

fn clamp_confidence(raw: f64) -> (f64, bool) {
    if !raw.is_finite() {
        (0.0, true)
    } else if !(0.0..=1.0).contains(&raw) {
        (raw.clamp(0.0, 1.0), true)
    } else {
        (raw, false)
    }
}

fn to_frame(record: &DetectionRecord, keypoints: Vec<Keypoint>, fps: f64, bounds: &ImageBounds) -> Frame {
    let mut frame = Frame::source(record.frame_index, fps, keypoints);
    frame.mesh = record.mesh.as_ref().map(|m| {
        Mesh::new(
            m.vertices.iter().copied().map(Point3::from_array).collect(),
            m.faces.clone(),
        )
    });
    frame.camera = record.camera.as_ref().map(|camera| match *camera {
        CameraRecord::Full { tx, ty, tz } => Point3::new(tx, ty, tz),
        CameraRecord::Crop {
            scale,
            tx,
            ty,
            box_center,
            box_size,
        } => CropCamera::new(scale, tx, ty).to_full(
            box_center,
            box_size,
            (bounds.width, bounds.height),
            DEFAULT_FOCAL_LENGTH,
        ),
    });
    frame
}
