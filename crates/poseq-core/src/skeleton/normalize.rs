//! Body-scale normalization.
//!
//! Divides positions by a body dimension so poses from subjects of different
//! size and camera distance become comparable. Torso length (shoulder
//! midpoint to hip midpoint) is preferred, shoulder width is the fallback.
//! The normalized copy is stored next to the canonical keypoints.

use crate::config::NormalizationConfig;
use poseq_models::{Frame, Keypoint, NormalizedPose, ReferenceKind, TorsoLandmarks};
use tracing::warn;

/// Scale normalizer for one topology.
#[derive(Debug, Clone)]
pub struct ScaleNormalizer {
    config: NormalizationConfig,
    torso: Option<TorsoLandmarks>,
}

impl ScaleNormalizer {
    /// `torso` is `None` when the topology lacks shoulders or hips; every
    /// frame is then skipped.
    pub fn new(config: NormalizationConfig, torso: Option<TorsoLandmarks>) -> Self {
        Self { config, torso }
    }

    /// Reference dimension for a keypoint set.
    pub fn reference(&self, keypoints: &[Keypoint]) -> Option<(ReferenceKind, f64)> {
        let t = self.torso?;
        let min = self.config.min_reference_length;
        let at = |i: usize| keypoints.get(i).filter(|k| k.is_visible()).map(|k| k.position);

        let shoulders = at(t.left_shoulder).zip(at(t.right_shoulder));
        let hips = at(t.left_hip).zip(at(t.right_hip));

        if let (Some((ls, rs)), Some((lh, rh))) = (shoulders, hips) {
            let torso = ls.midpoint(rs).distance(lh.midpoint(rh));
            if torso >= min && torso.is_finite() {
                return Some((ReferenceKind::Torso, torso));
            }
        }

        let (ls, rs) = shoulders?;
        let width = ls.distance(rs);
        (width >= min && width.is_finite()).then_some((ReferenceKind::ShoulderWidth, width))
    }

    /// Normalized copy of a keypoint set, or `None` when no reference is usable.
    pub fn normalize_keypoints(&self, keypoints: &[Keypoint]) -> Option<NormalizedPose> {
        let (reference, length) = self.reference(keypoints)?;
        let scale = 1.0 / length;
        Some(NormalizedPose {
            reference,
            reference_length: length,
            positions: keypoints.iter().map(|k| k.position * scale).collect(),
        })
    }

    /// Normalize a frame in place. Returns `false` and flags the frame when
    /// it had to be skipped.
    pub fn apply(&self, frame: &mut Frame) -> bool {
        match self.normalize_keypoints(&frame.keypoints) {
            Some(pose) => {
                frame.normalized = Some(pose);
                frame.normalization_skipped = false;
                true
            }
            None => {
                warn!(
                    frame_index = frame.index,
                    "No usable torso or shoulder reference; normalization skipped"
                );
                frame.normalized = None;
                frame.normalization_skipped = true;
                false
            }
        }
    }

    /// Normalize every frame; returns the number of skipped frames.
    pub fn apply_all(&self, frames: &mut [Frame]) -> usize {
        frames.iter_mut().map(|f| self.apply(f)).filter(|ok| !ok).count()
    }
}
