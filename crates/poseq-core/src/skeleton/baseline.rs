//! Per-limb baseline lengths, derived once per run.

use crate::stats::median;
use poseq_models::{Frame, FrameStatus, SkeletonTopology};
use tracing::{debug, warn};

/// Baseline length for each limb, in topology limb order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LimbBaselines {
    lengths: Vec<Option<f64>>,
}

impl LimbBaselines {
    /// Build from explicit lengths (one per topology limb).
    pub fn from_lengths(lengths: Vec<Option<f64>>) -> Self {
        Self { lengths }
    }

    /// Median limb length over the first `sample_frames` detector frames in
    /// which both endpoints meet `threshold`. Limbs that never qualify get no
    /// baseline and are left unconstrained.
    pub fn derive(
        topology: &SkeletonTopology,
        frames: &[Frame],
        sample_frames: usize,
        threshold: f64,
    ) -> Self {
        let lengths = topology
            .limbs()
            .iter()
            .map(|limb| {
                let samples: Vec<f64> = frames
                    .iter()
                    .filter(|f| f.status == FrameStatus::Source)
                    .filter_map(|f| {
                        let parent = f.keypoints.get(limb.parent)?;
                        let child = f.keypoints.get(limb.child)?;
                        (parent.is_valid(threshold) && child.is_valid(threshold))
                            .then(|| parent.position.distance(child.position))
                    })
                    .take(sample_frames)
                    .collect();

                if samples.is_empty() {
                    warn!(
                        limb = %topology.limb_label(*limb),
                        "No reliable frame for limb baseline; limb will not be constrained"
                    );
                    None
                } else {
                    let length = median(&samples);
                    debug!(
                        limb = %topology.limb_label(*limb),
                        length,
                        samples = samples.len(),
                        "Limb baseline derived"
                    );
                    Some(length)
                }
            })
            .collect();

        Self { lengths }
    }

    /// Baseline for the limb at `limb_index` in topology order.
    pub fn get(&self, limb_index: usize) -> Option<f64> {
        self.lengths.get(limb_index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Number of limbs that have a baseline.
    pub fn known(&self) -> usize {
        self.lengths.iter().filter(|l| l.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poseq_models::{Derivation, Keypoint, Point3};

    fn topology() -> SkeletonTopology {
        SkeletonTopology::new(&["root", "mid", "tip"], &[("root", "mid"), ("mid", "tip")]).unwrap()
    }

    fn frame(index: usize, bone: f64, conf: f64) -> Frame {
        Frame::source(
            index,
            30.0,
            vec![
                Keypoint::new(Point3::ZERO, 0.9),
                Keypoint::new(Point3::new(bone, 0.0, 0.0), 0.9),
                Keypoint::new(Point3::new(bone, 5.0, 0.0), conf),
            ],
        )
    }

    #[test]
    fn test_median_of_early_frames() {
        let frames: Vec<Frame> = [10.0, 11.0, 9.0, 50.0]
            .iter()
            .enumerate()
            .map(|(i, &b)| frame(i, b, 0.9))
            .collect();
        let baselines = LimbBaselines::derive(&topology(), &frames, 3, 0.6);
        assert_eq!(baselines.get(0), Some(10.0));
        assert_eq!(baselines.get(1), Some(5.0));
    }

    #[test]
    fn test_skips_unreliable_and_synthesized_frames() {
        let mut synthesized = frame(0, 100.0, 0.9);
        synthesized.status = FrameStatus::Reconstructed;
        synthesized.derivation = Some(Derivation::Duplicated { source: 1 });
        let frames = vec![synthesized, frame(1, 10.0, 0.1)];

        let baselines = LimbBaselines::derive(&topology(), &frames, 10, 0.6);
        assert_eq!(baselines.get(0), Some(10.0));
        assert_eq!(baselines.get(1), None);
        assert_eq!(baselines.known(), 1);
    }
}
