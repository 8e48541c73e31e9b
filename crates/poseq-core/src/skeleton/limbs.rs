//! Limb-length constraints.
//!
//! Walks limbs parent-first. When a limb is longer or shorter than its
//! baseline by more than the tolerance, the child keypoint is moved along
//! the parent→child direction to the nearest tolerance boundary. The parent
//! stays fixed and the child's whole subtree moves with it, so a corrected
//! elbow carries the wrist and hand along.

use super::baseline::LimbBaselines;
use crate::config::LimbConfig;
use poseq_models::{Frame, LimbCorrection, SkeletonTopology};
use tracing::{debug, warn};

/// Enforces baseline limb lengths on frames.
#[derive(Debug, Clone)]
pub struct LimbConstraint {
    config: LimbConfig,
}

impl LimbConstraint {
    pub fn new(config: LimbConfig) -> Self {
        Self { config }
    }

    /// Constrain one frame in place and return the corrections applied.
    pub fn apply(
        &self,
        frame: &mut Frame,
        topology: &SkeletonTopology,
        baselines: &LimbBaselines,
    ) -> Vec<LimbCorrection> {
        let mut corrections = Vec::new();
        let tolerance = self.config.tolerance;

        for (limb_index, limb) in topology.limbs().iter().enumerate() {
            let Some(baseline) = baselines.get(limb_index) else {
                continue;
            };
            let (Some(parent), Some(child)) = (
                frame.keypoints.get(limb.parent).copied(),
                frame.keypoints.get(limb.child).copied(),
            ) else {
                continue;
            };
            // A position with zero confidence carries no information.
            if !parent.is_visible() || !child.is_visible() {
                continue;
            }

            let offset = child.position - parent.position;
            let length = offset.norm();
            let low = baseline * (1.0 - tolerance);
            let high = baseline * (1.0 + tolerance);
            if (low..=high).contains(&length) {
                continue;
            }

            let Some(direction) = offset.normalized(self.config.min_direction_length) else {
                warn!(
                    frame_index = frame.index,
                    limb = %topology.limb_label(*limb),
                    length,
                    "Degenerate limb direction; skipping constraint"
                );
                continue;
            };

            let target = length.clamp(low, high);
            let delta = parent.position + direction * target - child.position;
            frame.keypoints[limb.child].position = frame.keypoints[limb.child].position + delta;
            for &d in topology.descendants(limb.child) {
                if let Some(kp) = frame.keypoints.get_mut(d) {
                    kp.position = kp.position + delta;
                }
            }

            let magnitude = delta.norm();
            debug!(
                frame_index = frame.index,
                limb = %topology.limb_label(*limb),
                baseline,
                length_before = length,
                length_after = target,
                magnitude,
                "Limb length corrected"
            );
            corrections.push(LimbCorrection {
                frame_index: frame.index,
                limb: topology.limb_label(*limb),
                baseline,
                length_before: length,
                length_after: target,
                magnitude,
            });
        }

        corrections
    }

    /// Constrain every frame; corrections are returned in frame order.
    pub fn apply_all(
        &self,
        frames: &mut [Frame],
        topology: &SkeletonTopology,
        baselines: &LimbBaselines,
    ) -> Vec<LimbCorrection> {
        frames
            .iter_mut()
            .flat_map(|f| self.apply(f, topology, baselines))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poseq_models::{Keypoint, Point3};

    fn chain() -> SkeletonTopology {
        SkeletonTopology::new(
            &["shoulder", "elbow", "wrist"],
            &[("shoulder", "elbow"), ("elbow", "wrist")],
        )
        .unwrap()
    }

    fn arm(elbow_x: f64, wrist_x: f64) -> Frame {
        Frame::source(
            7,
            30.0,
            vec![
                Keypoint::new(Point3::ZERO, 0.9),
                Keypoint::new(Point3::new(elbow_x, 0.0, 0.0), 0.9),
                Keypoint::new(Point3::new(wrist_x, 0.0, 0.0), 0.9),
            ],
        )
    }

    fn baselines() -> LimbBaselines {
        LimbBaselines::from_lengths(vec![Some(10.0), Some(10.0)])
    }

    #[test]
    fn test_within_tolerance_untouched() {
        let mut frame = arm(11.5, 20.0);
        let corrections = LimbConstraint::new(LimbConfig::default()).apply(&mut frame, &chain(), &baselines());
        assert!(corrections.is_empty());
        assert_eq!(frame.keypoints[1].position.x, 11.5);
    }

    #[test]
    fn test_stretched_limb_pulled_to_boundary_with_subtree() {
        let mut frame = arm(20.0, 30.0);
        let corrections = LimbConstraint::new(LimbConfig::default()).apply(&mut frame, &chain(), &baselines());

        assert_eq!(corrections.len(), 1);
        let c = &corrections[0];
        assert_eq!(c.limb, "shoulder->elbow");
        assert_eq!(c.frame_index, 7);
        assert!((c.length_after - 12.0).abs() < 1e-9);
        assert!((c.magnitude - 8.0).abs() < 1e-9);

        assert!((frame.keypoints[1].position.x - 12.0).abs() < 1e-9);
        // Wrist moved with the elbow; forearm length unchanged.
        assert!((frame.keypoints[2].position.x - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_shrunk_limb_pushed_out() {
        let mut frame = arm(2.0, 12.0);
        let corrections = LimbConstraint::new(LimbConfig::default()).apply(&mut frame, &chain(), &baselines());
        assert_eq!(corrections.len(), 1);
        assert!((frame.keypoints[1].position.x - 8.0).abs() < 1e-9);
        assert!((frame.keypoints[2].position.x - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_and_unknown_limbs_skipped() {
        let mut collapsed = arm(0.0, 10.0);
        let corrections = LimbConstraint::new(LimbConfig::default()).apply(&mut collapsed, &chain(), &baselines());
        assert!(corrections.is_empty());

        let mut frame = arm(30.0, 40.0);
        let partial = LimbBaselines::from_lengths(vec![None, Some(10.0)]);
        let corrections = LimbConstraint::new(LimbConfig::default()).apply(&mut frame, &chain(), &partial);
        assert!(corrections.is_empty());
    }
}
