//! Confidence-weighted temporal median filter.
//!
//! Each coordinate at frame `i` becomes the weighted median of that coordinate
//! over frames `i - r ..= i + r`, weighted by keypoint confidence. Samples
//! below the confidence threshold are ignored, and the window is truncated at
//! the ends of the sequence rather than padded. The median suppresses single
//! frame spikes without dragging the pose toward them the way a mean would.

use crate::config::SmoothingConfig;
use crate::stats::weighted_median;
use poseq_models::{Frame, Keypoint};
use tracing::debug;

/// Temporal smoother over a dense sequence.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    config: SmoothingConfig,
    confidence_threshold: f64,
}

impl TemporalSmoother {
    pub fn new(config: SmoothingConfig, confidence_threshold: f64) -> Self {
        Self {
            config,
            confidence_threshold,
        }
    }

    /// Smooth all frames in place, keeping the pre-smoothing keypoints on
    /// each frame. Returns the number of keypoints whose position changed.
    pub fn smooth(&self, frames: &mut [Frame]) -> usize {
        if !self.config.enabled || frames.is_empty() {
            return 0;
        }

        let snapshot: Vec<Vec<Keypoint>> = frames.iter().map(|f| f.keypoints.clone()).collect();
        let n = frames.len();
        let r = self.config.window_radius;
        let mut moved = 0usize;

        for (i, frame) in frames.iter_mut().enumerate() {
            let window = &snapshot[i.saturating_sub(r)..(i + r + 1).min(n)];

            for (k, kp) in frame.keypoints.iter_mut().enumerate() {
                let samples: Vec<&Keypoint> = window
                    .iter()
                    .filter_map(|kps| kps.get(k))
                    .filter(|s| s.is_valid(self.confidence_threshold) && s.is_visible())
                    .collect();
                if samples.is_empty() {
                    continue;
                }

                let before = kp.position;
                for axis in 0..3 {
                    let weighted: Vec<(f64, f64)> = samples
                        .iter()
                        .map(|s| (s.position.axis(axis), s.confidence))
                        .collect();
                    if let Some(value) = weighted_median(&weighted) {
                        kp.position.set_axis(axis, value);
                    }
                }
                if kp.position != before {
                    moved += 1;
                }
            }

            frame.unfiltered = Some(snapshot[i].clone());
        }

        debug!(frames = n, keypoints_moved = moved, "Temporal smoothing applied");
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poseq_models::Point3;

    fn seq(values: &[(f64, f64)]) -> Vec<Frame> {
        values
            .iter()
            .enumerate()
            .map(|(i, &(x, c))| Frame::source(i, 30.0, vec![Keypoint::new(Point3::new(x, 0.0, 0.0), c)]))
            .collect()
    }

    fn smoother() -> TemporalSmoother {
        TemporalSmoother::new(SmoothingConfig::default(), 0.6)
    }

    #[test]
    fn test_spike_removed() {
        let mut frames = seq(&[(0.0, 0.9), (0.0, 0.9), (50.0, 0.9), (0.0, 0.9), (0.0, 0.9)]);
        smoother().smooth(&mut frames);
        assert_eq!(frames[2].keypoints[0].position.x, 0.0);
        let raw = frames[2].unfiltered.as_ref().unwrap();
        assert_eq!(raw[0].position.x, 50.0);
    }

    #[test]
    fn test_linear_motion_preserved_in_interior() {
        let mut frames = seq(&[(0.0, 0.9), (1.0, 0.9), (2.0, 0.9), (3.0, 0.9), (4.0, 0.9)]);
        smoother().smooth(&mut frames);
        assert_eq!(frames[2].keypoints[0].position.x, 2.0);
    }

    #[test]
    fn test_low_confidence_samples_ignored() {
        let mut frames = seq(&[(0.0, 0.9), (0.0, 0.9), (0.0, 0.9), (90.0, 0.1), (90.0, 0.1)]);
        smoother().smooth(&mut frames);
        assert_eq!(frames[2].keypoints[0].position.x, 0.0);
        // Frame 4 still reaches frame 2.
        assert_eq!(frames[4].keypoints[0].position.x, 0.0);
        // Confidence is never rewritten.
        assert_eq!(frames[4].keypoints[0].confidence, 0.1);
    }

    #[test]
    fn test_unchanged_without_qualifying_samples() {
        let mut frames = seq(&[(7.0, 0.1), (8.0, 0.1), (9.0, 0.1)]);
        let moved = smoother().smooth(&mut frames);
        assert_eq!(moved, 0);
        assert_eq!(frames[1].keypoints[0].position.x, 8.0);
    }

    #[test]
    fn test_disabled_is_noop() {
        let mut frames = seq(&[(0.0, 0.9), (50.0, 0.9), (0.0, 0.9)]);
        let config = SmoothingConfig {
            enabled: false,
            ..Default::default()
        };
        TemporalSmoother::new(config, 0.6).smooth(&mut frames);
        assert_eq!(frames[1].keypoints[0].position.x, 50.0);
        assert!(frames[1].unfiltered.is_none());
    }
}
