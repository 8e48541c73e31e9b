//! Per-frame detection quality analysis.
//!
//! Scores each frame and raises four independent flags:
//! - `low_confidence`: mean keypoint confidence below the threshold
//! - `off_screen`: very low confidence *and* most visible keypoints hugging the image border
//! - `outlier`: most keypoints break the motion trend of the preceding frames
//! - `defective`: structurally unusable (wrong keypoint count, non-finite values, empty mesh)
//!
//! The analysis of one frame is a pure function of the frame, the image
//! bounds and the preceding frames.

use crate::config::QualityConfig;
use crate::stats::{linear_fit, mean, LineFit};
use poseq_models::{Frame, Point3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Image extent the detector ran on, in the same units as keypoint x/y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBounds {
    pub width: f64,
    pub height: f64,
}

impl ImageBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether `p` lies inside the border band or outside the image.
    pub fn is_near_edge(&self, p: Point3, margin: f64) -> bool {
        let mx = self.width * margin;
        let my = self.height * margin;
        p.x <= mx || p.x >= self.width - mx || p.y <= my || p.y >= self.height - my
    }
}

/// Quality assessment of one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityRecord {
    pub index: usize,
    /// Overall reliability in [0, 1].
    pub quality_score: f64,
    pub mean_confidence: f64,
    /// Fraction of evaluable keypoints that broke the trend.
    pub trend_breaking_fraction: f64,
    pub low_confidence: bool,
    pub off_screen: bool,
    pub outlier: bool,
    pub defective: bool,
}

impl QualityRecord {
    /// No flag raised.
    pub fn is_clean(&self) -> bool {
        !(self.low_confidence || self.off_screen || self.outlier || self.defective)
    }
}

/// Frame quality analyzer.
#[derive(Debug, Clone)]
pub struct QualityAnalyzer {
    config: QualityConfig,
    keypoint_count: usize,
}

impl QualityAnalyzer {
    pub fn new(config: QualityConfig, keypoint_count: usize) -> Self {
        Self {
            config,
            keypoint_count,
        }
    }

    /// Analyze one frame against the frames preceding it.
    ///
    /// `history` is in ascending index order. Only its trailing
    /// `trend_window - 1` reliable frames take part in trend fitting.
    pub fn analyze(&self, frame: &Frame, bounds: &ImageBounds, history: &[&Frame]) -> QualityRecord {
        let mean_confidence = frame.mean_confidence();

        if self.is_defective(frame) {
            debug!(frame_index = frame.index, "Frame is structurally defective");
            return QualityRecord {
                index: frame.index,
                mean_confidence,
                defective: true,
                ..Default::default()
            };
        }

        let low_confidence = mean_confidence < self.config.low_confidence_threshold;
        let off_screen = mean_confidence < self.config.off_screen_threshold
            && self.mostly_near_edge(frame, bounds);

        let window = self.trend_history(history);
        let (outlier, trend_breaking_fraction) = self.trend_check(frame, &window);

        let quality_score =
            (mean_confidence * (1.0 - 0.5 * trend_breaking_fraction)).clamp(0.0, 1.0);

        QualityRecord {
            index: frame.index,
            quality_score,
            mean_confidence,
            trend_breaking_fraction,
            low_confidence,
            off_screen,
            outlier,
            defective: false,
        }
    }

    /// Analyze every present frame of a sparse sequence.
    ///
    /// Each frame is judged against the clean frames that precede it.
    /// Flagged frames never enter the trend history, except that
    /// `trend_window - 1` consecutive outliers which are otherwise sound
    /// replace it: the subject has moved and the new position is the trend.
    pub fn analyze_sequence(
        &self,
        frames: &[Option<Frame>],
        bounds: &ImageBounds,
    ) -> Vec<Option<QualityRecord>> {
        let keep = self.config.trend_window.saturating_sub(1);
        let mut history: Vec<&Frame> = Vec::with_capacity(keep + 1);
        let mut diverging: Vec<&Frame> = Vec::new();

        frames
            .iter()
            .map(|slot| {
                let frame = slot.as_ref()?;
                let record = self.analyze(frame, bounds, &history);
                if record.is_clean() {
                    diverging.clear();
                    history.push(frame);
                    if history.len() > keep {
                        history.remove(0);
                    }
                } else if record.outlier && !record.low_confidence && !record.off_screen {
                    diverging.push(frame);
                    if diverging.len() >= keep {
                        debug!(
                            frame_index = frame.index,
                            run = diverging.len(),
                            "Sustained trend break; restarting trend history"
                        );
                        history = std::mem::take(&mut diverging);
                    }
                }
                Some(record)
            })
            .collect()
    }

    /// Frame may serve as trend history.
    pub fn is_reliable(&self, frame: &Frame) -> bool {
        !self.is_defective(frame) && frame.mean_confidence() >= self.config.low_confidence_threshold
    }

    fn is_defective(&self, frame: &Frame) -> bool {
        frame.keypoints.len() != self.keypoint_count
            || frame.keypoints.iter().any(|k| !k.position.is_finite())
            || frame.mesh.as_ref().is_some_and(|m| m.is_empty())
            || frame
                .mesh
                .as_ref()
                .is_some_and(|m| m.vertices.iter().any(|v| !v.is_finite()))
    }

    fn mostly_near_edge(&self, frame: &Frame, bounds: &ImageBounds) -> bool {
        let mut visible = 0usize;
        let mut near = 0usize;
        for kp in frame.keypoints.iter().filter(|k| k.is_visible()) {
            visible += 1;
            if bounds.is_near_edge(kp.position, self.config.boundary_margin) {
                near += 1;
            }
        }
        visible > 0 && near * 2 > visible
    }

    fn trend_history<'a>(&self, history: &[&'a Frame]) -> Vec<&'a Frame> {
        let keep = self.config.trend_window.saturating_sub(1);
        let mut window: Vec<&Frame> = history
            .iter()
            .rev()
            .filter(|f| self.is_reliable(f))
            .take(keep)
            .copied()
            .collect();
        window.reverse();
        window
    }

    /// Returns `(outlier, trend_breaking_fraction)`.
    ///
    /// A keypoint breaks the trend when its distance from the fitted
    /// prediction exceeds both `trend_deviation_fraction` of the typical
    /// displacement and `residual_multiplier` times the window's noise.
    fn trend_check(&self, frame: &Frame, window: &[&Frame]) -> (bool, f64) {
        if window.len() < 2 {
            return (false, 0.0);
        }
        let threshold = self.config.low_confidence_threshold;

        // Per-keypoint history samples: (frame index, position).
        let samples: Vec<Vec<(f64, Point3)>> = (0..self.keypoint_count)
            .map(|k| {
                window
                    .iter()
                    .filter(|f| f.keypoints[k].is_valid(threshold))
                    .map(|f| (f.index as f64, f.keypoints[k].position))
                    .collect()
            })
            .collect();
        let trends: Vec<Option<Trend>> = samples
            .iter()
            .map(|history| if history.len() < 2 { None } else { Trend::fit(history) })
            .collect();

        let displacement = self.typical_displacement(&samples);
        let noise = residual_rms(&samples, &trends).unwrap_or(displacement);
        let limit = (self.config.trend_deviation_fraction * displacement)
            .max(self.config.residual_multiplier * noise);
        let t = frame.index as f64;

        let mut evaluable = 0usize;
        let mut breaking = 0usize;
        for (k, trend) in trends.iter().enumerate() {
            let candidate = &frame.keypoints[k];
            let Some(trend) = trend else {
                continue;
            };
            if !candidate.is_visible() {
                continue;
            }
            evaluable += 1;
            if candidate.position.distance(trend.at(t)) > limit {
                breaking += 1;
            }
        }

        if evaluable == 0 {
            return (false, 0.0);
        }
        let fraction = breaking as f64 / evaluable as f64;
        (breaking * 2 > evaluable, fraction)
    }

    /// Mean per-index-step displacement across the window, floored.
    fn typical_displacement(&self, samples: &[Vec<(f64, Point3)>]) -> f64 {
        let mut steps = Vec::new();
        for history in samples {
            for pair in history.windows(2) {
                let dt = pair[1].0 - pair[0].0;
                if dt > 0.0 {
                    steps.push(pair[1].1.distance(pair[0].1) / dt);
                }
            }
        }
        mean(&steps).max(self.config.displacement_floor)
    }
}

/// Least-squares motion of one keypoint, one line per axis.
#[derive(Debug, Clone, Copy)]
struct Trend([LineFit; 3]);

impl Trend {
    fn fit(history: &[(f64, Point3)]) -> Option<Self> {
        let axis = |a: usize| {
            let points: Vec<(f64, f64)> = history.iter().map(|(x, p)| (*x, p.axis(a))).collect();
            linear_fit(&points)
        };
        Some(Self([axis(0)?, axis(1)?, axis(2)?]))
    }

    fn at(&self, t: f64) -> Point3 {
        let mut out = Point3::ZERO;
        for (axis, line) in self.0.iter().enumerate() {
            out.set_axis(axis, line.predict(t));
        }
        out
    }
}

/// Pooled RMS distance of the history samples from their own trends, with
/// two degrees of freedom spent per fitted keypoint. `None` when every
/// trend passes exactly through its samples by construction.
fn residual_rms(samples: &[Vec<(f64, Point3)>], trends: &[Option<Trend>]) -> Option<f64> {
    let mut sum_sq = 0.0;
    let mut dof = 0usize;
    for (history, trend) in samples.iter().zip(trends) {
        let Some(trend) = trend else {
            continue;
        };
        sum_sq += history
            .iter()
            .map(|(t, p)| p.distance(trend.at(*t)).powi(2))
            .sum::<f64>();
        dof += history.len() - 2;
    }
    (dof > 0).then(|| (sum_sq / dof as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use poseq_models::{Keypoint, Mesh};

    const COUNT: usize = 4;

    fn bounds() -> ImageBounds {
        ImageBounds::new(1000.0, 1000.0)
    }

    fn frame_at(index: usize, offset: f64, confidence: f64) -> Frame {
        let kps = (0..COUNT)
            .map(|k| Keypoint::new(Point3::new(400.0 + 20.0 * k as f64 + offset, 500.0, 0.0), confidence))
            .collect();
        Frame::source(index, 30.0, kps)
    }

    fn analyzer() -> QualityAnalyzer {
        QualityAnalyzer::new(QualityConfig::default(), COUNT)
    }

    #[test]
    fn test_clean_frame() {
        let f = frame_at(0, 0.0, 0.9);
        let record = analyzer().analyze(&f, &bounds(), &[]);
        assert!(record.is_clean());
        assert!((record.quality_score - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_low_confidence_flag() {
        let f = frame_at(0, 0.0, 0.5);
        let record = analyzer().analyze(&f, &bounds(), &[]);
        assert!(record.low_confidence);
        assert!(!record.off_screen);
    }

    #[test]
    fn test_off_screen_requires_edge_and_low_confidence() {
        let mut f = frame_at(0, 0.0, 0.2);
        // Centered but faint: low confidence only.
        let record = analyzer().analyze(&f, &bounds(), &[]);
        assert!(record.low_confidence && !record.off_screen);

        // Three of four visible keypoints at the right edge.
        for k in 0..3 {
            f.keypoints[k].position.x = 990.0;
        }
        let record = analyzer().analyze(&f, &bounds(), &[]);
        assert!(record.off_screen);

        // At the edge but confident: not off-screen.
        let mut bright = f.clone();
        for kp in &mut bright.keypoints {
            kp.confidence = 0.9;
        }
        assert!(!analyzer().analyze(&bright, &bounds(), &[]).off_screen);
    }

    #[test]
    fn test_off_screen_ignores_invisible_keypoints() {
        let mut f = frame_at(0, 0.0, 0.0);
        f.keypoints[0] = Keypoint::new(Point3::new(5.0, 5.0, 0.0), 0.4);
        // One visible keypoint, at the edge: strict majority of visible ones.
        assert!(analyzer().analyze(&f, &bounds(), &[]).off_screen);

        let none_visible = frame_at(0, 0.0, 0.0);
        assert!(!analyzer().analyze(&none_visible, &bounds(), &[]).off_screen);
    }

    #[test]
    fn test_defective_frames() {
        let mut nan = frame_at(0, 0.0, 0.9);
        nan.keypoints[1].position.y = f64::NAN;
        let record = analyzer().analyze(&nan, &bounds(), &[]);
        assert!(record.defective);
        assert_eq!(record.quality_score, 0.0);

        let mut short = frame_at(0, 0.0, 0.9);
        short.keypoints.pop();
        assert!(analyzer().analyze(&short, &bounds(), &[]).defective);

        let empty_mesh = frame_at(0, 0.0, 0.9).with_mesh(Mesh::default());
        assert!(analyzer().analyze(&empty_mesh, &bounds(), &[]).defective);
    }

    #[test]
    fn test_trend_follows_linear_motion() {
        let history: Vec<Frame> = (0..5).map(|i| frame_at(i, 10.0 * i as f64, 0.9)).collect();
        let refs: Vec<&Frame> = history.iter().collect();

        let on_trend = frame_at(5, 50.0, 0.9);
        let record = analyzer().analyze(&on_trend, &bounds(), &refs);
        assert!(!record.outlier);
        assert_eq!(record.trend_breaking_fraction, 0.0);

        let jump = frame_at(5, 120.0, 0.9);
        let record = analyzer().analyze(&jump, &bounds(), &refs);
        assert!(record.outlier);
        assert_eq!(record.trend_breaking_fraction, 1.0);
        assert!((record.quality_score - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_trend_needs_two_reliable_frames() {
        let history = [frame_at(0, 0.0, 0.9), frame_at(1, 0.0, 0.2)];
        let refs: Vec<&Frame> = history.iter().collect();
        let jump = frame_at(2, 300.0, 0.9);
        assert!(!analyzer().analyze(&jump, &bounds(), &refs).outlier);
    }

    #[test]
    fn test_minority_breaking_is_not_outlier() {
        let history: Vec<Frame> = (0..5).map(|i| frame_at(i, 0.0, 0.9)).collect();
        let refs: Vec<&Frame> = history.iter().collect();
        let mut candidate = frame_at(5, 0.0, 0.9);
        candidate.keypoints[0].position.x += 200.0;
        let record = analyzer().analyze(&candidate, &bounds(), &refs);
        assert!(!record.outlier);
        assert!((record.trend_breaking_fraction - 0.25).abs() < 1e-12);
    }

    fn outlier_indices(records: &[Option<QualityRecord>]) -> Vec<usize> {
        records.iter().flatten().filter(|r| r.outlier).map(|r| r.index).collect()
    }

    #[test]
    fn test_spike_does_not_bend_later_trend() {
        let frames: Vec<Option<Frame>> = (0..30)
            .map(|i| {
                let spike = if i == 15 { 120.0 } else { 0.0 };
                Some(frame_at(i, 10.0 * i as f64 + spike, 0.9))
            })
            .collect();
        let records = analyzer().analyze_sequence(&frames, &bounds());
        assert_eq!(outlier_indices(&records), vec![15]);
        assert_eq!(records[16].as_ref().unwrap().trend_breaking_fraction, 0.0);
    }

    #[test]
    fn test_sustained_shift_becomes_new_trend() {
        let frames: Vec<Option<Frame>> = (0..20)
            .map(|i| Some(frame_at(i, if i >= 10 { 150.0 } else { 0.0 }, 0.9)))
            .collect();
        let records = analyzer().analyze_sequence(&frames, &bounds());
        assert_eq!(outlier_indices(&records), vec![10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_still_subject_jitter_is_not_outlier() {
        let wobble = |n: usize| ((n % 9) as f64 - 4.0) * 0.2;
        let frames: Vec<Option<Frame>> = (0..60)
            .map(|i| {
                let kps = (0..COUNT)
                    .map(|k| {
                        let x = 400.0 + 20.0 * k as f64 + wobble(i * 37 + k * 11);
                        let y = 500.0 + wobble(i * 23 + k * 7 + 3);
                        Keypoint::new(Point3::new(x, y, 0.0), 0.9)
                    })
                    .collect();
                Some(Frame::source(i, 30.0, kps))
            })
            .collect();
        let records = analyzer().analyze_sequence(&frames, &bounds());
        assert!(outlier_indices(&records).is_empty());
        assert!(records.iter().flatten().all(|r| r.trend_breaking_fraction <= 0.25));
    }

    #[test]
    fn test_analyze_sequence_skips_missing() {
        let frames = vec![Some(frame_at(0, 0.0, 0.9)), None, Some(frame_at(2, 0.0, 0.9))];
        let records = analyzer().analyze_sequence(&frames, &bounds());
        assert_eq!(records.len(), 3);
        assert!(records[1].is_none());
        assert_eq!(records[2].as_ref().map(|r| r.index), Some(2));
    }
}
