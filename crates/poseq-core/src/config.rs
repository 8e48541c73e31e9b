//! Configuration for the pose reconstruction pipeline.
//!
//! Every stage reads its own section. All thresholds are fixed for the
//! duration of a run.

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

/// Per-frame quality analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Mean keypoint confidence below which a frame is low-confidence (default: 0.6).
    /// Also the per-sample gate used by trend fitting, smoothing and baselines.
    pub low_confidence_threshold: f64,

    /// Mean confidence below which a frame may be off-screen (default: 0.3)
    pub off_screen_threshold: f64,

    /// Border band as a fraction of image width/height (default: 0.05)
    pub boundary_margin: f64,

    /// Frames in the trend window, candidate included (default: 6, valid 5-7)
    pub trend_window: usize,

    /// Deviation, as a fraction of typical per-frame displacement, that
    /// breaks the trend (default: 0.3)
    pub trend_deviation_fraction: f64,

    /// Lower bound on typical displacement, in pixels (default: 2.0)
    pub displacement_floor: f64,

    /// A keypoint only breaks the trend when it also deviates by more than
    /// this many times the window's fit residual RMS (default: 3.0)
    pub residual_multiplier: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.6,
            off_screen_threshold: 0.3,
            boundary_margin: 0.05,
            trend_window: 6,
            trend_deviation_fraction: 0.3,
            displacement_floor: 2.0,
            residual_multiplier: 3.0,
        }
    }
}

/// Gap and outlier resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Gaps longer than this are reported as warnings (default: 10)
    pub max_gap_frames: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_gap_frames: 10 }
    }
}

/// Temporal smoothing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Half-width of the centered window (default: 2, i.e. 5 frames)
    pub window_radius: usize,

    /// Apply smoothing (default: true)
    pub enabled: bool,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_radius: 2,
            enabled: true,
        }
    }
}

/// Limb-length constraint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimbConfig {
    /// Allowed relative deviation from baseline length (default: 0.2)
    pub tolerance: f64,

    /// Source frames sampled for baseline lengths (default: 10)
    pub baseline_frames: usize,

    /// Below this length a limb direction is degenerate (default: 1e-6)
    pub min_direction_length: f64,
}

impl Default for LimbConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.2,
            baseline_frames: 10,
            min_direction_length: 1e-6,
        }
    }
}

/// Scale normalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Reference lengths below this are degenerate (default: 1e-6)
    pub min_reference_length: f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            min_reference_length: 1e-6,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub quality: QualityConfig,
    pub resolver: ResolverConfig,
    pub smoothing: SmoothingConfig,
    pub limbs: LimbConfig,
    pub normalization: NormalizationConfig,
}

impl PipelineConfig {
    /// Strict config: tighter limbs and trend gate, shorter tolerated gaps.
    pub fn strict() -> Self {
        Self {
            quality: QualityConfig {
                low_confidence_threshold: 0.7,
                trend_window: 7,
                trend_deviation_fraction: 0.25,
                ..Default::default()
            },
            resolver: ResolverConfig { max_gap_frames: 5 },
            limbs: LimbConfig {
                tolerance: 0.1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Lenient config for noisy footage: trusts weaker detections.
    pub fn lenient() -> Self {
        Self {
            quality: QualityConfig {
                low_confidence_threshold: 0.45,
                off_screen_threshold: 0.2,
                trend_window: 5,
                trend_deviation_fraction: 0.5,
                ..Default::default()
            },
            resolver: ResolverConfig { max_gap_frames: 20 },
            limbs: LimbConfig {
                tolerance: 0.3,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> PipelineResult<()> {
        let q = &self.quality;
        check_unit("quality.low_confidence_threshold", q.low_confidence_threshold)?;
        check_unit("quality.off_screen_threshold", q.off_screen_threshold)?;
        if !(0.0..0.5).contains(&q.boundary_margin) {
            return Err(PipelineError::invalid_config(format!(
                "quality.boundary_margin must be in [0, 0.5), got {}",
                q.boundary_margin
            )));
        }
        if !(5..=7).contains(&q.trend_window) {
            return Err(PipelineError::invalid_config(format!(
                "quality.trend_window must be between 5 and 7, got {}",
                q.trend_window
            )));
        }
        check_positive("quality.trend_deviation_fraction", q.trend_deviation_fraction)?;
        check_positive("quality.displacement_floor", q.displacement_floor)?;
        check_positive("quality.residual_multiplier", q.residual_multiplier)?;

        if self.smoothing.window_radius == 0 && self.smoothing.enabled {
            return Err(PipelineError::invalid_config(
                "smoothing.window_radius must be at least 1 when smoothing is enabled",
            ));
        }

        let l = &self.limbs;
        if !(l.tolerance > 0.0 && l.tolerance < 1.0) {
            return Err(PipelineError::invalid_config(format!(
                "limbs.tolerance must be in (0, 1), got {}",
                l.tolerance
            )));
        }
        if l.baseline_frames == 0 {
            return Err(PipelineError::invalid_config(
                "limbs.baseline_frames must be at least 1",
            ));
        }
        check_positive("limbs.min_direction_length", l.min_direction_length)?;
        check_positive(
            "normalization.min_reference_length",
            self.normalization.min_reference_length,
        )?;
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> PipelineResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PipelineError::invalid_config(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}

fn check_positive(name: &str, value: f64) -> PipelineResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PipelineError::invalid_config(format!(
            "{name} must be positive, got {value}"
        )))
    }
}
