//! Worker configuration.
//!
//! Process settings come from `WORKER_*` environment variables. Pipeline
//! thresholds are layered: built-in defaults, then an optional TOML/JSON
//! file, then `POSEQ__<SECTION>__<KEY>` environment overrides
//! (e.g. `POSEQ__LIMBS__TOLERANCE=0.15`).

use crate::error::{WorkerError, WorkerResult};
use poseq_core::PipelineConfig;
use poseq_models::{CoordinateConvention, SkeletonTopology};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Built-in skeleton layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TopologyKind {
    #[default]
    Smpl24,
    Coco17,
}

impl TopologyKind {
    pub fn build(&self) -> SkeletonTopology {
        match self {
            TopologyKind::Smpl24 => SkeletonTopology::smpl24(),
            TopologyKind::Coco17 => SkeletonTopology::coco17(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyKind::Smpl24 => "smpl24",
            TopologyKind::Coco17 => "coco17",
        }
    }
}

impl FromStr for TopologyKind {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "smpl24" | "smpl" => Ok(TopologyKind::Smpl24),
            "coco17" | "coco" => Ok(TopologyKind::Coco17),
            other => Err(WorkerError::config_error(format!("unknown topology '{other}'"))),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent pipeline runs
    pub max_concurrent_runs: usize,
    /// Directory for `<stem>.sequence.json` outputs
    pub output_dir: PathBuf,
    /// Skeleton layout of the detector output
    pub topology: TopologyKind,
    /// Coordinate convention of the export
    pub convention: CoordinateConvention,
    /// Optional pipeline config file
    pub pipeline_config_path: Option<PathBuf>,
    /// Print a Prometheus snapshot after the batch
    pub metrics_enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 4,
            output_dir: PathBuf::from("."),
            topology: TopologyKind::Smpl24,
            convention: CoordinateConvention::Detector,
            pipeline_config_path: None,
            metrics_enabled: false,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_runs: std::env::var("WORKER_MAX_RUNS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_concurrent_runs),
            output_dir: std::env::var("WORKER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            topology: std::env::var("WORKER_TOPOLOGY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.topology),
            convention: match std::env::var("WORKER_CONVENTION").as_deref() {
                Ok("viewer") | Ok("viewer_y_up") => CoordinateConvention::ViewerYUp,
                _ => defaults.convention,
            },
            pipeline_config_path: std::env::var("POSEQ_CONFIG").ok().map(PathBuf::from),
            metrics_enabled: std::env::var("WORKER_METRICS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.max_concurrent_runs == 0 {
            return Err(WorkerError::config_error("max_concurrent_runs must be at least 1"));
        }
        Ok(())
    }
}

/// Load the pipeline configuration: defaults, then `path` (if any), then
/// `POSEQ__*` environment overrides.
pub fn load_pipeline_config(path: Option<&Path>) -> WorkerResult<PipelineConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        if !path.exists() {
            return Err(WorkerError::config_error(format!(
                "pipeline config {} does not exist",
                path.display()
            )));
        }
        builder = builder.add_source(config::File::from(path));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("POSEQ")
            .separator("__")
            .try_parsing(true),
    );

    let pipeline: PipelineConfig = builder.build()?.try_deserialize()?;
    pipeline.validate()?;
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_topology_kind_parse() {
        assert_eq!("SMPL24".parse::<TopologyKind>().unwrap(), TopologyKind::Smpl24);
        assert_eq!("coco".parse::<TopologyKind>().unwrap(), TopologyKind::Coco17);
        assert!("mano".parse::<TopologyKind>().is_err());
        assert_eq!(TopologyKind::Coco17.build().len(), 17);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.topology, TopologyKind::Smpl24);
    }

    #[test]
    fn test_load_pipeline_config_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[limbs]\ntolerance = 0.15\n\n[resolver]\nmax_gap_frames = 4").unwrap();

        let config = load_pipeline_config(Some(file.path())).unwrap();
        assert_eq!(config.limbs.tolerance, 0.15);
        assert_eq!(config.resolver.max_gap_frames, 4);
        assert_eq!(config.quality.trend_window, 6);
    }

    #[test]
    fn test_load_pipeline_config_rejects_invalid_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[quality]\ntrend_window = 12").unwrap();
        assert!(matches!(
            load_pipeline_config(Some(file.path())),
            Err(WorkerError::Pipeline(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let result = load_pipeline_config(Some(Path::new("/nonexistent/poseq.toml")));
        assert!(matches!(result, Err(WorkerError::ConfigError(_))));
    }
}
