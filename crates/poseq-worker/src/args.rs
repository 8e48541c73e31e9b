//! Command-line arguments.

use crate::config::{TopologyKind, WorkerConfig};
use clap::Parser;
use poseq_models::CoordinateConvention;
use std::path::PathBuf;

/// Reconstruct continuous pose sequences from per-frame detector output.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Detector stream JSON files to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory (defaults to WORKER_OUTPUT_DIR or the current directory)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Pipeline config file (TOML, JSON or YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skeleton layout of the detector output
    #[arg(short, long, value_enum)]
    pub topology: Option<TopologyKind>,

    /// Export in the y-up viewer convention
    #[arg(long, default_value_t = false)]
    pub viewer: bool,

    /// Maximum concurrent runs
    #[arg(long)]
    pub max_runs: Option<usize>,

    /// Print a Prometheus metrics snapshot when done
    #[arg(long, default_value_t = false)]
    pub metrics: bool,
}

impl Cli {
    /// Overlay explicit flags on an environment-derived config.
    pub fn apply(&self, mut config: WorkerConfig) -> WorkerConfig {
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if let Some(path) = &self.config {
            config.pipeline_config_path = Some(path.clone());
        }
        if let Some(topology) = self.topology {
            config.topology = topology;
        }
        if self.viewer {
            config.convention = CoordinateConvention::ViewerYUp;
        }
        if let Some(n) = self.max_runs {
            config.max_concurrent_runs = n;
        }
        config.metrics_enabled |= self.metrics;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "poseq-worker",
            "a.json",
            "b.json",
            "--out",
            "/tmp/out",
            "--topology",
            "coco17",
            "--viewer",
            "--max-runs",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.inputs.len(), 2);
        let config = cli.apply(WorkerConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.topology, TopologyKind::Coco17);
        assert_eq!(config.convention, CoordinateConvention::ViewerYUp);
        assert_eq!(config.max_concurrent_runs, 3);
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn test_inputs_required() {
        assert!(Cli::try_parse_from(["poseq-worker"]).is_err());
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let cli = Cli::try_parse_from(["poseq-worker", "a.json"]).unwrap();
        let base = WorkerConfig {
            max_concurrent_runs: 7,
            ..WorkerConfig::default()
        };
        let config = cli.apply(base);
        assert_eq!(config.max_concurrent_runs, 7);
        assert_eq!(config.convention, CoordinateConvention::Detector);
    }
}
