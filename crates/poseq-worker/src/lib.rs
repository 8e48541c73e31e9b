//! Batch worker for pose sequence reconstruction.
//!
//! Reads detector stream JSON files, runs them through the pipeline with
//! bounded concurrency and writes one sequence export per input.

pub mod args;
pub mod config;
pub mod error;
pub mod runner;

pub use args::Cli;
pub use config::{load_pipeline_config, TopologyKind, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use runner::{process_file, BatchRunner, BatchSummary, RunOutcome};
