//! Batch runner.
//!
//! Each input file gets its own pipeline run on the blocking pool. A
//! semaphore bounds how many runs are in flight at once.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use poseq_core::{CancelFlag, PosePipeline, SequenceExporter};
use poseq_models::{CoordinateConvention, DetectionStream, RunId};

use crate::config::{load_pipeline_config, WorkerConfig};
use crate::error::{WorkerError, WorkerResult};

/// Result of one input file.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub input: PathBuf,
    pub run_id: RunId,
    /// Written export, if the run succeeded.
    pub output: Option<PathBuf>,
    pub error: Option<String>,
    pub duration_secs: f64,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<RunOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Runs the pipeline over a set of detector stream files.
pub struct BatchRunner {
    config: WorkerConfig,
    pipeline: Arc<PosePipeline>,
    run_semaphore: Arc<Semaphore>,
    cancel: CancelFlag,
}

impl BatchRunner {
    /// Create a runner, loading the pipeline configuration.
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        config.validate()?;
        let pipeline_config = load_pipeline_config(config.pipeline_config_path.as_deref())?;
        let pipeline = PosePipeline::new(pipeline_config, config.topology.build())?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create a runner around an existing pipeline.
    pub fn with_pipeline(config: WorkerConfig, pipeline: PosePipeline) -> Self {
        let run_semaphore = Arc::new(Semaphore::new(config.max_concurrent_runs.max(1)));
        Self {
            config,
            pipeline: Arc::new(pipeline),
            run_semaphore,
            cancel: CancelFlag::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Flag shared with every run of this runner.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Process every input. Individual failures are recorded in the
    /// summary; only setup failures return an error.
    pub async fn run_batch(&self, inputs: &[PathBuf]) -> WorkerResult<BatchSummary> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        info!(
            "Starting batch of {} inputs with {} max concurrent runs",
            inputs.len(),
            self.config.max_concurrent_runs
        );

        let mut tasks = JoinSet::new();
        for (position, input) in inputs.iter().enumerate() {
            let permit = Arc::clone(&self.run_semaphore)
                .acquire_owned()
                .await
                .map_err(|e| WorkerError::run_failed(format!("Semaphore closed: {}", e)))?;

            let pipeline = Arc::clone(&self.pipeline);
            let cancel = self.cancel.clone();
            let input = input.clone();
            let out_dir = self.config.output_dir.clone();
            let convention = self.config.convention;

            tasks.spawn(async move {
                let run_id = RunId::new();
                let started = Instant::now();
                let task_input = input.clone();
                let task_run_id = run_id.clone();

                let result = tokio::task::spawn_blocking(move || {
                    process_file(&pipeline, &task_input, &out_dir, convention, &cancel, task_run_id)
                })
                .await
                .map_err(|e| WorkerError::run_failed(format!("Blocking task join error: {}", e)))
                .and_then(|r| r);
                drop(permit);

                let outcome = match result {
                    Ok(path) => RunOutcome {
                        input,
                        run_id,
                        output: Some(path),
                        error: None,
                        duration_secs: started.elapsed().as_secs_f64(),
                    },
                    Err(e) => {
                        error!(run_id = %run_id, "Failed to process {}: {}", input.display(), e);
                        RunOutcome {
                            input,
                            run_id,
                            output: None,
                            error: Some(e.to_string()),
                            duration_secs: started.elapsed().as_secs_f64(),
                        }
                    }
                };
                (position, outcome)
            });
        }

        let mut indexed = Vec::with_capacity(inputs.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => indexed.push(entry),
                Err(e) => warn!("Run task aborted: {}", e),
            }
        }
        indexed.sort_by_key(|(position, _)| *position);

        let summary = BatchSummary {
            outcomes: indexed.into_iter().map(|(_, outcome)| outcome).collect(),
        };
        info!(
            "Batch complete: {} succeeded, {} failed",
            summary.succeeded(),
            summary.failed()
        );
        Ok(summary)
    }
}

/// Read one detector stream, run the pipeline and write
/// `<stem>.sequence.json` into `out_dir`.
pub fn process_file(
    pipeline: &PosePipeline,
    input: &Path,
    out_dir: &Path,
    convention: CoordinateConvention,
    cancel: &CancelFlag,
    run_id: RunId,
) -> WorkerResult<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| WorkerError::invalid_input(input, "file name has no stem"))?;

    let json = std::fs::read_to_string(input)?;
    let stream: DetectionStream = serde_json::from_str(&json)
        .map_err(|e| WorkerError::invalid_input(input, format!("not a detection stream: {}", e)))?;

    let output = pipeline.run_with_cancel(&stream, cancel, run_id)?;
    let export = SequenceExporter::build(&output, convention);

    let path = out_dir.join(format!("{}.sequence.json", stem));
    SequenceExporter::write_to_file(&export, &path)?;
    Ok(path)
}
