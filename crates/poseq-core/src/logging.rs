//! Structured run logging.
//!
//! One [`RunLogger`] follows a pipeline run from start to finish. Every
//! record carries the run id and the declared frame count, and each stage
//! transition closes the previous stage with its wall-clock duration.

use crate::error::PipelineError;
use crate::metrics;
use poseq_models::{DiagnosticReport, RunId};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Span};

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTiming {
    pub stage: &'static str,
    pub elapsed: Duration,
}

/// Logger and stage clock for one run.
#[derive(Debug)]
pub struct RunLogger {
    run_id: String,
    frame_count: usize,
    started: Instant,
    current: Option<(&'static str, Instant)>,
    timings: Vec<StageTiming>,
}

impl RunLogger {
    pub fn new(run_id: &RunId, frame_count: usize) -> Self {
        Self {
            run_id: run_id.to_string(),
            frame_count,
            started: Instant::now(),
            current: None,
            timings: Vec::new(),
        }
    }

    pub fn log_start(&self, detector_records: usize) {
        info!(
            run_id = %self.run_id,
            frame_count = self.frame_count,
            detector_records,
            "Run started"
        );
    }

    /// Close the running stage, if any, and open `stage`.
    pub fn enter_stage(&mut self, stage: &'static str) {
        self.finish_stage();
        debug!(run_id = %self.run_id, stage, "Stage started");
        self.current = Some((stage, Instant::now()));
    }

    /// Stage currently open.
    pub fn stage(&self) -> Option<&'static str> {
        self.current.map(|(stage, _)| stage)
    }

    /// Closed stages, in execution order.
    pub fn timings(&self) -> &[StageTiming] {
        &self.timings
    }

    /// Time since the logger was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn log_completion(&mut self, report: &DiagnosticReport) {
        self.finish_stage();
        let slowest = self.timings.iter().max_by_key(|t| t.elapsed);
        info!(
            run_id = %self.run_id,
            frame_count = self.frame_count,
            kept = report.frames_kept,
            removed = report.frames_removed,
            reconstructed = report.frames_reconstructed,
            anchors = report.anchor_frames,
            corrections = report.limb_corrections,
            elapsed_ms = self.elapsed().as_millis() as u64,
            slowest_stage = ?slowest.map(|t| t.stage),
            "Run completed"
        );
    }

    pub fn log_cancelled(&mut self) {
        let stage = self.stage();
        self.finish_stage();
        warn!(
            run_id = %self.run_id,
            stage = ?stage,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Run cancelled"
        );
    }

    pub fn log_failure(&mut self, err: &PipelineError) {
        let stage = self.stage();
        self.finish_stage();
        error!(
            run_id = %self.run_id,
            frame_count = self.frame_count,
            stage = ?stage,
            error = %err,
            "Run failed"
        );
    }

    /// Create a tracing span for this run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "run",
            run_id = %self.run_id,
            frame_count = self.frame_count
        )
    }

    fn finish_stage(&mut self) {
        let Some((stage, since)) = self.current.take() else {
            return;
        };
        let elapsed = since.elapsed();
        metrics::record_stage(stage, elapsed.as_secs_f64());
        debug!(
            run_id = %self.run_id,
            stage,
            elapsed_us = elapsed.as_micros() as u64,
            "Stage finished"
        );
        self.timings.push(StageTiming { stage, elapsed });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_close_in_order() {
        let mut logger = RunLogger::new(&RunId::new(), 12);
        assert_eq!(logger.stage(), None);

        logger.enter_stage("ingest");
        logger.enter_stage("quality");
        assert_eq!(logger.stage(), Some("quality"));
        assert_eq!(logger.timings().len(), 1);

        logger.log_completion(&DiagnosticReport::default());
        let stages: Vec<&str> = logger.timings().iter().map(|t| t.stage).collect();
        assert_eq!(stages, vec!["ingest", "quality"]);
        assert_eq!(logger.stage(), None);
        assert!(logger.timings().iter().all(|t| t.elapsed <= logger.elapsed()));
    }

    #[test]
    fn test_failure_closes_open_stage() {
        let mut logger = RunLogger::new(&RunId::new(), 3);
        logger.enter_stage("reconstruct");
        logger.log_failure(&PipelineError::NoReliableFrames(3));
        assert_eq!(logger.timings().len(), 1);
        assert_eq!(logger.timings()[0].stage, "reconstruct");

        // Closing twice records nothing new.
        logger.log_cancelled();
        assert_eq!(logger.timings().len(), 1);
    }
}
