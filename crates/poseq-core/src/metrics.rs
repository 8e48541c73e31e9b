//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding process installs a recorder.

use metrics::{counter, histogram};
use poseq_models::DiagnosticReport;

/// Metric names as constants for consistency.
pub mod names {
    // Run metrics
    pub const RUNS_TOTAL: &str = "poseq_runs_total";
    pub const RUN_DURATION_SECONDS: &str = "poseq_run_duration_seconds";
    pub const STAGE_DURATION_SECONDS: &str = "poseq_stage_duration_seconds";

    // Frame metrics
    pub const FRAMES_REMOVED_TOTAL: &str = "poseq_frames_removed_total";
    pub const FRAMES_RECONSTRUCTED_TOTAL: &str = "poseq_frames_reconstructed_total";
    pub const QUALITY_SCORE: &str = "poseq_quality_score";

    // Skeleton metrics
    pub const LIMB_CORRECTIONS_TOTAL: &str = "poseq_limb_corrections_total";
}

/// Record a finished run.
pub fn record_run(status: &str, duration_secs: f64) {
    let labels = [("status", status.to_string())];
    counter!(names::RUNS_TOTAL, &labels).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record the duration of one pipeline stage.
pub fn record_stage(stage: &'static str, duration_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(duration_secs);
}

/// Record the frame-level outcome of a successful run.
pub fn record_report(report: &DiagnosticReport) {
    counter!(names::FRAMES_REMOVED_TOTAL).increment(report.frames_removed as u64);
    counter!(names::FRAMES_RECONSTRUCTED_TOTAL).increment(report.frames_reconstructed as u64);
    counter!(names::LIMB_CORRECTIONS_TOTAL).increment(report.limb_corrections as u64);
    histogram!(names::QUALITY_SCORE).record(report.average_quality_score);
}
