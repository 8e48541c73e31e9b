//! End-to-end pipeline orchestration.
//!
//! ```text
//! ingest → quality → resolve → reconstruct → baselines → smooth → limbs → normalize → index map
//! ```
//!
//! Reconstruction runs before smoothing so every later stage sees a dense
//! sequence. Limb baselines are measured on detector frames before smoothing
//! touches them.

use crate::cancel::CancelFlag;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::index_map::IndexMap;
use crate::ingest::{ingest, IngestedStream};
use crate::logging::RunLogger;
use crate::metrics;
use crate::quality::{QualityAnalyzer, QualityRecord};
use crate::reconstruct::SequenceReconstructor;
use crate::resolver::{Decision, DecisionReason, GapResolver, Resolution};
use crate::sequence::PoseSequence;
use crate::skeleton::{LimbBaselines, LimbConstraint, ScaleNormalizer};
use crate::smoother::TemporalSmoother;
use crate::stats::mean;
use poseq_models::{DetectionStream, DiagnosticReport, LimbCorrection, RunId, SkeletonTopology};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_id: RunId,
    pub sequence: PoseSequence,
    pub index_map: IndexMap,
    pub corrections: Vec<LimbCorrection>,
    /// Per-index quality; `None` where the detector reported nothing.
    pub quality: Vec<Option<QualityRecord>>,
    pub resolution: Resolution,
    pub report: DiagnosticReport,
}

/// Pose sequence reconstruction pipeline for one topology.
#[derive(Debug, Clone)]
pub struct PosePipeline {
    config: PipelineConfig,
    topology: Arc<SkeletonTopology>,
}

impl PosePipeline {
    /// Create a pipeline, validating the configuration.
    pub fn new(config: PipelineConfig, topology: SkeletonTopology) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            topology: Arc::new(topology),
        })
    }

    /// SMPL-24 pipeline with default settings.
    pub fn smpl24() -> Self {
        Self {
            config: PipelineConfig::default(),
            topology: Arc::new(SkeletonTopology::smpl24()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn topology(&self) -> &SkeletonTopology {
        &self.topology
    }

    /// Run over one detector stream.
    pub fn run(&self, stream: &DetectionStream) -> PipelineResult<PipelineOutput> {
        self.run_with_cancel(stream, &CancelFlag::new(), RunId::new())
    }

    /// Run with a cancellation flag checked between stages. A cancelled run
    /// returns [`PipelineError::Cancelled`] and produces nothing.
    pub fn run_with_cancel(
        &self,
        stream: &DetectionStream,
        cancel: &CancelFlag,
        run_id: RunId,
    ) -> PipelineResult<PipelineOutput> {
        let mut logger = RunLogger::new(&run_id, stream.frame_count);
        let span = logger.create_span();
        let _guard = span.enter();
        logger.log_start(stream.frames.len());

        let result = self.execute(stream, cancel, run_id, &mut logger);
        let elapsed = logger.elapsed().as_secs_f64();

        match &result {
            Ok(output) => {
                metrics::record_run("success", elapsed);
                metrics::record_report(&output.report);
                logger.log_completion(&output.report);
            }
            Err(PipelineError::Cancelled) => {
                metrics::record_run("cancelled", elapsed);
                logger.log_cancelled();
            }
            Err(e) => {
                metrics::record_run("failed", elapsed);
                logger.log_failure(e);
            }
        }
        result
    }

    fn execute(
        &self,
        stream: &DetectionStream,
        cancel: &CancelFlag,
        run_id: RunId,
        logger: &mut RunLogger,
    ) -> PipelineResult<PipelineOutput> {
        let cfg = &self.config;
        let topology = self.topology.as_ref();
        let threshold = cfg.quality.low_confidence_threshold;

        checkpoint(cancel, logger, "ingest")?;
        let ingested = ingest(stream, topology)?;
        let n = ingested.frame_count();

        checkpoint(cancel, logger, "quality")?;
        let analyzer = QualityAnalyzer::new(cfg.quality.clone(), topology.len());
        let quality = analyzer.analyze_sequence(&ingested.frames, &ingested.bounds);

        checkpoint(cancel, logger, "resolve")?;
        let resolution = GapResolver::new(cfg.resolver.clone()).resolve(&quality);

        checkpoint(cancel, logger, "reconstruct")?;
        let mut frames =
            SequenceReconstructor::new(&ingested.frames, &resolution, ingested.fps)?
                .reconstruct_all()?;

        checkpoint(cancel, logger, "smooth")?;
        let baselines =
            LimbBaselines::derive(topology, &frames, cfg.limbs.baseline_frames, threshold);
        TemporalSmoother::new(cfg.smoothing.clone(), threshold).smooth(&mut frames);

        checkpoint(cancel, logger, "limbs")?;
        let corrections =
            LimbConstraint::new(cfg.limbs.clone()).apply_all(&mut frames, topology, &baselines);

        checkpoint(cancel, logger, "normalize")?;
        let skipped = ScaleNormalizer::new(cfg.normalization.clone(), topology.torso())
            .apply_all(&mut frames);

        checkpoint(cancel, logger, "index_map")?;
        let index_map = IndexMap::from_removed(n, &resolution.removed_blocks);
        let report = build_report(&ingested, &quality, &resolution, &corrections, skipped);

        let sequence = PoseSequence::new(
            frames,
            index_map.clone(),
            Arc::clone(&self.topology),
            ingested.fps,
        );

        Ok(PipelineOutput {
            run_id,
            sequence,
            index_map,
            corrections,
            quality,
            resolution,
            report,
        })
    }
}

fn checkpoint(
    cancel: &CancelFlag,
    logger: &mut RunLogger,
    stage: &'static str,
) -> PipelineResult<()> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    logger.enter_stage(stage);
    Ok(())
}

fn build_report(
    ingested: &IngestedStream,
    quality: &[Option<QualityRecord>],
    resolution: &Resolution,
    corrections: &[LimbCorrection],
    normalization_skipped: usize,
) -> DiagnosticReport {
    let records: Vec<&QualityRecord> = quality.iter().flatten().collect();
    let count = |f: fn(&QualityRecord) -> bool| records.iter().filter(|r| f(r)).count();
    let scores: Vec<f64> = records.iter().map(|r| r.quality_score).collect();
    let corrected: BTreeSet<usize> = corrections.iter().map(|c| c.frame_index).collect();

    DiagnosticReport {
        frame_count: ingested.frame_count(),
        frames_kept: resolution.count(Decision::Keep),
        frames_removed: resolution.count(Decision::Remove),
        frames_reconstructed: resolution.count(Decision::Reconstruct),
        frames_missing: ingested.missing(),
        low_confidence_frames: count(|r| r.low_confidence),
        off_screen_frames: count(|r| r.off_screen),
        outlier_frames: count(|r| r.outlier),
        defective_frames: count(|r| r.defective),
        anchor_frames: resolution.count_reason(DecisionReason::Anchor),
        limb_corrections: corrections.len(),
        frames_corrected: corrected.len(),
        largest_correction: corrections.iter().map(|c| c.magnitude).fold(0.0, f64::max),
        normalization_skipped,
        long_gaps: resolution
            .long_gaps
            .iter()
            .map(|g| [g.start, g.end])
            .collect(),
        average_quality_score: mean(&scores),
    }
}
