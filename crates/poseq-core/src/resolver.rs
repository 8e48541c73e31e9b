//! Gap and outlier resolution.
//!
//! Turns per-frame quality records into one decision per frame index:
//! keep the detection, remove it, or reconstruct it from its neighbors.
//!
//! # Priority
//! 1. Off-screen frames are removed.
//! 2. Low-confidence frames: an isolated frame is reconstructed, a run of
//!    two or more is removed.
//! 3. Trend outliers are reconstructed, never removed.
//! 4. Missing and defective frames are reconstructed.
//!
//! When nothing survives, the best-scoring non-defective detections are
//! kept as anchors so the sequence can still be rebuilt around them.

use crate::config::ResolverConfig;
use crate::quality::QualityRecord;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, warn};

/// What happens to a frame's detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Keep,
    Remove,
    Reconstruct,
}

/// Why a decision was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Reliable,
    OffScreen,
    LowConfidence,
    Outlier,
    Missing,
    Defective,
    /// Kept despite its flags because no frame was reliable.
    Anchor,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::Reliable => "reliable",
            DecisionReason::OffScreen => "off_screen",
            DecisionReason::LowConfidence => "low_confidence",
            DecisionReason::Outlier => "outlier",
            DecisionReason::Missing => "missing",
            DecisionReason::Defective => "defective",
            DecisionReason::Anchor => "anchor",
        }
    }
}

/// Decision for one frame index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDecision {
    pub index: usize,
    pub decision: Decision,
    pub reason: DecisionReason,
}

/// Decisions for a whole sequence.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// One entry per frame index, in order.
    pub decisions: Vec<FrameDecision>,
    /// Contiguous runs of removed indices.
    pub removed_blocks: Vec<Range<usize>>,
    /// Contiguous runs of non-kept indices.
    pub gaps: Vec<Range<usize>>,
    /// Gaps longer than the configured ceiling.
    pub long_gaps: Vec<Range<usize>>,
}

impl Resolution {
    pub fn decision(&self, index: usize) -> Option<Decision> {
        self.decisions.get(index).map(|d| d.decision)
    }

    pub fn is_keep(&self, index: usize) -> bool {
        self.decision(index) == Some(Decision::Keep)
    }

    pub fn count(&self, decision: Decision) -> usize {
        self.decisions.iter().filter(|d| d.decision == decision).count()
    }

    pub fn count_reason(&self, reason: DecisionReason) -> usize {
        self.decisions.iter().filter(|d| d.reason == reason).count()
    }
}

/// Gap and outlier resolver.
#[derive(Debug, Clone, Default)]
pub struct GapResolver {
    config: ResolverConfig,
}

impl GapResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolve a sequence. `records[i]` is `None` when the detector reported
    /// nothing for frame `i`.
    pub fn resolve(&self, records: &[Option<QualityRecord>]) -> Resolution {
        let n = records.len();
        let mut decisions: Vec<FrameDecision> = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let (decision, reason) = match record {
                    None => (Decision::Reconstruct, DecisionReason::Missing),
                    Some(r) if r.defective => (Decision::Reconstruct, DecisionReason::Defective),
                    Some(r) if r.off_screen => (Decision::Remove, DecisionReason::OffScreen),
                    // Provisional; settled by run length below.
                    Some(r) if r.low_confidence => {
                        (Decision::Reconstruct, DecisionReason::LowConfidence)
                    }
                    Some(r) if r.outlier => (Decision::Reconstruct, DecisionReason::Outlier),
                    Some(_) => (Decision::Keep, DecisionReason::Reliable),
                };
                FrameDecision {
                    index,
                    decision,
                    reason,
                }
            })
            .collect();

        for run in runs(n, |i| decisions[i].reason == DecisionReason::LowConfidence) {
            if run.len() >= 2 {
                for d in &mut decisions[run.clone()] {
                    d.decision = Decision::Remove;
                }
                debug!(start = run.start, end = run.end, "Removing low-confidence run");
            }
        }

        if !decisions.iter().any(|d| d.decision == Decision::Keep) {
            promote_anchors(records, &mut decisions);
        }

        let removed_blocks = runs(n, |i| decisions[i].decision == Decision::Remove);
        let gaps = runs(n, |i| decisions[i].decision != Decision::Keep);
        let long_gaps: Vec<Range<usize>> = gaps
            .iter()
            .filter(|g| g.len() > self.config.max_gap_frames)
            .cloned()
            .collect();

        for gap in &long_gaps {
            warn!(
                start = gap.start,
                end = gap.end,
                length = gap.len(),
                max_gap_frames = self.config.max_gap_frames,
                "Gap exceeds maximum length; filling anyway"
            );
        }

        Resolution {
            decisions,
            removed_blocks,
            gaps,
            long_gaps,
        }
    }
}

/// Keep the highest-scoring usable detections, preferring on-screen ones.
/// A detection is usable when it is not defective and has a visible
/// keypoint. Leaves `decisions` untouched when there is none.
fn promote_anchors(records: &[Option<QualityRecord>], decisions: &mut [FrameDecision]) {
    let usable = |r: &QualityRecord| !r.defective && r.mean_confidence > 0.0;
    let rank = |r: &QualityRecord| (!r.off_screen, r.quality_score);
    let Some(best) = records
        .iter()
        .flatten()
        .filter(|&r| usable(r))
        .map(rank)
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return;
    };

    let mut promoted = Vec::new();
    for (decision, record) in decisions.iter_mut().zip(records) {
        let Some(r) = record else {
            continue;
        };
        let (on_screen, score) = rank(r);
        if usable(r) && on_screen == best.0 && score >= best.1 - 1e-9 {
            decision.decision = Decision::Keep;
            decision.reason = DecisionReason::Anchor;
            promoted.push(decision.index);
        }
    }
    warn!(
        anchors = promoted.len(),
        first = ?promoted.first(),
        quality_score = best.1,
        "No reliable frame; keeping best detections as anchors"
    );
}

/// Maximal runs of consecutive indices in `0..n` satisfying `pred`.
fn runs(n: usize, pred: impl Fn(usize) -> bool) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = None;
    for i in 0..n {
        match (pred(i), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(s..n);
    }
    out
}
