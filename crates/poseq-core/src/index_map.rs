//! Bidirectional mapping between original frame numbers and stored positions.
//!
//! Stored positions count only frames that survived filtering. Removed
//! originals map to nothing; they never resolve to a neighbor.

use poseq_models::IndexMapExport;
use std::ops::Range;

/// Original ↔ stored index mapping, O(1) in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexMap {
    forward: Vec<Option<usize>>,
    backward: Vec<usize>,
}

impl IndexMap {
    /// Build from the removed ranges of a sequence of `frame_count` frames.
    /// Ranges may overlap or be unsorted; out-of-range parts are ignored.
    pub fn from_removed(frame_count: usize, removed: &[Range<usize>]) -> Self {
        let mut is_removed = vec![false; frame_count];
        for range in removed {
            let end = range.end.min(frame_count);
            for flag in is_removed.iter_mut().take(end).skip(range.start) {
                *flag = true;
            }
        }

        let mut forward = Vec::with_capacity(frame_count);
        let mut backward = Vec::with_capacity(frame_count);
        for (original, removed) in is_removed.into_iter().enumerate() {
            if removed {
                forward.push(None);
            } else {
                forward.push(Some(backward.len()));
                backward.push(original);
            }
        }
        Self { forward, backward }
    }

    /// Identity mapping.
    pub fn identity(frame_count: usize) -> Self {
        Self::from_removed(frame_count, &[])
    }

    /// Stored position of an original frame.
    #[inline]
    pub fn forward(&self, original: usize) -> Option<usize> {
        self.forward.get(original).copied().flatten()
    }

    /// Original frame at a stored position.
    #[inline]
    pub fn backward(&self, stored: usize) -> Option<usize> {
        self.backward.get(stored).copied()
    }

    pub fn is_removed(&self, original: usize) -> bool {
        original < self.forward.len() && self.forward[original].is_none()
    }

    /// Number of original frames.
    pub fn original_len(&self) -> usize {
        self.forward.len()
    }

    /// Number of stored frames.
    pub fn stored_len(&self) -> usize {
        self.backward.len()
    }

    /// Removed original indices, ascending.
    pub fn removed(&self) -> impl Iterator<Item = usize> + '_ {
        self.forward
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_none().then_some(i))
    }

    /// Serializable pair-list form.
    pub fn to_export(&self) -> IndexMapExport {
        IndexMapExport {
            original_to_stored: self
                .forward
                .iter()
                .enumerate()
                .filter_map(|(o, s)| s.map(|s| (o, s)))
                .collect(),
            stored_to_original: self.backward.iter().copied().enumerate().collect(),
            removed: self.removed().collect(),
        }
    }
}
