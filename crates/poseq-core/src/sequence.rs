//! Finalized, immutable pose sequence.

use crate::index_map::IndexMap;
use poseq_models::{Frame, FrameStatus, SkeletonTopology};
use std::sync::Arc;

/// Result of looking up an original frame number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameLookup<'a> {
    Available(&'a Frame),
    /// The frame was removed, or the index is past the end.
    Unavailable,
}

impl<'a> FrameLookup<'a> {
    pub fn frame(self) -> Option<&'a Frame> {
        match self {
            FrameLookup::Available(f) => Some(f),
            FrameLookup::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FrameLookup::Available(_))
    }
}

/// Dense sequence with one frame per source video frame.
///
/// Cheap to clone and safe to share across threads.
#[derive(Debug, Clone)]
pub struct PoseSequence {
    frames: Arc<[Frame]>,
    index_map: Arc<IndexMap>,
    topology: Arc<SkeletonTopology>,
    fps: f64,
}

impl PoseSequence {
    pub fn new(
        frames: Vec<Frame>,
        index_map: IndexMap,
        topology: Arc<SkeletonTopology>,
        fps: f64,
    ) -> Self {
        Self {
            frames: frames.into(),
            index_map: Arc::new(index_map),
            topology,
            fps,
        }
    }

    /// Frames in original index order, removed frames included.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn topology(&self) -> &SkeletonTopology {
        &self.topology
    }

    pub fn index_map(&self) -> &IndexMap {
        &self.index_map
    }

    /// Frame for an original frame number, unless that frame was removed.
    pub fn frame_by_original(&self, original: usize) -> FrameLookup<'_> {
        match self.index_map.forward(original) {
            Some(_) => self
                .frames
                .get(original)
                .map_or(FrameLookup::Unavailable, FrameLookup::Available),
            None => FrameLookup::Unavailable,
        }
    }

    /// Frame at a stored (post-filtering) position.
    pub fn frame_by_stored(&self, stored: usize) -> Option<&Frame> {
        self.index_map
            .backward(stored)
            .and_then(|original| self.frames.get(original))
    }

    /// Frames that survived filtering, in stored order.
    pub fn stored_frames(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.frames
            .iter()
            .filter(|f| f.status != FrameStatus::Rejected)
    }

    /// Frames with the given status.
    pub fn count_status(&self, status: FrameStatus) -> usize {
        self.frames.iter().filter(|f| f.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poseq_models::{Derivation, Keypoint, Point3};

    fn sequence() -> PoseSequence {
        let topology = Arc::new(
            SkeletonTopology::new(&["a", "b"], &[("a", "b")]).unwrap(),
        );
        let kps = vec![Keypoint::new(Point3::ZERO, 0.9); 2];
        let frames = vec![
            Frame::source(0, 30.0, kps.clone()),
            Frame::synthesized(
                1,
                30.0,
                FrameStatus::Rejected,
                kps.clone(),
                Derivation::Duplicated { source: 0 },
            ),
            Frame::source(2, 30.0, kps),
        ];
        PoseSequence::new(frames, IndexMap::from_removed(3, &[1..2]), topology, 30.0)
    }

    #[test]
    fn test_lookup_by_original() {
        let seq = sequence();
        assert_eq!(seq.frame_by_original(0).frame().map(|f| f.index), Some(0));
        assert_eq!(seq.frame_by_original(1), FrameLookup::Unavailable);
        assert_eq!(seq.frame_by_original(9), FrameLookup::Unavailable);
    }

    #[test]
    fn test_lookup_by_stored() {
        let seq = sequence();
        assert_eq!(seq.frame_by_stored(1).map(|f| f.index), Some(2));
        assert!(seq.frame_by_stored(2).is_none());
        assert_eq!(seq.stored_frames().count(), 2);
    }

    #[test]
    fn test_sequence_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PoseSequence>();
    }
}
