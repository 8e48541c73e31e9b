//! Sequence reconstruction.
//!
//! Fills every non-kept index so the output has exactly one frame per source
//! frame. Interior gaps are linearly interpolated between the nearest kept
//! frames on each side; gaps touching either end of the video duplicate the
//! nearest kept frame. Every synthesized frame records its derivation.

use crate::error::{PipelineError, PipelineResult};
use crate::resolver::{Decision, Resolution};
use poseq_models::{Derivation, Frame, FrameStatus, Keypoint, Mesh, Point3};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Two meshes brought to a common vertex count.
#[derive(Debug, Clone)]
pub struct AlignedMeshes {
    pub before: Vec<Point3>,
    pub after: Vec<Point3>,
    pub faces: Vec<[u32; 3]>,
}

impl AlignedMeshes {
    /// Align two meshes. The mesh with more vertices is the reference; the
    /// other is padded by repeating its trailing vertex.
    pub fn align(before: &Mesh, after: &Mesh) -> Self {
        let n = before.vertex_count().max(after.vertex_count());
        let faces = if after.vertex_count() > before.vertex_count() {
            after.faces.clone()
        } else {
            before.faces.clone()
        };
        Self {
            before: pad_vertices(&before.vertices, &after.vertices, n),
            after: pad_vertices(&after.vertices, &before.vertices, n),
            faces,
        }
    }

    /// Vertices blended at `factor`.
    pub fn blend(&self, factor: f64) -> Mesh {
        let vertices = self
            .before
            .iter()
            .zip(&self.after)
            .map(|(a, b)| a.lerp(*b, factor))
            .collect();
        Mesh::new(vertices, self.faces.clone())
    }
}

fn pad_vertices(vertices: &[Point3], other: &[Point3], n: usize) -> Vec<Point3> {
    let mut out = if vertices.is_empty() {
        other.to_vec()
    } else {
        vertices.to_vec()
    };
    if let Some(&last) = out.last() {
        out.resize(n, last);
    }
    out
}

/// Per-run memo of synthesized frames and aligned mesh pairs.
///
/// Owned by one reconstructor; never shared across runs.
#[derive(Debug, Default)]
pub struct ReconstructionCache {
    frames: HashMap<usize, Frame>,
    mesh_pairs: HashMap<(usize, usize), Arc<AlignedMeshes>>,
}

impl ReconstructionCache {
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(&index)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn mesh_pair_count(&self) -> usize {
        self.mesh_pairs.len()
    }
}

/// Builds the dense sequence from kept detections.
pub struct SequenceReconstructor<'a> {
    frames: &'a [Option<Frame>],
    resolution: &'a Resolution,
    fps: f64,
    prev_keep: Vec<Option<usize>>,
    next_keep: Vec<Option<usize>>,
    cache: ReconstructionCache,
}

impl<'a> SequenceReconstructor<'a> {
    /// Prepare reconstruction. Fails when no frame was kept.
    pub fn new(
        frames: &'a [Option<Frame>],
        resolution: &'a Resolution,
        fps: f64,
    ) -> PipelineResult<Self> {
        let n = frames.len();
        let keep = |i: usize| resolution.is_keep(i) && frames[i].is_some();

        let mut prev_keep = Vec::with_capacity(n);
        let mut last = None;
        for i in 0..n {
            if keep(i) {
                last = Some(i);
            }
            prev_keep.push(last);
        }

        let mut next_keep = vec![None; n];
        let mut next = None;
        for i in (0..n).rev() {
            if keep(i) {
                next = Some(i);
            }
            next_keep[i] = next;
        }

        if n > 0 && prev_keep[n - 1].is_none() {
            return Err(PipelineError::NoReliableFrames(n));
        }

        Ok(Self {
            frames,
            resolution,
            fps,
            prev_keep,
            next_keep,
            cache: ReconstructionCache::default(),
        })
    }

    /// Frame for `index`, synthesizing and caching it on first request.
    pub fn get_or_reconstruct(&mut self, index: usize) -> PipelineResult<&Frame> {
        let n = self.frames.len();
        if index >= n {
            return Err(PipelineError::FrameOutOfRange {
                index,
                frame_count: n,
            });
        }

        let frames: &'a [Option<Frame>] = self.frames;
        if self.resolution.is_keep(index) {
            if let Some(frame) = &frames[index] {
                return Ok(frame);
            }
        }

        if !self.cache.frames.contains_key(&index) {
            let frame = self.synthesize(index)?;
            self.cache.frames.insert(index, frame);
        }
        self.cache
            .frames
            .get(&index)
            .ok_or_else(|| PipelineError::internal(format!("frame {index} missing from cache")))
    }

    /// Produce the dense sequence, consuming the reconstructor.
    pub fn reconstruct_all(mut self) -> PipelineResult<Vec<Frame>> {
        let n = self.frames.len();
        let mut out = Vec::with_capacity(n);
        for index in 0..n {
            out.push(self.get_or_reconstruct(index)?.clone());
        }
        debug!(
            synthesized = self.cache.frame_count(),
            mesh_pairs = self.cache.mesh_pair_count(),
            "Reconstruction complete"
        );
        Ok(out)
    }

    pub fn cache(&self) -> &ReconstructionCache {
        &self.cache
    }

    fn synthesize(&mut self, index: usize) -> PipelineResult<Frame> {
        let status = match self.resolution.decision(index) {
            Some(Decision::Remove) => FrameStatus::Rejected,
            _ => FrameStatus::Reconstructed,
        };

        match (self.prev_keep[index], self.next_keep[index]) {
            (Some(before), Some(after)) if before != after => {
                self.interpolate(index, before, after, status)
            }
            (Some(source), _) | (None, Some(source)) => self.duplicate(index, source, status),
            (None, None) => Err(PipelineError::NoReliableFrames(self.frames.len())),
        }
    }

    fn kept(&self, index: usize) -> PipelineResult<&'a Frame> {
        let frames: &'a [Option<Frame>] = self.frames;
        frames[index]
            .as_ref()
            .ok_or_else(|| PipelineError::internal(format!("kept frame {index} has no detection")))
    }

    fn duplicate(&self, index: usize, source: usize, status: FrameStatus) -> PipelineResult<Frame> {
        let src = self.kept(source)?;
        debug!(frame_index = index, source, "Duplicating nearest kept frame");

        let mut frame = Frame::synthesized(
            index,
            self.fps,
            status,
            src.keypoints.clone(),
            Derivation::Duplicated { source },
        );
        frame.mesh = src.mesh.clone();
        frame.camera = src.camera;
        Ok(frame)
    }

    fn interpolate(
        &mut self,
        index: usize,
        before: usize,
        after: usize,
        status: FrameStatus,
    ) -> PipelineResult<Frame> {
        let a = self.kept(before)?;
        let b = self.kept(after)?;
        let factor = ((index - before) as f64 / (after - before) as f64).clamp(0.0, 1.0);

        let keypoints = a
            .keypoints
            .iter()
            .zip(&b.keypoints)
            .map(|(ka, kb)| {
                Keypoint::new(
                    ka.position.lerp(kb.position, factor),
                    ka.confidence.min(kb.confidence),
                )
            })
            .collect();

        let mut frame = Frame::synthesized(
            index,
            self.fps,
            status,
            keypoints,
            Derivation::Interpolated {
                before,
                after,
                factor,
            },
        );

        frame.camera = match (a.camera, b.camera) {
            (Some(ca), Some(cb)) => Some(ca.lerp(cb, factor)),
            (ca, cb) => ca.or(cb),
        };

        frame.mesh = match (&a.mesh, &b.mesh) {
            (Some(ma), Some(mb)) => Some(self.aligned_pair(before, after, ma, mb).blend(factor)),
            (ma, mb) => ma.as_ref().or(mb.as_ref()).cloned(),
        };

        Ok(frame)
    }

    fn aligned_pair(
        &mut self,
        before: usize,
        after: usize,
        ma: &Mesh,
        mb: &Mesh,
    ) -> Arc<AlignedMeshes> {
        self.cache
            .mesh_pairs
            .entry((before, after))
            .or_insert_with(|| {
                if ma.vertex_count() != mb.vertex_count() {
                    warn!(
                        before,
                        after,
                        before_vertices = ma.vertex_count(),
                        after_vertices = mb.vertex_count(),
                        "Mesh vertex counts differ; padding the smaller mesh"
                    );
                }
                Arc::new(AlignedMeshes::align(ma, mb))
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{DecisionReason, FrameDecision};

    fn frame(index: usize, x: f64, conf: f64) -> Frame {
        Frame::source(index, 30.0, vec![Keypoint::new(Point3::new(x, 2.0 * x, 0.0), conf)])
    }

    fn resolution(decisions: &[Decision]) -> Resolution {
        Resolution {
            decisions: decisions
                .iter()
                .enumerate()
                .map(|(index, &decision)| FrameDecision {
                    index,
                    decision,
                    reason: DecisionReason::Reliable,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_interior_gap_interpolates() {
        let frames = vec![Some(frame(0, 0.0, 0.9)), None, None, Some(frame(3, 30.0, 0.7))];
        let res = resolution(&[
            Decision::Keep,
            Decision::Reconstruct,
            Decision::Reconstruct,
            Decision::Keep,
        ]);
        let out = SequenceReconstructor::new(&frames, &res, 30.0)
            .unwrap()
            .reconstruct_all()
            .unwrap();

        assert_eq!(out.len(), 4);
        let f1 = &out[1];
        assert_eq!(f1.status, FrameStatus::Reconstructed);
        assert!((f1.keypoints[0].position.x - 10.0).abs() < 1e-9);
        assert!((f1.keypoints[0].position.y - 20.0).abs() < 1e-9);
        assert_eq!(f1.keypoints[0].confidence, 0.7);
        assert!(matches!(
            f1.derivation,
            Some(Derivation::Interpolated { before: 0, after: 3, .. })
        ));
    }

    #[test]
    fn test_edges_duplicate_and_removed_are_rejected() {
        let frames = vec![None, Some(frame(1, 5.0, 0.9)), Some(frame(2, 0.0, 0.1))];
        let res = resolution(&[Decision::Reconstruct, Decision::Keep, Decision::Remove]);
        let out = SequenceReconstructor::new(&frames, &res, 30.0)
            .unwrap()
            .reconstruct_all()
            .unwrap();

        assert_eq!(out[0].derivation, Some(Derivation::Duplicated { source: 1 }));
        assert_eq!(out[2].derivation, Some(Derivation::Duplicated { source: 1 }));
        assert_eq!(out[2].status, FrameStatus::Rejected);
        assert_eq!(out[2].keypoints[0].position.x, 5.0);
        assert_eq!(out[1].status, FrameStatus::Source);
    }

    #[test]
    fn test_no_kept_frame_is_fatal() {
        let frames = vec![Some(frame(0, 0.0, 0.1)), None];
        let res = resolution(&[Decision::Remove, Decision::Reconstruct]);
        assert!(matches!(
            SequenceReconstructor::new(&frames, &res, 30.0),
            Err(PipelineError::NoReliableFrames(2))
        ));
    }

    #[test]
    fn test_cache_returns_same_frame() {
        let frames = vec![Some(frame(0, 0.0, 0.9)), None, Some(frame(2, 4.0, 0.9))];
        let res = resolution(&[Decision::Keep, Decision::Reconstruct, Decision::Keep]);
        let mut recon = SequenceReconstructor::new(&frames, &res, 30.0).unwrap();
        let first = recon.get_or_reconstruct(1).unwrap().clone();
        let second = recon.get_or_reconstruct(1).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(recon.cache().frame_count(), 1);
        assert!(recon.get_or_reconstruct(3).is_err());
    }

    #[test]
    fn test_mesh_and_camera_interpolate() {
        let tri = vec![[0, 1, 2]];
        let small = Mesh::new(
            vec![Point3::ZERO, Point3::new(1.0, 0.0, 0.0)],
            vec![],
        );
        let large = Mesh::new(
            vec![
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(4.0, 0.0, 0.0),
            ],
            tri.clone(),
        );
        let frames = vec![
            Some(frame(0, 0.0, 0.9).with_mesh(small).with_camera(Point3::ZERO)),
            None,
            Some(frame(2, 0.0, 0.9).with_mesh(large).with_camera(Point3::new(0.0, 0.0, 10.0))),
        ];
        let res = resolution(&[Decision::Keep, Decision::Reconstruct, Decision::Keep]);
        let mut recon = SequenceReconstructor::new(&frames, &res, 30.0).unwrap();
        let mid = recon.get_or_reconstruct(1).unwrap().clone();

        let mesh = mid.mesh.unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces, tri);
        // Padded vertex repeats (1,0,0) and blends halfway to (4,0,0).
        assert!((mesh.vertices[2].x - 2.5).abs() < 1e-12);
        assert_eq!(mid.camera, Some(Point3::new(0.0, 0.0, 5.0)));
        assert_eq!(recon.cache().mesh_pair_count(), 1);
    }
}
