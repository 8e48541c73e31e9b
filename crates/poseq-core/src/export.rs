//! Sequence export to JSON.

use crate::camera::{camera_to_viewer, to_viewer};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::PipelineOutput;
use chrono::Utc;
use poseq_models::{
    CoordinateConvention, Frame, FrameExport, Keypoint, NormalizedPose, Point3, SequenceExport,
    EXPORT_VERSION,
};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Exporter for pipeline output.
pub struct SequenceExporter;

impl SequenceExporter {
    /// Build the export document in the requested coordinate convention.
    pub fn build(output: &PipelineOutput, convention: CoordinateConvention) -> SequenceExport {
        let sequence = &output.sequence;
        let point = |p: Point3| match convention {
            CoordinateConvention::Detector => p,
            CoordinateConvention::ViewerYUp => to_viewer(p),
        };
        let camera = |c: Point3| match convention {
            CoordinateConvention::Detector => c,
            CoordinateConvention::ViewerYUp => camera_to_viewer(c),
        };

        let mesh_faces = sequence
            .frames()
            .iter()
            .find_map(|f| f.mesh.as_ref())
            .map(|m| m.faces.clone())
            .unwrap_or_default();

        let frames = sequence
            .frames()
            .iter()
            .map(|f| export_frame(f, &mesh_faces, &point, &camera))
            .collect();

        SequenceExport {
            version: EXPORT_VERSION.to_string(),
            run_id: output.run_id.clone(),
            generated_at: Utc::now(),
            convention,
            fps: sequence.fps(),
            frame_count: sequence.len(),
            keypoint_names: sequence.topology().names().to_vec(),
            mesh_faces,
            frames,
            index_map: output.index_map.to_export(),
            diagnostics: output.report.clone(),
        }
    }

    /// Export to pretty JSON.
    pub fn to_json(export: &SequenceExport) -> serde_json::Result<String> {
        serde_json::to_string_pretty(export)
    }

    /// Export to compact JSON (no whitespace).
    pub fn to_json_compact(export: &SequenceExport) -> serde_json::Result<String> {
        serde_json::to_string(export)
    }

    /// Write an export to a file.
    pub fn write_to_file<P: AsRef<Path>>(export: &SequenceExport, path: P) -> PipelineResult<()> {
        let json = Self::to_json(export)?;
        let mut file = std::fs::File::create(path.as_ref())?;
        file.write_all(json.as_bytes())?;

        info!(
            frames = export.frame_count,
            "Wrote pose sequence to {}",
            path.as_ref().display()
        );
        Ok(())
    }

    /// Read a previously written export.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> PipelineResult<SequenceExport> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn export_frame(
    frame: &Frame,
    shared_faces: &[[u32; 3]],
    point: &impl Fn(Point3) -> Point3,
    camera: &impl Fn(Point3) -> Point3,
) -> FrameExport {
    FrameExport {
        index: frame.index,
        timestamp: frame.timestamp,
        status: frame.status,
        keypoints: frame
            .keypoints
            .iter()
            .map(|k| Keypoint::new(point(k.position), k.confidence))
            .collect(),
        mesh_vertices: frame
            .mesh
            .as_ref()
            .map(|m| m.vertices.iter().map(|&v| point(v)).collect()),
        mesh_faces: frame
            .mesh
            .as_ref()
            .filter(|m| m.faces.as_slice() != shared_faces)
            .map(|m| m.faces.clone()),
        camera: frame.camera.map(camera),
        derivation: frame.derivation,
        normalized: frame.normalized.as_ref().map(|n| NormalizedPose {
            reference: n.reference,
            reference_length: n.reference_length,
            positions: n.positions.iter().map(|&p| point(p)).collect(),
        }),
    }
}
