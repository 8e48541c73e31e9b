//! Camera conversions.
//!
//! The mesh estimator predicts a weak-perspective camera `[s, tx, ty]`
//! relative to the square crop it ran on. Playback needs a perspective
//! translation in full-image space, and the viewer expects Y-up coordinates.

use poseq_models::Point3;

/// Focal length, in pixels, assumed by the mesh estimator.
pub const DEFAULT_FOCAL_LENGTH: f64 = 5000.0;

/// Crop-space weak-perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropCamera {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl CropCamera {
    pub fn new(scale: f64, tx: f64, ty: f64) -> Self {
        Self { scale, tx, ty }
    }

    /// Full-image camera translation `[tx, ty, tz]`.
    ///
    /// `box_center` and `box_size` describe the crop in image pixels,
    /// `image_size` is `(width, height)`.
    pub fn to_full(
        &self,
        box_center: [f64; 2],
        box_size: f64,
        image_size: (f64, f64),
        focal_length: f64,
    ) -> Point3 {
        let (w, h) = image_size;
        let bs = box_size * self.scale + 1e-9;
        let tz = 2.0 * focal_length / bs;
        let tx = 2.0 * (box_center[0] - w / 2.0) / bs + self.tx;
        let ty = 2.0 * (box_center[1] - h / 2.0) / bs + self.ty;
        Point3::new(tx, ty, tz)
    }
}

/// Rotate a detector-space point 180° about X (Y-up viewer space).
#[inline]
pub fn to_viewer(p: Point3) -> Point3 {
    Point3::new(p.x, -p.y, -p.z)
}

/// Camera translation in viewer space (X mirrored).
#[inline]
pub fn camera_to_viewer(c: Point3) -> Point3 {
    Point3::new(-c.x, c.y, c.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_crop() {
        let cam = CropCamera::new(1.0, 0.1, -0.2);
        let full = cam.to_full([960.0, 540.0], 500.0, (1920.0, 1080.0), DEFAULT_FOCAL_LENGTH);
        assert!((full.x - 0.1).abs() < 1e-9);
        assert!((full.y + 0.2).abs() < 1e-9);
        assert!((full.z - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_offset_crop() {
        let cam = CropCamera::new(0.5, 0.0, 0.0);
        let full = cam.to_full([1460.0, 540.0], 400.0, (1920.0, 1080.0), DEFAULT_FOCAL_LENGTH);
        // bs = 200: tx = 2 * 500 / 200
        assert!((full.x - 5.0).abs() < 1e-6);
        assert!((full.z - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_viewer_transform() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(to_viewer(p), Point3::new(1.0, -2.0, -3.0));
        assert_eq!(to_viewer(to_viewer(p)), p);
        assert_eq!(camera_to_viewer(p), Point3::new(-1.0, 2.0, 3.0));
    }
}
