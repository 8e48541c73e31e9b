//! Single anatomical landmark with a detector confidence.

use crate::geometry::Point3;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A keypoint position plus confidence in `[0, 1]`.
///
/// The position carries no meaning when `confidence` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Keypoint {
    pub position: Point3,
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(position: Point3, confidence: f64) -> Self {
        Self {
            position,
            confidence,
        }
    }

    /// Keypoint with zero confidence at the origin.
    pub fn missing() -> Self {
        Self::default()
    }

    /// Confidence meets the threshold.
    #[inline]
    pub fn is_valid(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }

    /// Position is meaningful (confidence above zero).
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.confidence > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_is_valid() {
        let kp = Keypoint::new(Point3::new(0.5, 0.5, 0.0), 0.7);
        assert!(kp.is_valid(0.6));
        assert!(!kp.is_valid(0.8));
        assert!(kp.is_visible());
    }

    #[test]
    fn test_missing_is_invisible() {
        assert!(!Keypoint::missing().is_visible());
    }
}
