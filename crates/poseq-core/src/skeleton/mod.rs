//! Skeleton-level corrections: limb baselines, limb-length constraints and
//! scale normalization.

pub mod baseline;
pub mod limbs;
pub mod normalize;

pub use baseline::LimbBaselines;
pub use limbs::LimbConstraint;
pub use normalize::ScaleNormalizer;
