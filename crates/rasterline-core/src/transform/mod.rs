//! Geometric operations: quarter-turn rotation, flips and cropping.
//!
//! # Transform Order
//!
//! Within the pipeline these run after region effects and before resize:
//! 1. Region effects (authored against the untransformed source)
//! 2. Geometric transform (rotation, then flips)
//! 3. Crop
//!
//! # Coordinate System
//!
//! - Rotation is clockwise in multiples of 90 degrees
//! - Crop insets refer to the visual edges of the transformed image
//! - Bitmaps use a top-left origin; see [`crate::crop_space`] for the
//!   bottom-left translation

mod crop;
mod geometric;

pub use crop::{apply_crop, CropError, CropSpec, MIN_CROP_DIMENSION};
pub use geometric::{apply_transform, GeometricTransform, Rotation};
