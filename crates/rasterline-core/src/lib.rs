//! Rasterline Core - deterministic raster pipeline
//!
//! This crate provides the image pipeline for Rasterline: region effects,
//! quarter-turn transforms, edge-inset crops, resizing and overlays applied
//! in a fixed order, plus a batch executor with conflict-safe output naming.
//!
//! All rectangles are authored as [`NormalizedRect`]s against the
//! untransformed source and mapped into pixels only when a stage needs them.

pub mod batch;
pub mod bitmap;
pub mod crop_space;
pub mod decode;
pub mod effects;
pub mod encode;
pub mod geometry;
pub mod overlay;
pub mod pipeline;
pub mod resize;
pub mod settings;
pub mod template;
pub mod transform;

pub use batch::{
    process_batch, BatchItem, BatchJob, BatchOptions, BatchOutcome, BatchProgress, BatchReport,
};
pub use bitmap::{Bitmap, Rgba};
pub use effects::{apply_effects, EffectKind, EffectStore, RegionEffect};
pub use geometry::{ImageSize, NormalizedRect, PixelRect};
pub use pipeline::{process_one, CancellationToken, PipelineError, ProcessingSettings};
pub use resize::{ResizeMode, ResizeSpec};
pub use settings::{ConfigError, ExportConfig};
pub use transform::{apply_crop, apply_transform, CropSpec, GeometricTransform, Rotation};
