//! Single-item processing in a fixed stage order.
//!
//! # Stage Order
//!
//! 1. Region effects (rectangles authored against the untransformed source)
//! 2. Geometric transform
//! 3. Crop (insets refer to the transformed image)
//! 4. Resize (of the cropped canvas)
//! 5. Overlay (positioned in final output pixels)
//! 6. Encode
//!
//! Any stage failure ends processing of that item with a typed error.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::bitmap::Bitmap;
use crate::decode::DecodeError;
use crate::effects::{apply_effects, RegionEffect};
use crate::encode::{encode_bitmap, EncodeError, EncodeSettings};
use crate::overlay::{apply_overlay, OverlayError, OverlaySpec, TextContext};
use crate::resize::{resize, ResizeError, ResizeSpec};
use crate::transform::{apply_crop, apply_transform, CropError, CropSpec, GeometricTransform};

/// Errors for one item, or for a batch before any item runs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source could not be read or decoded.
    #[error("Failed to decode source: {0}")]
    DecodeFailure(#[from] DecodeError),

    /// The crop leaves no pixels, or fails the configured minimum.
    #[error("Invalid crop region: {0}")]
    InvalidCropRegion(#[from] CropError),

    #[error("Resize failed: {0}")]
    Resize(#[from] ResizeError),

    #[error("Overlay failed: {0}")]
    Overlay(#[from] OverlayError),

    #[error("Failed to encode output: {0}")]
    EncodeFailure(#[from] EncodeError),

    /// Filesystem error while writing an output.
    #[error("Failed to write {}: {message}", path.display())]
    WriteFailure { path: PathBuf, message: String },

    /// An output path equals an input path while overwriting sources is
    /// not allowed.
    #[error("Output {} would overwrite source item {index}", path.display())]
    WouldOverwriteSource { path: PathBuf, index: usize },

    /// Two items resolve to the same output path.
    #[error("Items {first} and {second} both resolve to {}", path.display())]
    NamingCollision {
        path: PathBuf,
        first: usize,
        second: usize,
    },

    /// An output already exists on disk and the conflict policy is abort.
    #[error("Output already exists: {}", path.display())]
    OutputExists { path: PathBuf },

    /// The batch worker pool could not be started.
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),

    /// Processing stopped by a cancellation request.
    #[error("Cancelled")]
    Cancelled,
}

impl PipelineError {
    /// True for errors raised by the pre-flight pass, before any write.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            PipelineError::WouldOverwriteSource { .. }
                | PipelineError::NamingCollision { .. }
                | PipelineError::OutputExists { .. }
        )
    }
}

/// Cooperative cancellation flag, cheap to clone and share across threads.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Geometric, resize and overlay settings shared by every item of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingSettings {
    pub crop: Option<CropSpec>,
    pub transform: GeometricTransform,
    pub resize: ResizeSpec,
    pub overlay: Option<OverlaySpec>,
    /// When set, crops must leave at least this many pixels per side.
    pub min_crop_dimension: Option<u32>,
}

/// Run stages 1-5 on `source`: region effects, geometric transform, crop,
/// resize and overlay, in that order.
///
/// # Arguments
///
/// * `source` - Decoded, upright source bitmap; it is not modified
/// * `settings` - Crop, transform, resize and overlay settings
/// * `effects` - Region effects in paint order, in source coordinates
/// * `ctx` - Values for text overlay templates
///
/// # Returns
///
/// The processed bitmap, ready for encoding.
///
/// # Errors
///
/// Returns the first failing stage's error: [`PipelineError::InvalidCropRegion`],
/// [`PipelineError::Resize`] or [`PipelineError::Overlay`].
pub fn process_one(
    source: &Bitmap,
    settings: &ProcessingSettings,
    effects: &[RegionEffect],
    ctx: &TextContext,
) -> Result<Bitmap, PipelineError> {
    process_one_cancellable(source, settings, effects, ctx, &CancellationToken::new())
}

/// Run stages 1-5, checking `cancel` before each stage.
///
/// Same as [`process_one`], except that a cancelled token stops the run
/// between stages with [`PipelineError::Cancelled`].
#[tracing::instrument(
    skip(source, settings, effects, ctx, cancel),
    fields(width = source.width, height = source.height, effects = effects.len())
)]
pub fn process_one_cancellable(
    source: &Bitmap,
    settings: &ProcessingSettings,
    effects: &[RegionEffect],
    ctx: &TextContext,
    cancel: &CancellationToken,
) -> Result<Bitmap, PipelineError> {
    cancel.check()?;
    let mut image = source.clone();
    apply_effects(&mut image, effects);
    tracing::debug!(count = effects.len(), "region effects applied");

    cancel.check()?;
    if !settings.transform.is_identity() {
        image = apply_transform(&image, &settings.transform);
        tracing::debug!(
            rotation = settings.transform.rotation.degrees(),
            flip_h = settings.transform.flip_horizontal,
            flip_v = settings.transform.flip_vertical,
            "transform applied"
        );
    }

    cancel.check()?;
    if let Some(crop) = settings.crop.filter(|c| !c.is_noop()) {
        if let Some(min) = settings.min_crop_dimension {
            crop.validate(image.size(), min)?;
        }
        image = apply_crop(&image, &crop)?;
        tracing::debug!(width = image.width, height = image.height, "crop applied");
    }

    cancel.check()?;
    if let Some(resized) = resize(&image, &settings.resize)? {
        image = resized;
        tracing::debug!(width = image.width, height = image.height, "resize applied");
    }

    cancel.check()?;
    if let Some(overlay) = &settings.overlay {
        apply_overlay(&mut image, overlay, ctx)?;
    }

    Ok(image)
}

/// Run all six stages and return the encoded bytes.
pub fn process_to_bytes(
    source: &Bitmap,
    settings: &ProcessingSettings,
    effects: &[RegionEffect],
    ctx: &TextContext,
    encode: &EncodeSettings,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, PipelineError> {
    let image = process_one_cancellable(source, settings, effects, ctx, cancel)?;
    cancel.check()?;
    Ok(encode_bitmap(&image, encode)?)
}
