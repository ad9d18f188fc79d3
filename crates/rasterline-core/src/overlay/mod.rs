//! Overlay compositing: a secondary image or rendered text placed at one of
//! nine anchor points of the final output.
//!
//! ## Algorithm
//!
//! 1. Text content has its template expanded, then is rasterized.
//! 2. The overlay size is derived from [`OverlaySizing`] against the final
//!    bitmap and shrunk if it would not fit.
//! 3. The position is computed from anchor, margin and offset and clamped
//!    inside the bitmap.
//! 4. The overlay is composited source-over with uniform opacity.

mod composite;
mod font;
mod layout;
mod text;

pub use composite::{blend_over, composite, opacity_to_u8};
pub use font::{BitmapFont, GlyphMask, GlyphRasterizer, MAX_SIZE_PX};
pub use layout::{
    fit_within, overlay_size, place, requested_size, Anchor, OverlayPlacement, OverlaySizing,
};
pub use text::{
    render_text, substitute_template, Outline, Shadow, TextContext, TextOverlay, TextStyle,
    MAX_OUTLINE_WIDTH, MAX_SHADOW_OFFSET,
};

use thiserror::Error;

use crate::bitmap::Bitmap;
use crate::geometry::PixelRect;
use crate::resize::{resize_exact, FilterType};

/// Errors produced while placing or drawing an overlay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    /// The overlay image has no pixels.
    #[error("Overlay content is empty")]
    EmptyContent,

    /// The sizing mode has a zero or non-finite parameter.
    #[error("Invalid overlay sizing: {0}")]
    InvalidSizing(String),

    /// Scaling the overlay content failed.
    #[error("Failed to scale overlay: {0}")]
    Scale(String),
}

/// What is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayContent {
    Image(Bitmap),
    Text(TextOverlay),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpec {
    pub content: OverlayContent,
    pub placement: OverlayPlacement,
}

impl OverlaySpec {
    pub fn image(image: Bitmap, placement: OverlayPlacement) -> Self {
        Self {
            content: OverlayContent::Image(image),
            placement,
        }
    }

    pub fn text(text: TextOverlay, placement: OverlayPlacement) -> Self {
        Self {
            content: OverlayContent::Text(text),
            placement,
        }
    }
}

/// Draw `spec` onto `image` using the built-in font for text.
///
/// # Arguments
///
/// * `image` - Final output bitmap, modified in place
/// * `spec` - Overlay content and placement
/// * `ctx` - Values for text templates
///
/// # Returns
///
/// The rectangle that was drawn into, or `None` if nothing was drawn
/// (empty text, zero opacity).
///
/// # Errors
///
/// Returns [`OverlayError`] for empty image content, invalid sizing or a
/// failed rescale.
pub fn apply_overlay(
    image: &mut Bitmap,
    spec: &OverlaySpec,
    ctx: &TextContext,
) -> Result<Option<PixelRect>, OverlayError> {
    apply_overlay_with(image, spec, ctx, &BitmapFont)
}

/// Draw `spec` onto `image` with a caller-supplied glyph rasterizer.
pub fn apply_overlay_with(
    image: &mut Bitmap,
    spec: &OverlaySpec,
    ctx: &TextContext,
    rasterizer: &dyn GlyphRasterizer,
) -> Result<Option<PixelRect>, OverlayError> {
    let placement = &spec.placement;
    if image.is_empty() || opacity_to_u8(placement.opacity) == 0 {
        return Ok(None);
    }

    let rendered;
    let content = match &spec.content {
        OverlayContent::Image(bitmap) => bitmap,
        OverlayContent::Text(text) => {
            let expanded = substitute_template(&text.template, ctx);
            match render_text(&expanded, &text.style, rasterizer) {
                Some(bitmap) => {
                    rendered = bitmap;
                    &rendered
                }
                None => return Ok(None),
            }
        }
    };

    let canvas = image.size();
    let size = overlay_size(content.size(), placement, canvas)?;
    let scaled;
    let content = if size == content.size() {
        content
    } else {
        scaled = resize_exact(content, size, FilterType::Bicubic)
            .map_err(|e| OverlayError::Scale(e.to_string()))?;
        &scaled
    };

    let rect = place(size, placement, canvas);
    tracing::debug!(?rect, opacity = placement.opacity, "compositing overlay");
    composite(image, content, rect.x, rect.y, placement.opacity);
    Ok(Some(rect))
}
