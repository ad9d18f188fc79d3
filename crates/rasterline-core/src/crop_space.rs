//! The single vertical-axis convention used by every component.
//!
//! `top` and `bottom` in a [`CropSpec`] always mean the visually top and
//! visually bottom edges of the image as a person sees it displayed upright.
//! Pixel buffers, however, come in two flavours:
//!
//! - [`PixelOrigin::TopLeft`]: row 0 is the visual top (our [`Bitmap`](crate::Bitmap),
//!   the `image` crate, most UI toolkits).
//! - [`PixelOrigin::BottomLeft`]: row 0 is the visual bottom (OpenGL textures,
//!   CoreGraphics-style contexts).
//!
//! Functions in this module are the only place allowed to flip a y
//! coordinate between the two. Anything that receives top/bottom pixel
//! values (crop detection heuristics, crop-relative effect rectangles,
//! bottom-left readback) calls through here.

use serde::{Deserialize, Serialize};

use crate::geometry::{ImageSize, PixelRect};
use crate::transform::{CropError, CropSpec};

/// Where row 0 of a pixel buffer sits visually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelOrigin {
    /// Row 0 is the visual top edge.
    #[default]
    TopLeft,
    /// Row 0 is the visual bottom edge.
    BottomLeft,
}

/// Re-express `rect` from one origin convention in another.
///
/// Only `y` changes: `y' = image_height - (y + height)`.
pub fn reorigin_rect(
    rect: PixelRect,
    image_height: u32,
    from: PixelOrigin,
    to: PixelOrigin,
) -> PixelRect {
    if from == to {
        return rect;
    }
    PixelRect {
        y: image_height.saturating_sub(rect.y + rect.height),
        ..rect
    }
}

/// The rectangle a [`CropSpec`] keeps, in a buffer of `size` whose rows
/// follow `origin`.
///
/// For a bottom-left buffer the rectangle starts at `y = spec.bottom`; for a
/// top-left buffer at `y = spec.top`. Height is `height - top - bottom` in
/// both cases.
///
/// # Errors
///
/// Returns [`CropError::InvalidRegion`] if the insets leave no pixels.
pub fn crop_rect(
    spec: &CropSpec,
    size: ImageSize,
    origin: PixelOrigin,
) -> Result<PixelRect, CropError> {
    let width = size.width as i64 - spec.left as i64 - spec.right as i64;
    let height = size.height as i64 - spec.top as i64 - spec.bottom as i64;
    if width <= 0 || height <= 0 {
        return Err(CropError::InvalidRegion { width, height });
    }

    let y = match origin {
        PixelOrigin::TopLeft => spec.top,
        PixelOrigin::BottomLeft => spec.bottom,
    };
    Ok(PixelRect::new(spec.left, y, width as u32, height as u32))
}

/// Edge insets that keep exactly `rect` (given in `origin` convention) of an
/// image of `size`.
///
/// `rect` is clipped to the image first.
pub fn insets_for_rect(rect: PixelRect, size: ImageSize, origin: PixelOrigin) -> CropSpec {
    let rect = rect
        .intersection(&PixelRect::new(0, 0, size.width, size.height))
        .unwrap_or_default();
    let visual = reorigin_rect(rect, size.height, origin, PixelOrigin::TopLeft);
    CropSpec {
        top: visual.y,
        bottom: size.height.saturating_sub(visual.bottom()),
        left: visual.x,
        right: size.width.saturating_sub(visual.right()),
    }
}
