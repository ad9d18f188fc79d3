//! Overlay sizing and placement in final output pixels.
//!
//! Position per axis:
//!
//! ```text
//! pos = margin + (available - overlay) * anchor_fraction + offset
//! available = canvas - 2 * margin
//! ```
//!
//! followed by a clamp to `[0, canvas - overlay]`, so the overlay is never
//! partially off-canvas.

use serde::{Deserialize, Serialize};

use super::OverlayError;
use crate::geometry::{ImageSize, PixelRect};

/// The nine canonical placement points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    #[default]
    BottomRight,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::TopLeft,
        Anchor::Top,
        Anchor::TopRight,
        Anchor::Left,
        Anchor::Center,
        Anchor::Right,
        Anchor::BottomLeft,
        Anchor::Bottom,
        Anchor::BottomRight,
    ];

    /// `(x, y)` position of the anchor within the available area, 0..=1.
    pub fn fractions(self) -> (f64, f64) {
        match self {
            Anchor::TopLeft => (0.0, 0.0),
            Anchor::Top => (0.5, 0.0),
            Anchor::TopRight => (1.0, 0.0),
            Anchor::Left => (0.0, 0.5),
            Anchor::Center => (0.5, 0.5),
            Anchor::Right => (1.0, 0.5),
            Anchor::BottomLeft => (0.0, 1.0),
            Anchor::Bottom => (0.5, 1.0),
            Anchor::BottomRight => (1.0, 1.0),
        }
    }
}

/// How large the overlay is drawn. The content's aspect ratio is always kept.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OverlaySizing {
    /// Natural size of the content.
    #[default]
    Original,
    /// Width is a fraction of the canvas width.
    RelativeToWidth { fraction: f64 },
    /// Height is a fraction of the canvas height.
    RelativeToHeight { fraction: f64 },
    /// Width in pixels.
    FixedWidth { width: u32 },
}

/// Where and how strongly an overlay is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayPlacement {
    pub anchor: Anchor,
    pub margin: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    /// 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f64,
    pub sizing: OverlaySizing,
}

impl Default for OverlayPlacement {
    fn default() -> Self {
        Self {
            anchor: Anchor::BottomRight,
            margin: 16,
            offset_x: 0,
            offset_y: 0,
            opacity: 1.0,
            sizing: OverlaySizing::Original,
        }
    }
}

/// Requested overlay size before fitting.
pub fn requested_size(
    content: ImageSize,
    sizing: &OverlaySizing,
    canvas: ImageSize,
) -> Result<ImageSize, OverlayError> {
    if content.is_empty() {
        return Err(OverlayError::EmptyContent);
    }
    let aspect = content.height as f64 / content.width as f64;
    let from_width = |w: f64| ImageSize::new(round_dim(w), round_dim(w * aspect));

    let size = match *sizing {
        OverlaySizing::Original => content,
        OverlaySizing::RelativeToWidth { fraction } => {
            check_fraction(fraction)?;
            from_width(canvas.width as f64 * fraction)
        }
        OverlaySizing::RelativeToHeight { fraction } => {
            check_fraction(fraction)?;
            let h = canvas.height as f64 * fraction;
            ImageSize::new(round_dim(h / aspect), round_dim(h))
        }
        OverlaySizing::FixedWidth { width } => {
            if width == 0 {
                return Err(OverlayError::InvalidSizing("fixed width 0".into()));
            }
            from_width(width as f64)
        }
    };
    Ok(size)
}

/// Shrink `size` uniformly so it fits inside `bounds`. Never enlarges.
pub fn fit_within(size: ImageSize, bounds: ImageSize) -> ImageSize {
    if size.width <= bounds.width && size.height <= bounds.height {
        return size;
    }
    let scale_x = bounds.width as f64 / size.width as f64;
    let scale = scale_x.min(bounds.height as f64 / size.height as f64);
    ImageSize::new(
        round_dim(size.width as f64 * scale).min(bounds.width.max(1)),
        round_dim(size.height as f64 * scale).min(bounds.height.max(1)),
    )
}

/// Final overlay size for `content` drawn on `canvas`.
///
/// An overlay larger than the area inside the margins is scaled down to fit
/// it; if the margins leave no room, to fit the canvas itself.
pub fn overlay_size(
    content: ImageSize,
    placement: &OverlayPlacement,
    canvas: ImageSize,
) -> Result<ImageSize, OverlayError> {
    let requested = requested_size(content, &placement.sizing, canvas)?;
    let both_sides = placement.margin.saturating_mul(2);
    let inner = ImageSize::new(
        canvas.width.saturating_sub(both_sides),
        canvas.height.saturating_sub(both_sides),
    );
    let bounds = if inner.is_empty() { canvas } else { inner };
    Ok(fit_within(requested, bounds))
}

/// Rectangle the overlay occupies on `canvas`, fully inside it.
pub fn place(size: ImageSize, placement: &OverlayPlacement, canvas: ImageSize) -> PixelRect {
    let (fx, fy) = placement.anchor.fractions();
    let x = axis_position(canvas.width, size.width, placement.margin, fx, placement.offset_x);
    let y = axis_position(canvas.height, size.height, placement.margin, fy, placement.offset_y);
    PixelRect::new(
        x,
        y,
        size.width.min(canvas.width),
        size.height.min(canvas.height),
    )
}

fn axis_position(canvas: u32, size: u32, margin: u32, fraction: f64, offset: i32) -> u32 {
    let available = canvas as f64 - 2.0 * margin as f64;
    let pos = margin as f64 + (available - size as f64) * fraction + offset as f64;
    let max = canvas.saturating_sub(size) as f64;
    pos.round().clamp(0.0, max) as u32
}

fn check_fraction(fraction: f64) -> Result<(), OverlayError> {
    if fraction.is_finite() && fraction > 0.0 {
        Ok(())
    } else {
        Err(OverlayError::InvalidSizing(format!("fraction {fraction}")))
    }
}

fn round_dim(v: f64) -> u32 {
    (v.round() as u32).max(1)
}
