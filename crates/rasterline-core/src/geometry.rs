//! Resolution-independent rectangles and their pixel counterparts.
//!
//! # Coordinate System
//!
//! - [`NormalizedRect`] lives in the unit square: (0.0, 0.0) = top-left
//!   corner, (1.0, 1.0) = bottom-right corner, y increases downward.
//! - [`PixelRect`] is expressed in whole pixels with the top-left origin of
//!   [`Bitmap`](crate::Bitmap) unless a function says otherwise.
//!
//! Pixel conversion rounds each *edge* independently, so rectangles that
//! share an edge in normalized space also share it in pixel space and a
//! rectangle authored on a 1000 px image covers the same relative area on a
//! 2000 px image of the same content.

use serde::{Deserialize, Serialize};

use crate::crop_space::{self, PixelOrigin};
use crate::transform::{GeometricTransform, Rotation};

/// Tolerance used when comparing normalized coordinates.
pub const NORMALIZED_EPSILON: f64 = 1e-9;

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The same size with width and height exchanged.
    pub fn swapped(self) -> Self {
        Self::new(self.height, self.width)
    }
}

/// An axis-aligned rectangle in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Overlapping area of two rectangles, `None` if they are disjoint.
    pub fn intersection(&self, other: &PixelRect) -> Option<PixelRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn contains(&self, other: &PixelRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    #[inline]
    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Grow by `amount` on every side, clipped to `bounds`.
    pub fn expanded_within(&self, amount: u32, bounds: &PixelRect) -> PixelRect {
        let x0 = self.x.saturating_sub(amount).max(bounds.x);
        let y0 = self.y.saturating_sub(amount).max(bounds.y);
        let x1 = self.right().saturating_add(amount).min(bounds.right());
        let y1 = self.bottom().saturating_add(amount).min(bounds.bottom());
        PixelRect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

/// A rectangle expressed as fractions of an image's width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    /// The whole image.
    pub const FULL: NormalizedRect = NormalizedRect::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Express a top-left-origin pixel rectangle relative to `size`.
    ///
    /// An empty `size` yields an empty rectangle at the origin.
    pub fn from_pixels(rect: PixelRect, size: ImageSize) -> Self {
        if size.is_empty() {
            return Self::default();
        }
        let w = size.width as f64;
        let h = size.height as f64;
        Self::new(
            rect.x as f64 / w,
            rect.y as f64 / h,
            rect.width as f64 / w,
            rect.height as f64 / h,
        )
    }

    /// Pixel rectangle (top-left origin) covering this area of an image of `size`.
    ///
    /// Edges are rounded to the nearest pixel boundary and clipped to the image.
    pub fn to_pixels(&self, size: ImageSize) -> PixelRect {
        let r = self.clamped();
        let w = size.width as f64;
        let h = size.height as f64;
        let x0 = ((r.x * w).round() as u32).min(size.width);
        let y0 = ((r.y * h).round() as u32).min(size.height);
        let x1 = (((r.x + r.width) * w).round() as u32).clamp(x0, size.width);
        let y1 = (((r.y + r.height) * h).round() as u32).clamp(y0, size.height);
        PixelRect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Pixel rectangle in a bottom-left-origin buffer of `size`.
    ///
    /// Goes through [`crop_space::reorigin_rect`] like every other y-axis flip.
    pub fn to_bottom_left_origin_rect(&self, size: ImageSize) -> PixelRect {
        crop_space::reorigin_rect(
            self.to_pixels(size),
            size.height,
            PixelOrigin::TopLeft,
            PixelOrigin::BottomLeft,
        )
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= NORMALIZED_EPSILON || self.height <= NORMALIZED_EPSILON
    }

    /// Restrict to the unit square.
    ///
    /// Afterwards `0 <= x, y`, `x + width <= 1` and `y + height <= 1`.
    /// Non-finite components collapse to zero.
    pub fn clamped(&self) -> Self {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        let x = finite(self.x).clamp(0.0, 1.0);
        let y = finite(self.y).clamp(0.0, 1.0);
        // Clip the far edges too, so a rect that starts left of 0 loses the
        // part that was outside rather than sliding right.
        let right = finite(self.x + self.width).clamp(x, 1.0);
        let bottom = finite(self.y + self.height).clamp(y, 1.0);
        Self::new(x, y, right - x, bottom - y)
    }

    /// Overlap of two rectangles, `None` if they are disjoint.
    pub fn intersection(&self, other: &NormalizedRect) -> Option<NormalizedRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 - x0 <= NORMALIZED_EPSILON || y1 - y0 <= NORMALIZED_EPSILON {
            return None;
        }
        Some(NormalizedRect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn intersects(&self, other: &NormalizedRect) -> bool {
        self.intersection(other).is_some()
    }

    /// `true` if `other` lies entirely inside `self`.
    pub fn contains(&self, other: &NormalizedRect) -> bool {
        other.x >= self.x - NORMALIZED_EPSILON
            && other.y >= self.y - NORMALIZED_EPSILON
            && other.right() <= self.right() + NORMALIZED_EPSILON
            && other.bottom() <= self.bottom() + NORMALIZED_EPSILON
    }

    pub fn offset_by(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Map this rectangle into the space of the image after `transform`.
    ///
    /// Rotation is applied first, then the flips, matching
    /// [`apply_transform`](crate::transform::apply_transform).
    pub fn applying_transform(&self, transform: &GeometricTransform) -> Self {
        let mut r = match transform.rotation {
            Rotation::Deg0 => *self,
            Rotation::Deg90 => self.rotated_cw(),
            Rotation::Deg180 => self.rotated_cw().rotated_cw(),
            Rotation::Deg270 => self.rotated_ccw(),
        };
        if transform.flip_horizontal {
            r = r.mirrored_x();
        }
        if transform.flip_vertical {
            r = r.mirrored_y();
        }
        r
    }

    /// Exact inverse of [`NormalizedRect::applying_transform`].
    pub fn applying_inverse_transform(&self, transform: &GeometricTransform) -> Self {
        let mut r = *self;
        if transform.flip_vertical {
            r = r.mirrored_y();
        }
        if transform.flip_horizontal {
            r = r.mirrored_x();
        }
        match transform.rotation {
            Rotation::Deg0 => r,
            Rotation::Deg90 => r.rotated_ccw(),
            Rotation::Deg180 => r.rotated_ccw().rotated_ccw(),
            Rotation::Deg270 => r.rotated_cw(),
        }
    }

    /// Re-express this rectangle in the coordinate space of `crop`, where
    /// `crop`'s own area becomes the unit square.
    ///
    /// Only the part overlapping the crop area survives; returns `None` when
    /// there is no overlap.
    pub fn relative_to_crop(&self, crop: &NormalizedRect) -> Option<NormalizedRect> {
        if crop.is_empty() {
            return None;
        }
        let overlap = self.intersection(crop)?;
        Some(
            NormalizedRect::new(
                (overlap.x - crop.x) / crop.width,
                (overlap.y - crop.y) / crop.height,
                overlap.width / crop.width,
                overlap.height / crop.height,
            )
            .clamped(),
        )
    }

    /// Component-wise comparison within `epsilon`.
    pub fn approx_eq(&self, other: &NormalizedRect, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.width - other.width).abs() <= epsilon
            && (self.height - other.height).abs() <= epsilon
    }

    // Quarter turn clockwise of the unit square: (u, v) -> (1 - v, u).
    fn rotated_cw(&self) -> Self {
        Self::new(1.0 - self.y - self.height, self.x, self.height, self.width)
    }

    // Quarter turn counter-clockwise: (u, v) -> (v, 1 - u).
    fn rotated_ccw(&self) -> Self {
        Self::new(self.y, 1.0 - self.x - self.width, self.height, self.width)
    }

    fn mirrored_x(&self) -> Self {
        Self::new(1.0 - self.x - self.width, self.y, self.width, self.height)
    }

    fn mirrored_y(&self) -> Self {
        Self::new(self.x, 1.0 - self.y - self.height, self.width, self.height)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn rect_strategy() -> impl Strategy<Value = NormalizedRect> {
        (0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0)
            .prop_map(|(x, y, w, h)| NormalizedRect::new(x, y, w, h).clamped())
    }

    fn transform_strategy() -> impl Strategy<Value = GeometricTransform> {
        (0usize..4, any::<bool>(), any::<bool>()).prop_map(|(r, h, v)| {
            let rotation = [
                Rotation::Deg0,
                Rotation::Deg90,
                Rotation::Deg180,
                Rotation::Deg270,
            ][r];
            GeometricTransform::new(rotation, h, v)
        })
    }

    proptest! {
        /// Property: applying a transform and then its inverse is the identity.
        #[test]
        fn prop_transform_round_trip(r in rect_strategy(), t in transform_strategy()) {
            let back = r.applying_transform(&t).applying_inverse_transform(&t);
            prop_assert!(back.approx_eq(&r, 1e-9), "{:?} -> {:?}", r, back);
        }

        /// Property: transformed rectangles stay inside the unit square.
        #[test]
        fn prop_transform_stays_in_unit_square(r in rect_strategy(), t in transform_strategy()) {
            let moved = r.applying_transform(&t);
            prop_assert!(NormalizedRect::FULL.contains(&moved));
        }

        /// Property: clamped() always satisfies the unit-square invariant.
        #[test]
        fn prop_clamped_invariant(
            x in -2.0f64..2.0, y in -2.0f64..2.0, w in -1.0f64..3.0, h in -1.0f64..3.0,
        ) {
            let r = NormalizedRect::new(x, y, w, h).clamped();
            prop_assert!(r.x >= 0.0 && r.y >= 0.0);
            prop_assert!(r.width >= 0.0 && r.height >= 0.0);
            prop_assert!(r.right() <= 1.0 + 1e-12);
            prop_assert!(r.bottom() <= 1.0 + 1e-12);
        }

        /// Property: pixel conversion agrees with the pixel-level transform size.
        #[test]
        fn prop_to_pixels_within_bounds(r in rect_strategy(), w in 1u32..500, h in 1u32..500) {
            let size = ImageSize::new(w, h);
            let px = r.to_pixels(size);
            prop_assert!(px.right() <= w);
            prop_assert!(px.bottom() <= h);
        }
    }
}
