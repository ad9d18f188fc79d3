//! Edge-inset cropping.
//!
//! A [`CropSpec`] removes whole pixels from each visual edge of an image.
//! The translation from visual top/bottom into buffer rows is owned by
//! [`crate::crop_space`]; this module never computes a y-origin itself.
//!
//! # Example
//!
//! ```ignore
//! // Remove the visually top 20 rows
//! let cropped = apply_crop(&image, &CropSpec::new(20, 0, 0, 0))?;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bitmap::Bitmap;
use crate::crop_space::{self, PixelOrigin};
use crate::geometry::{ImageSize, NormalizedRect};

/// Smallest width/height the default crop policy accepts.
pub const MIN_CROP_DIMENSION: u32 = 10;

/// Errors produced when computing or validating a crop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CropError {
    /// The insets leave a region with no area.
    #[error("Invalid crop region: insets leave a {width}x{height} area")]
    InvalidRegion { width: i64, height: i64 },

    /// The region has area but is smaller than the caller's policy allows.
    #[error("Crop result {width}x{height} is below the minimum of {min} pixels per side")]
    BelowMinimum { width: u32, height: u32, min: u32 },
}

/// Pixel insets from each visual edge of a specific source image.
///
/// `top` is always the edge a viewer sees at the top of the upright image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CropSpec {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl CropSpec {
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// True when no edge is inset.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }

    /// Dimensions left after cropping an image of `size`.
    pub fn output_size(&self, size: ImageSize) -> Result<ImageSize, CropError> {
        let rect = crop_space::crop_rect(self, size, PixelOrigin::TopLeft)?;
        Ok(ImageSize::new(rect.width, rect.height))
    }

    /// Check the caller-side policy: positive area and both sides at least
    /// `min_dimension` pixels.
    pub fn validate(&self, size: ImageSize, min_dimension: u32) -> Result<(), CropError> {
        let out = self.output_size(size)?;
        if out.width < min_dimension || out.height < min_dimension {
            return Err(CropError::BelowMinimum {
                width: out.width,
                height: out.height,
                min: min_dimension,
            });
        }
        Ok(())
    }

    /// Insets that keep the normalized crop area `rect` of an image of `size`.
    pub fn from_normalized(rect: &NormalizedRect, size: ImageSize) -> Self {
        crop_space::insets_for_rect(rect.to_pixels(size), size, PixelOrigin::TopLeft)
    }

    /// The kept area as a normalized rectangle of an image of `size`.
    pub fn as_normalized(&self, size: ImageSize) -> Result<NormalizedRect, CropError> {
        let rect = crop_space::crop_rect(self, size, PixelOrigin::TopLeft)?;
        Ok(NormalizedRect::from_pixels(rect, size))
    }
}

/// Apply a crop to a bitmap.
///
/// # Arguments
///
/// * `image` - Bitmap to crop, top-left origin
/// * `spec` - Pixel insets from each edge of `image`
///
/// # Returns
///
/// A new bitmap holding the remaining rectangle.
///
/// # Errors
///
/// Returns [`CropError::InvalidRegion`] if the resulting width or height
/// would be zero or negative.
pub fn apply_crop(image: &Bitmap, spec: &CropSpec) -> Result<Bitmap, CropError> {
    let rect = crop_space::crop_rect(spec, image.size(), Bitmap::ORIGIN)?;

    // Fast path: nothing removed returns a clone
    if spec.is_noop() {
        return Ok(image.clone());
    }

    Ok(image.sub_image(rect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Rgba;
    use crate::geometry::PixelRect;

    const TOP_COLOR: Rgba = Rgba::rgb(255, 0, 0);
    const BOTTOM_COLOR: Rgba = Rgba::rgb(0, 0, 255);

    /// Upright image: visually top half red, visually bottom half blue.
    fn two_tone(width: u32, height: u32) -> Bitmap {
        let mut img = Bitmap::filled(width, height, BOTTOM_COLOR);
        img.fill_rect(PixelRect::new(0, 0, width, height / 2), TOP_COLOR);
        img
    }

    /// Create a test image where each pixel has a unique value based on position.
    fn test_image(width: u32, height: u32) -> Bitmap {
        let mut img = Bitmap::filled(width, height, Rgba::BLACK);
        for y in 0..height {
            for x in 0..width {
                let v = ((y * width + x) % 256) as u8;
                img.set_pixel(x, y, Rgba::rgb(v, v, v));
            }
        }
        img
    }

    /// Rows of `img` reordered so row 0 is the visual bottom.
    fn to_bottom_left_rows(img: &Bitmap) -> Vec<Vec<Rgba>> {
        (0..img.height)
            .rev()
            .map(|y| (0..img.width).map(|x| img.pixel(x, y)).collect())
            .collect()
    }

    #[test]
    fn test_crop_from_top_removes_visual_top() {
        let img = two_tone(40, 100);
        let result = apply_crop(&img, &CropSpec::new(20, 0, 0, 0)).unwrap();

        assert_eq!(result.height, 80);
        assert_eq!(result.width, 40);
        // Visual row 0 is still red (rows 20..50 of the original), visual
        // bottom row is blue.
        assert_eq!(result.pixel(0, 0), TOP_COLOR);
        assert_eq!(result.pixel(0, 29), TOP_COLOR);
        assert_eq!(result.pixel(0, 30), BOTTOM_COLOR);
        assert_eq!(result.pixel(0, 79), BOTTOM_COLOR);
    }

    #[test]
    fn test_crop_from_top_in_bottom_left_buffer() {
        let img = two_tone(4, 100);
        let rows = to_bottom_left_rows(&img);
        let spec = CropSpec::new(20, 0, 0, 0);

        let rect = crop_space::crop_rect(&spec, img.size(), PixelOrigin::BottomLeft).unwrap();
        assert_eq!(rect.y, 0, "bottom-left crops start at the bottom inset");
        let kept: Vec<_> = rows[rect.y as usize..rect.bottom() as usize].to_vec();

        assert_eq!(kept.len(), 80);
        // Row 0 in bottom-left convention is the visual bottom: blue.
        assert_eq!(kept[0][0], BOTTOM_COLOR);
        // The last kept row is visual row 20 of the original: still red.
        assert_eq!(kept[79][0], TOP_COLOR);
        // Both conventions keep the same visual content.
        let top_left = apply_crop(&img, &spec).unwrap();
        assert_eq!(to_bottom_left_rows(&top_left), kept);
    }

    #[test]
    fn test_crop_from_bottom_keeps_top() {
        let img = two_tone(10, 100);
        let result = apply_crop(&img, &CropSpec::new(0, 50, 0, 0)).unwrap();
        assert_eq!(result.height, 50);
        for y in 0..result.height {
            assert_eq!(result.pixel(5, y), TOP_COLOR);
        }
    }

    #[test]
    fn test_noop_crop_returns_copy() {
        let img = test_image(20, 10);
        assert_eq!(apply_crop(&img, &CropSpec::default()).unwrap(), img);
    }

    #[test]
    fn test_crop_pixel_values_preserved() {
        let img = test_image(10, 10);
        let result = apply_crop(&img, &CropSpec::new(3, 3, 3, 3)).unwrap();

        assert_eq!((result.width, result.height), (4, 4));
        // First pixel should be from (3, 3): (3 * 10 + 3) % 256 = 33
        assert_eq!(result.pixel(0, 0), Rgba::rgb(33, 33, 33));
    }

    #[test]
    fn test_crop_rejects_non_positive_area() {
        let img = test_image(10, 10);
        assert_eq!(
            apply_crop(&img, &CropSpec::new(5, 5, 0, 0)),
            Err(CropError::InvalidRegion {
                width: 10,
                height: 0
            })
        );
        assert!(apply_crop(&img, &CropSpec::new(0, 0, 8, 8)).is_err());
    }

    #[test]
    fn test_validate_policy() {
        let size = ImageSize::new(100, 100);
        assert!(CropSpec::new(40, 40, 0, 0)
            .validate(size, MIN_CROP_DIMENSION)
            .is_ok());
        assert_eq!(
            CropSpec::new(45, 46, 0, 0).validate(size, MIN_CROP_DIMENSION),
            Err(CropError::BelowMinimum {
                width: 100,
                height: 9,
                min: 10
            })
        );
        assert!(matches!(
            CropSpec::new(60, 60, 0, 0).validate(size, MIN_CROP_DIMENSION),
            Err(CropError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn test_normalized_conversions() {
        let size = ImageSize::new(200, 100);
        let spec = CropSpec::new(10, 20, 50, 30);
        let rect = spec.as_normalized(size).unwrap();
        assert!(rect.approx_eq(&NormalizedRect::new(0.25, 0.1, 0.6, 0.7), 1e-12));
        assert_eq!(CropSpec::from_normalized(&rect, size), spec);
    }

    #[test]
    fn test_output_size() {
        let spec = CropSpec::new(1, 2, 3, 4);
        assert_eq!(
            spec.output_size(ImageSize::new(20, 10)).unwrap(),
            ImageSize::new(13, 7)
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
