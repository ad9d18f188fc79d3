//! Output resizing.
//!
//! A [`ResizeSpec`] picks a target size from the current (already cropped)
//! bitmap; resampling is done by the `image` crate's filters.
//!
//! With `maintain_aspect_ratio`, `Exact(w, h)` scales uniformly by
//! `min(w / width, h / height)` and the output takes the *scaled* size.
//! No letterboxing is added, so the result may be smaller than the
//! requested box in one dimension.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bitmap::Bitmap;
use crate::geometry::ImageSize;

/// Largest output side, the limit of the JPEG format.
pub const MAX_DIMENSION: u32 = 65_535;

/// Errors produced by the resize engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResizeError {
    /// A requested dimension or percentage is zero.
    #[error("Invalid resize target: {0}")]
    InvalidDimensions(String),

    /// The target would exceed [`MAX_DIMENSION`] on some side.
    #[error("Resize target too large: {0}")]
    TooLarge(String),

    /// The source buffer does not match its declared dimensions.
    #[error("Resize source buffer does not match {width}x{height}")]
    InvalidSource { width: u32, height: u32 },
}

/// Filter type for image resizing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Nearest neighbor interpolation (only when explicitly requested).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    Bilinear,
    /// Catmull-Rom bicubic interpolation.
    #[default]
    Bicubic,
    /// Lanczos3 interpolation (slower, sharpest).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Bicubic => image::imageops::FilterType::CatmullRom,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// How the target size is derived.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResizeMode {
    #[default]
    None,
    Exact {
        width: u32,
        height: u32,
    },
    MaxWidth {
        width: u32,
    },
    MaxHeight {
        height: u32,
    },
    Percentage {
        percent: f64,
    },
}

/// Resize settings.
///
/// The mode's fields sit beside the others in JSON
/// (`{"mode": "max_width", "width": 1200}`); a missing `mode` means none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResizeSpecFields")]
pub struct ResizeSpec {
    #[serde(flatten)]
    pub mode: ResizeMode,
    pub maintain_aspect_ratio: bool,
    pub filter: FilterType,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ModeName {
    #[default]
    None,
    Exact,
    MaxWidth,
    MaxHeight,
    Percentage,
}

/// Flat JSON shape of a [`ResizeSpec`].
#[derive(Deserialize)]
#[serde(default)]
struct ResizeSpecFields {
    mode: ModeName,
    width: Option<u32>,
    height: Option<u32>,
    percent: Option<f64>,
    maintain_aspect_ratio: bool,
    filter: FilterType,
}

impl Default for ResizeSpecFields {
    fn default() -> Self {
        let spec = ResizeSpec::default();
        Self {
            mode: ModeName::None,
            width: None,
            height: None,
            percent: None,
            maintain_aspect_ratio: spec.maintain_aspect_ratio,
            filter: spec.filter,
        }
    }
}

impl TryFrom<ResizeSpecFields> for ResizeSpec {
    type Error = String;

    fn try_from(fields: ResizeSpecFields) -> Result<Self, Self::Error> {
        let need = |value: Option<u32>, name: &str| {
            value.ok_or_else(|| format!("resize mode {:?} needs `{name}`", fields.mode))
        };
        let mode = match fields.mode {
            ModeName::None => ResizeMode::None,
            ModeName::Exact => ResizeMode::Exact {
                width: need(fields.width, "width")?,
                height: need(fields.height, "height")?,
            },
            ModeName::MaxWidth => ResizeMode::MaxWidth {
                width: need(fields.width, "width")?,
            },
            ModeName::MaxHeight => ResizeMode::MaxHeight {
                height: need(fields.height, "height")?,
            },
            ModeName::Percentage => ResizeMode::Percentage {
                percent: fields
                    .percent
                    .ok_or_else(|| "resize mode Percentage needs `percent`".to_string())?,
            },
        };
        Ok(ResizeSpec {
            mode,
            maintain_aspect_ratio: fields.maintain_aspect_ratio,
            filter: fields.filter,
        })
    }
}

impl Default for ResizeSpec {
    fn default() -> Self {
        Self {
            mode: ResizeMode::None,
            maintain_aspect_ratio: true,
            filter: FilterType::Bicubic,
        }
    }
}

impl ResizeSpec {
    pub fn new(mode: ResizeMode, maintain_aspect_ratio: bool) -> Self {
        Self {
            mode,
            maintain_aspect_ratio,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != ResizeMode::None
    }

    /// Output size for a source of `size`, or `None` if nothing would change.
    pub fn target_size(&self, size: ImageSize) -> Result<Option<ImageSize>, ResizeError> {
        if size.is_empty() {
            return Ok(None);
        }
        let (w, h) = (size.width as f64, size.height as f64);

        let target = match self.mode {
            ResizeMode::None => return Ok(None),
            ResizeMode::Exact { width, height } => {
                if width == 0 || height == 0 {
                    return Err(ResizeError::InvalidDimensions(format!(
                        "exact size {width}x{height}"
                    )));
                }
                if self.maintain_aspect_ratio {
                    let scale = (width as f64 / w).min(height as f64 / h);
                    scaled(size, scale)?
                } else {
                    checked_size(width as f64, height as f64)?
                }
            }
            ResizeMode::MaxWidth { width } => {
                if width == 0 {
                    return Err(ResizeError::InvalidDimensions("max width 0".into()));
                }
                if size.width <= width {
                    return Ok(None);
                }
                ImageSize::new(width, round_dim(h * width as f64 / w))
            }
            ResizeMode::MaxHeight { height } => {
                if height == 0 {
                    return Err(ResizeError::InvalidDimensions("max height 0".into()));
                }
                if size.height <= height {
                    return Ok(None);
                }
                ImageSize::new(round_dim(w * height as f64 / h), height)
            }
            ResizeMode::Percentage { percent } => {
                if !percent.is_finite() || percent <= 0.0 {
                    return Err(ResizeError::InvalidDimensions(format!(
                        "percentage {percent}"
                    )));
                }
                scaled(size, percent / 100.0)?
            }
        };

        if target == size {
            Ok(None)
        } else {
            Ok(Some(target))
        }
    }
}

fn round_dim(v: f64) -> u32 {
    (v.round() as u32).max(1)
}

fn scaled(size: ImageSize, scale: f64) -> Result<ImageSize, ResizeError> {
    checked_size(size.width as f64 * scale, size.height as f64 * scale)
}

fn checked_size(width: f64, height: f64) -> Result<ImageSize, ResizeError> {
    let limit = f64::from(MAX_DIMENSION);
    if width.round() > limit || height.round() > limit {
        return Err(ResizeError::TooLarge(format!(
            "{width:.0}x{height:.0} exceeds {MAX_DIMENSION} pixels per side"
        )));
    }
    Ok(ImageSize::new(round_dim(width), round_dim(height)))
}

/// Resize a bitmap according to `spec`.
///
/// # Arguments
///
/// * `image` - Bitmap to resize, usually already cropped
/// * `spec` - Resize mode, aspect flag and filter
///
/// # Returns
///
/// `Ok(None)` when the spec is disabled or would not change the size.
///
/// # Errors
///
/// Returns [`ResizeError::InvalidDimensions`] for zero targets and
/// [`ResizeError::TooLarge`] for targets past [`MAX_DIMENSION`].
pub fn resize(image: &Bitmap, spec: &ResizeSpec) -> Result<Option<Bitmap>, ResizeError> {
    let Some(target) = spec.target_size(image.size())? else {
        return Ok(None);
    };
    resize_exact(image, target, spec.filter).map(Some)
}

/// Resample a bitmap to exactly `target`.
pub fn resize_exact(
    image: &Bitmap,
    target: ImageSize,
    filter: FilterType,
) -> Result<Bitmap, ResizeError> {
    if target.is_empty() {
        return Err(ResizeError::InvalidDimensions(format!(
            "{}x{}",
            target.width, target.height
        )));
    }

    // Fast path: if dimensions match, just clone
    if image.size() == target {
        return Ok(image.clone());
    }

    let rgba = image.to_rgba_image().ok_or(ResizeError::InvalidSource {
        width: image.width,
        height: image.height,
    })?;
    let resized = image::imageops::resize(
        &rgba,
        target.width,
        target.height,
        filter.to_image_filter(),
    );
    Ok(Bitmap::from_rgba_image(resized))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: aspect-locked exact targets fit inside the requested box
        /// (up to rounding) and touch it on at least one side.
        #[test]
        fn prop_aspect_locked_fits_box(
            w in 1u32..2000, h in 1u32..2000, bw in 1u32..2000, bh in 1u32..2000,
        ) {
            let spec = ResizeSpec::new(ResizeMode::Exact { width: bw, height: bh }, true);
            let size = ImageSize::new(w, h);
            let out = spec.target_size(size).unwrap().unwrap_or(size);
            prop_assert!(out.width <= bw + 1 && out.height <= bh + 1);
            prop_assert!(out.width + 1 >= bw || out.height + 1 >= bh);
        }

        /// Property: max-width results never exceed the limit.
        #[test]
        fn prop_max_width_bound(w in 1u32..4000, h in 1u32..4000, limit in 1u32..2000) {
            let spec = ResizeSpec::new(ResizeMode::MaxWidth { width: limit }, true);
            let size = ImageSize::new(w, h);
            let out = spec.target_size(size).unwrap().unwrap_or(size);
            prop_assert!(out.width <= limit.max(w.min(limit)));
            prop_assert!(out.width <= w);
        }
    }
}
