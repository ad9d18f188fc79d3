//! The in-memory pixel buffer every pipeline stage consumes and produces.
//!
//! A [`Bitmap`] is 8-bit RGBA, row-major, with the origin at the **top-left**
//! corner. That is the `image` crate's layout, so conversions in and out of
//! `image::RgbaImage` are zero-copy moves of the underlying `Vec<u8>`.
//!
//! Code that needs to talk about visual top/bottom edges in another origin
//! convention goes through [`crate::crop_space`], never through ad-hoc
//! `height - y` arithmetic.

use serde::{Deserialize, Serialize};

use crate::crop_space::PixelOrigin;
use crate::geometry::{ImageSize, PixelRect};

/// Bytes per pixel in a [`Bitmap`].
pub const CHANNELS: usize = 4;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque_alpha")]
    pub a: u8,
}

fn opaque_alpha() -> u8 {
    255
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_slice(px: &[u8]) -> Self {
        Self::new(px[0], px[1], px[2], px[3])
    }

    /// Same color with alpha forced to 255.
    pub fn opaque(self) -> Self {
        Self { a: 255, ..self }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::BLACK
    }
}

/// An RGBA raster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGBA pixel data in row-major order (4 bytes per pixel), top row first.
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Pixel-origin convention of the `pixels` buffer.
    pub const ORIGIN: PixelOrigin = PixelOrigin::TopLeft;

    /// Create a new Bitmap with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * CHANNELS,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a bitmap filled with a single color.
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixels = color.to_array().repeat(width as usize * height as usize);
        Self::new(width, height, pixels)
    }

    /// Expand tightly packed RGB data to an opaque bitmap.
    pub fn from_rgb(width: u32, height: u32, rgb: &[u8]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for px in rgb.chunks_exact(3) {
            pixels.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        Self::new(width, height, pixels)
    }

    /// Drop the alpha channel.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixel_count() * 3);
        for px in self.pixels.chunks_exact(CHANNELS) {
            out.extend_from_slice(&px[..3]);
        }
        out
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Convert to an `image::RgbaImage` without copying.
    ///
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn into_rgba_image(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels)
    }

    /// Borrowing variant of [`Bitmap::into_rgba_image`]; clones the pixels.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Pixel at `(x, y)`, top-left origin.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let idx = self.index(x, y);
        Rgba::from_slice(&self.pixels[idx..idx + CHANNELS])
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        let idx = self.index(x, y);
        self.pixels[idx..idx + CHANNELS].copy_from_slice(&color.to_array());
    }

    /// Copy a sub-rectangle (top-left origin) into a new bitmap.
    ///
    /// `rect` must lie within the bitmap.
    pub fn sub_image(&self, rect: PixelRect) -> Bitmap {
        debug_assert!(self.bounds().contains(&rect), "sub_image out of bounds");
        let row_bytes = rect.width as usize * CHANNELS;
        let mut out = Vec::with_capacity(row_bytes * rect.height as usize);
        for y in rect.y..rect.y + rect.height {
            let start = self.index(rect.x, y);
            out.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }
        Bitmap::new(rect.width, rect.height, out)
    }

    /// Overwrite the area at `(x, y)` with `src`, row by row.
    ///
    /// `src` placed at `(x, y)` must lie within the bitmap.
    pub fn blit(&mut self, src: &Bitmap, x: u32, y: u32) {
        let row_bytes = src.width as usize * CHANNELS;
        for row in 0..src.height {
            let dst = self.index(x, y + row);
            let from = src.index(0, row);
            self.pixels[dst..dst + row_bytes].copy_from_slice(&src.pixels[from..from + row_bytes]);
        }
    }

    /// Fill a rectangle (top-left origin, clipped to the bitmap) with a color.
    pub fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        let Some(rect) = rect.intersection(&self.bounds()) else {
            return;
        };
        let px = color.to_array();
        for y in rect.y..rect.y + rect.height {
            let start = self.index(rect.x, y);
            let end = start + rect.width as usize * CHANNELS;
            for chunk in self.pixels[start..end].chunks_exact_mut(CHANNELS) {
                chunk.copy_from_slice(&px);
            }
        }
    }
}
