//! WASM-compatible wrapper types for image data.
//!
//! Pixels cross the boundary as straight RGBA bytes, row-major, top-left
//! origin: the same layout as the core `Bitmap` and a browser `ImageData`.

use rasterline_core::Bitmap;
use wasm_bindgen::prelude::*;

/// An RGBA image held in WASM memory.
///
/// Calling `pixels()` copies the buffer into a JavaScript `Uint8Array`.
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsBitmap {
    inner: Bitmap,
}

#[wasm_bindgen]
impl JsBitmap {
    /// Create a bitmap from RGBA bytes (4 per pixel).
    ///
    /// Fails if `pixels.length != width * height * 4`.
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<JsBitmap, JsValue> {
        Self::from_rgba(width, height, pixels).map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.inner.pixels.len()
    }

    /// Copy of the RGBA pixel data.
    pub fn pixels(&self) -> Vec<u8> {
        self.inner.pixels.clone()
    }

    /// Explicitly free WASM memory.
    pub fn free(self) {}
}

impl JsBitmap {
    pub(crate) fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<JsBitmap, String> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(format!(
                "pixel buffer has {} bytes, expected {expected} for {width}x{height} RGBA",
                pixels.len()
            ));
        }
        Ok(Self {
            inner: Bitmap::new(width, height, pixels),
        })
    }

    pub(crate) fn from_bitmap(inner: Bitmap) -> Self {
        Self { inner }
    }

    pub(crate) fn bitmap(&self) -> &Bitmap {
        &self.inner
    }
}

/// Convert any displayable error into a JavaScript string value.
pub(crate) fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}
