//! Decode and encode bindings.
//!
//! ```typescript
//! const image = decode_image(new Uint8Array(await file.arrayBuffer()));
//! const png = encode_image(image, "png", 90);
//! ```

use crate::types::{js_error, JsBitmap};
use rasterline_core::decode;
use rasterline_core::encode::{encode_bitmap, EncodeSettings, OutputFormat};
use wasm_bindgen::prelude::*;

/// Decode JPEG or PNG bytes, applying EXIF orientation.
#[wasm_bindgen]
pub fn decode_image(bytes: &[u8]) -> Result<JsBitmap, JsValue> {
    decode::decode_bytes(bytes)
        .map(JsBitmap::from_bitmap)
        .map_err(js_error)
}

/// Encode to `"jpeg"` (`"jpg"`) or `"png"`. `quality` only affects JPEG.
#[wasm_bindgen]
pub fn encode_image(image: &JsBitmap, format: &str, quality: u8) -> Result<Vec<u8>, JsValue> {
    let format = parse_format(format).map_err(|e| JsValue::from_str(&e))?;
    encode_bitmap(image.bitmap(), &EncodeSettings::new(format, quality)).map_err(js_error)
}

fn parse_format(name: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_extension(name).ok_or_else(|| format!("unsupported output format: {name}"))
}
