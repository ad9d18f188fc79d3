//! Rasterline WASM - WebAssembly bindings for Rasterline
//!
//! This crate exposes the single-image pipeline of rasterline-core to
//! JavaScript/TypeScript hosts such as a live preview. Batch export and
//! filesystem access stay native.
//!
//! # Module Structure
//!
//! - `types` - `JsBitmap`, the RGBA image wrapper
//! - `codec` - Decode (with EXIF orientation) and encode
//! - `pipeline` - `process_image`, the full effects/transform/crop/resize/overlay run
//! - `geometry` - Rectangle mapping between source and displayed space
//!
//! # Usage
//!
//! ```typescript
//! import init, { decode_image, process_image } from '@rasterline/wasm';
//!
//! await init();
//! const image = decode_image(new Uint8Array(await file.arrayBuffer()));
//! const out = process_image(image, { transform: { rotation: 90 } });
//! console.log(`Processed ${out.width}x${out.height}`);
//! ```

use wasm_bindgen::prelude::*;

mod codec;
mod geometry;
mod pipeline;
mod types;

pub use codec::{decode_image, encode_image};
pub use geometry::{
    effect_list_hash, rect_to_display, rect_to_pixels, rect_to_source, transformed_size,
};
pub use pipeline::process_image;
pub use types::JsBitmap;

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
