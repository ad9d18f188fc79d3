//! Rectangle and transform mapping for a live-preview host.
//!
//! Effect rectangles are authored against the untransformed source while a
//! preview shows the transformed image. These bindings map between the two
//! so hit-testing and drawing agree with the export pipeline.

use rasterline_core::effects::effects_hash;
use rasterline_core::{GeometricTransform, ImageSize, NormalizedRect, RegionEffect};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::types::js_error;

fn parse_transform(value: JsValue) -> Result<GeometricTransform, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(js_error)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(js_error)
}

/// Map a source-space rectangle into the transformed (displayed) image.
#[wasm_bindgen]
pub fn rect_to_display(rect: JsValue, transform: JsValue) -> Result<JsValue, JsValue> {
    let rect: NormalizedRect = serde_wasm_bindgen::from_value(rect).map_err(js_error)?;
    let transform = parse_transform(transform)?;
    to_js(&rect.clamped().applying_transform(&transform))
}

/// Map a rectangle drawn on the displayed image back into source space.
#[wasm_bindgen]
pub fn rect_to_source(rect: JsValue, transform: JsValue) -> Result<JsValue, JsValue> {
    let rect: NormalizedRect = serde_wasm_bindgen::from_value(rect).map_err(js_error)?;
    let transform = parse_transform(transform)?;
    to_js(&rect.clamped().applying_inverse_transform(&transform))
}

/// Pixel rectangle `{x, y, width, height}` covered by `rect` on an image of
/// `width` x `height`.
#[wasm_bindgen]
pub fn rect_to_pixels(rect: JsValue, width: u32, height: u32) -> Result<JsValue, JsValue> {
    let rect: NormalizedRect = serde_wasm_bindgen::from_value(rect).map_err(js_error)?;
    to_js(&rect.to_pixels(ImageSize::new(width, height)))
}

/// `[width, height]` of a `width` x `height` image after `transform`.
#[wasm_bindgen]
pub fn transformed_size(width: u32, height: u32, transform: JsValue) -> Result<Vec<u32>, JsValue> {
    let transform = parse_transform(transform)?;
    let size = transform.transformed_size(ImageSize::new(width, height));
    Ok(vec![size.width, size.height])
}

/// Content hash of an ordered effect list, for preview cache keys.
#[wasm_bindgen]
pub fn effect_list_hash(effects: JsValue) -> Result<u64, JsValue> {
    let effects: Vec<RegionEffect> = serde_wasm_bindgen::from_value(effects).map_err(js_error)?;
    Ok(effects_hash(&effects))
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use rasterline_core::Rotation;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_display_round_trip() {
        let rect = NormalizedRect::new(0.1, 0.2, 0.3, 0.4);
        let t = GeometricTransform::new(Rotation::Deg270, true, false);
        let shown = rect_to_display(to_js(&rect).unwrap(), to_js(&t).unwrap()).unwrap();
        let back = rect_to_source(shown, to_js(&t).unwrap()).unwrap();
        let back: NormalizedRect = serde_wasm_bindgen::from_value(back).unwrap();
        assert!(back.approx_eq(&rect, 1e-9));
    }

    #[wasm_bindgen_test]
    fn test_transformed_size() {
        let t = GeometricTransform::new(Rotation::Deg90, false, false);
        assert_eq!(transformed_size(40, 30, to_js(&t).unwrap()).unwrap(), vec![30, 40]);
    }
}
