//! Single-image pipeline binding.
//!
//! Settings, effects and the text context arrive as plain JavaScript objects
//! and are read with `serde-wasm-bindgen`. An image overlay is passed as a
//! separate `JsBitmap` because pixel buffers do not round-trip through serde
//! efficiently.
//!
//! ```typescript
//! const out = process_image(image, {
//!   transform: { rotation: 90 },
//!   crop: { top: 10 },
//!   resize: { mode: "max_width", width: 1200 },
//!   overlay: { placement: { anchor: "bottom_right" } },
//! }, effects, { filename: "IMG_1", index: 1, count: 1 }, logo);
//! ```

use chrono::DateTime;
use rasterline_core::overlay::{OverlayPlacement, OverlaySpec, TextContext, TextOverlay};
use rasterline_core::{
    process_one, CropSpec, GeometricTransform, ProcessingSettings, RegionEffect, ResizeSpec,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

use crate::types::{js_error, JsBitmap};

/// Overlay fields of [`JsSettings`]. With `text` set the overlay is text,
/// otherwise the image passed to `process_image` is used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct JsOverlay {
    text: Option<TextOverlay>,
    placement: OverlayPlacement,
}

/// JSON shape of the processing settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct JsSettings {
    crop: Option<CropSpec>,
    transform: GeometricTransform,
    resize: ResizeSpec,
    overlay: Option<JsOverlay>,
    min_crop_dimension: Option<u32>,
}

impl JsSettings {
    fn into_settings(self, overlay_image: Option<&JsBitmap>) -> Result<ProcessingSettings, String> {
        let overlay = match self.overlay {
            None => None,
            Some(JsOverlay {
                text: Some(text),
                placement,
            }) => Some(OverlaySpec::text(text, placement)),
            Some(JsOverlay { text: None, placement }) => match overlay_image {
                Some(image) => Some(OverlaySpec::image(image.bitmap().clone(), placement)),
                None => return Err("overlay has neither text nor an image".into()),
            },
        };
        Ok(ProcessingSettings {
            crop: self.crop,
            transform: self.transform,
            resize: self.resize,
            overlay,
            min_crop_dimension: self.min_crop_dimension,
        })
    }
}

/// JSON shape of the text context. The host supplies the timestamp because
/// the browser owns the clock and the time zone.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct JsTextContext {
    filename: String,
    index: usize,
    count: usize,
    /// Local wall-clock time as milliseconds since the Unix epoch.
    local_time_ms: Option<i64>,
}

impl Default for JsTextContext {
    fn default() -> Self {
        Self {
            filename: String::new(),
            index: 1,
            count: 1,
            local_time_ms: None,
        }
    }
}

impl JsTextContext {
    fn into_context(self) -> TextContext {
        let timestamp = self
            .local_time_ms
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_default()
            .naive_utc();
        TextContext::with_timestamp(self.filename, self.index, self.count, timestamp)
    }
}

pub(crate) fn run(
    image: &JsBitmap,
    settings: JsSettings,
    effects: &[RegionEffect],
    context: JsTextContext,
    overlay_image: Option<&JsBitmap>,
) -> Result<JsBitmap, String> {
    let settings = settings.into_settings(overlay_image)?;
    let ctx = context.into_context();
    process_one(image.bitmap(), &settings, effects, &ctx)
        .map(JsBitmap::from_bitmap)
        .map_err(|e| e.to_string())
}

/// Run region effects, transform, crop, resize and overlay on `image`.
///
/// `settings`, `effects` and `context` may be `undefined` for defaults.
/// Without `context.local_time_ms` the browser clock is used.
#[wasm_bindgen]
pub fn process_image(
    image: &JsBitmap,
    settings: JsValue,
    effects: JsValue,
    context: JsValue,
    overlay_image: Option<JsBitmap>,
) -> Result<JsBitmap, JsValue> {
    let settings: JsSettings = from_optional(settings)?;
    let effects: Vec<RegionEffect> = from_optional(effects)?;
    let mut context: JsTextContext = from_optional(context)?;
    if context.local_time_ms.is_none() {
        context.local_time_ms = Some(browser_local_time_ms());
    }
    run(image, settings, &effects, context, overlay_image.as_ref())
        .map_err(|e| JsValue::from_str(&e))
}

/// Current wall-clock time in the browser's time zone.
fn browser_local_time_ms() -> i64 {
    let now = js_sys::Date::new_0();
    let offset_minutes = now.get_timezone_offset();
    (now.get_time() - offset_minutes * 60_000.0) as i64
}

fn from_optional<T: for<'de> Deserialize<'de> + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(value).map_err(js_error)
    }
}
