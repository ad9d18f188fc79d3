//! Text overlay content: template substitution and styled rendering.
//!
//! Substitution runs before measuring, so the overlay size always reflects
//! the final string.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::composite::blend_over;
use super::font::{GlyphMask, GlyphRasterizer};
use crate::bitmap::{Bitmap, Rgba};
use crate::template::expand_tokens;

/// Per-item values available to text templates.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContext {
    /// Source file name without its extension.
    pub filename: String,
    /// 1-based position of the item in its batch.
    pub index: usize,
    /// Number of items in the batch.
    pub count: usize,
    pub timestamp: NaiveDateTime,
}

impl TextContext {
    pub fn new(filename: impl Into<String>, index: usize, count: usize) -> Self {
        Self::with_timestamp(filename, index, count, Local::now().naive_local())
    }

    pub fn with_timestamp(
        filename: impl Into<String>,
        index: usize,
        count: usize,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            filename: filename.into(),
            index,
            count,
            timestamp,
        }
    }
}

impl Default for TextContext {
    fn default() -> Self {
        Self::new("", 1, 1)
    }
}

/// Expand `{filename}`, `{index}`, `{count}`, `{date}`, `{year}`, `{month}`,
/// `{day}` and `{time}` in `template`.
///
/// Unknown tokens are left as written.
pub fn substitute_template(template: &str, ctx: &TextContext) -> String {
    let ts = &ctx.timestamp;
    expand_tokens(template, |name| {
        let value = match name {
            "filename" => ctx.filename.clone(),
            "index" => ctx.index.to_string(),
            "count" => ctx.count.to_string(),
            "date" => ts.format("%Y-%m-%d").to_string(),
            "year" => ts.format("%Y").to_string(),
            "month" => ts.format("%m").to_string(),
            "day" => ts.format("%d").to_string(),
            "time" => ts.format("%H:%M:%S").to_string(),
            _ => return None,
        };
        Some(value)
    })
}

/// Widest outline drawn; wider outlines are drawn at this width.
pub const MAX_OUTLINE_WIDTH: u32 = 64;

/// Largest shadow offset per axis; larger offsets are clamped.
pub const MAX_SHADOW_OFFSET: i32 = 1024;

/// Stroke drawn around each glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub color: Rgba,
    pub width: u32,
}

/// Offset copy of the text drawn beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shadow {
    pub color: Rgba,
    pub offset_x: i32,
    pub offset_y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// Line height in pixels.
    pub size_px: u32,
    pub color: Rgba,
    pub outline: Option<Outline>,
    pub shadow: Option<Shadow>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size_px: 24,
            color: Rgba::WHITE,
            outline: None,
            shadow: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub template: String,
    #[serde(default)]
    pub style: TextStyle,
}

impl TextOverlay {
    pub fn new(template: impl Into<String>, style: TextStyle) -> Self {
        Self {
            template: template.into(),
            style,
        }
    }
}

/// Render already-substituted `text` into a transparent bitmap sized to fit
/// glyphs, outline and shadow.
///
/// Returns `None` when the text has no visible extent.
pub fn render_text(
    text: &str,
    style: &TextStyle,
    rasterizer: &dyn GlyphRasterizer,
) -> Option<Bitmap> {
    let mask = rasterizer.rasterize(text, style.size_px.max(1));
    if mask.is_empty() {
        return None;
    }

    let stroke = style.outline.map_or(0, |o| o.width.min(MAX_OUTLINE_WIDTH));
    let shadow_offset = |v: i32| v.clamp(-MAX_SHADOW_OFFSET, MAX_SHADOW_OFFSET);
    let (sdx, sdy) = style
        .shadow
        .map_or((0, 0), |s| (shadow_offset(s.offset_x), shadow_offset(s.offset_y)));

    // Room for the stroke on every side plus the shadow on its side
    let pad_left = stroke + sdx.min(0).unsigned_abs();
    let pad_top = stroke + sdy.min(0).unsigned_abs();
    let width = mask.width.checked_add(2 * stroke + sdx.unsigned_abs())?;
    let height = mask.height.checked_add(2 * stroke + sdy.unsigned_abs())?;
    let mut canvas = Bitmap::filled(width, height, Rgba::TRANSPARENT);

    let body = if stroke > 0 { dilate(&mask, stroke) } else { mask.clone() };
    let body_x = pad_left - stroke;
    let body_y = pad_top - stroke;

    if let Some(shadow) = style.shadow {
        let x = body_x as i64 + i64::from(sdx);
        let y = body_y as i64 + i64::from(sdy);
        paint_mask(&mut canvas, &body, x as u32, y as u32, shadow.color);
    }
    if let Some(outline) = style.outline.filter(|_| stroke > 0) {
        paint_mask(&mut canvas, &body, body_x, body_y, outline.color);
    }
    paint_mask(&mut canvas, &mask, pad_left, pad_top, style.color);

    Some(canvas)
}

/// Grow a mask by `radius` pixels in every direction (square structuring
/// element). The result is `2 * radius` larger on each axis.
fn dilate(mask: &GlyphMask, radius: u32) -> GlyphMask {
    let width = mask.width + 2 * radius;
    let height = mask.height + 2 * radius;
    let r = radius as i64;
    let stride = width as usize;

    // Horizontal then vertical max filter
    let mut horizontal = vec![0u8; stride * mask.height as usize];
    for y in 0..mask.height {
        for x in 0..width {
            let cx = x as i64 - r;
            let lo = (cx - r).max(0);
            let hi = (cx + r).min(mask.width as i64 - 1);
            let mut best = 0u8;
            for sx in lo..=hi {
                best = best.max(mask.get(sx as u32, y));
            }
            horizontal[y as usize * stride + x as usize] = best;
        }
    }

    let mut coverage = vec![0u8; stride * height as usize];
    for y in 0..height {
        let cy = y as i64 - r;
        let lo = (cy - r).max(0);
        let hi = (cy + r).min(mask.height as i64 - 1);
        for x in 0..width {
            let mut best = 0u8;
            for sy in lo..=hi {
                best = best.max(horizontal[sy as usize * stride + x as usize]);
            }
            coverage[y as usize * stride + x as usize] = best;
        }
    }

    GlyphMask {
        width,
        height,
        coverage,
    }
}

/// Composite `color` through `mask` onto `canvas` at `(x, y)`.
fn paint_mask(canvas: &mut Bitmap, mask: &GlyphMask, x: u32, y: u32, color: Rgba) {
    for my in 0..mask.height {
        for mx in 0..mask.width {
            let cov = mask.get(mx, my);
            if cov == 0 {
                continue;
            }
            let (cx, cy) = (x + mx, y + my);
            if cx >= canvas.width || cy >= canvas.height {
                continue;
            }
            let src = Rgba {
                a: ((u16::from(color.a) * u16::from(cov) + 127) / 255) as u8,
                ..color
            };
            let dst = canvas.pixel(cx, cy);
            canvas.set_pixel(cx, cy, blend_over(dst, src, 255));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::font::BitmapFont;
    use chrono::NaiveDate;

    fn ctx() -> TextContext {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 7)
            .and_then(|d| d.and_hms_opt(9, 5, 30))
            .unwrap();
        TextContext::with_timestamp("IMG_0042", 3, 12, ts)
    }

    #[test]
    fn test_substitution() {
        assert_eq!(
            substitute_template("{filename} ({index}/{count})", &ctx()),
            "IMG_0042 (3/12)"
        );
        assert_eq!(
            substitute_template("{date} {year}.{month}.{day} {time}", &ctx()),
            "2024-03-07 2024.03.07 09:05:30"
        );
    }

    #[test]
    fn test_unknown_token_left_verbatim() {
        assert_eq!(substitute_template("© {author}", &ctx()), "© {author}");
    }

    #[test]
    fn test_render_size_follows_substituted_text() {
        let style = TextStyle {
            size_px: 8,
            ..TextStyle::default()
        };
        let render = |template: &str| {
            render_text(&substitute_template(template, &ctx()), &style, &BitmapFont).unwrap()
        };
        let short = render("{index}");
        let long = render("{filename}");
        assert_eq!(short.width, 8);
        assert_eq!(long.width, 64);
    }

    #[test]
    fn test_render_pads_for_outline_and_shadow() {
        let style = TextStyle {
            size_px: 8,
            color: Rgba::WHITE,
            outline: Some(Outline {
                color: Rgba::BLACK,
                width: 2,
            }),
            shadow: Some(Shadow {
                color: Rgba::new(0, 0, 0, 128),
                offset_x: 3,
                offset_y: -1,
            }),
        };
        let bmp = render_text("A", &style, &BitmapFont).unwrap();
        assert_eq!((bmp.width, bmp.height), (8 + 4 + 3, 8 + 4 + 1));
    }

    #[test]
    fn test_extreme_outline_and_shadow_are_clamped() {
        let style = TextStyle {
            size_px: 8,
            color: Rgba::WHITE,
            outline: Some(Outline {
                color: Rgba::BLACK,
                width: u32::MAX,
            }),
            shadow: Some(Shadow {
                color: Rgba::BLACK,
                offset_x: i32::MIN,
                offset_y: i32::MAX,
            }),
        };
        let bmp = render_text("A", &style, &BitmapFont).unwrap();
        let side = 8 + 2 * MAX_OUTLINE_WIDTH + MAX_SHADOW_OFFSET.unsigned_abs();
        assert_eq!((bmp.width, bmp.height), (side, side));
    }

    #[test]
    fn test_outline_surrounds_glyph() {
        let style = TextStyle {
            size_px: 8,
            color: Rgba::WHITE,
            outline: Some(Outline {
                color: Rgba::rgb(255, 0, 0),
                width: 1,
            }),
            shadow: None,
        };
        let bmp = render_text("I", &style, &BitmapFont).unwrap();
        let colors: Vec<Rgba> = (0..bmp.height)
            .flat_map(|y| (0..bmp.width).map(move |x| (x, y)))
            .map(|(x, y)| bmp.pixel(x, y))
            .collect();
        assert!(colors.contains(&Rgba::WHITE));
        assert!(colors.contains(&Rgba::rgb(255, 0, 0)));
        assert!(colors.contains(&Rgba::TRANSPARENT));
    }

    #[test]
    fn test_empty_text_renders_nothing() {
        assert!(render_text("", &TextStyle::default(), &BitmapFont).is_none());
    }

    #[test]
    fn test_dilate_grows_single_pixel() {
        let mask = GlyphMask {
            width: 1,
            height: 1,
            coverage: vec![255],
        };
        let grown = dilate(&mask, 2);
        assert_eq!((grown.width, grown.height), (5, 5));
        assert!(grown.coverage.iter().all(|&c| c == 255));
    }
}
