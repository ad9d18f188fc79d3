//! Source-over compositing of straight-alpha RGBA8.

use crate::bitmap::{Bitmap, Rgba};

/// Opacity in `[0, 1]` as an 8-bit factor.
pub fn opacity_to_u8(opacity: f64) -> u8 {
    if !opacity.is_finite() {
        return 0;
    }
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// `src` over `dst`, with `src` alpha scaled by `opacity` (0..=255).
pub fn blend_over(dst: Rgba, src: Rgba, opacity: u8) -> Rgba {
    let sa = mul_div255(u16::from(src.a), u16::from(opacity));
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return Rgba { a: 255, ..src };
    }

    let inv = 255 - u16::from(sa);
    let da = mul_div255(u16::from(dst.a), inv);
    let out_a = u16::from(sa) + u16::from(da);

    // Weighted average of straight colors by their effective coverage
    let channel = |s: u8, d: u8| -> u8 {
        let num = u32::from(s) * u32::from(sa) + u32::from(d) * u32::from(da);
        ((num + u32::from(out_a) / 2) / u32::from(out_a)) as u8
    };
    Rgba::new(
        channel(src.r, dst.r),
        channel(src.g, dst.g),
        channel(src.b, dst.b),
        out_a.min(255) as u8,
    )
}

/// Composite `src` onto `dst` with its top-left corner at `(x, y)`.
///
/// Parts of `src` that fall outside `dst` are skipped.
pub fn composite(dst: &mut Bitmap, src: &Bitmap, x: u32, y: u32, opacity: f64) {
    let op = opacity_to_u8(opacity);
    if op == 0 {
        return;
    }
    let w = src.width.min(dst.width.saturating_sub(x));
    let h = src.height.min(dst.height.saturating_sub(y));
    for sy in 0..h {
        for sx in 0..w {
            let s = src.pixel(sx, sy);
            if s.a == 0 {
                continue;
            }
            let d = dst.pixel(x + sx, y + sy);
            dst.set_pixel(x + sx, y + sy, blend_over(d, s, op));
        }
    }
}

#[inline]
fn mul_div255(x: u16, y: u16) -> u8 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_source_replaces() {
        let out = blend_over(Rgba::rgb(1, 2, 3), Rgba::rgb(200, 100, 50), 255);
        assert_eq!(out, Rgba::rgb(200, 100, 50));
    }

    #[test]
    fn test_zero_opacity_keeps_destination() {
        let dst = Rgba::rgb(1, 2, 3);
        assert_eq!(blend_over(dst, Rgba::WHITE, 0), dst);
        assert_eq!(blend_over(dst, Rgba::TRANSPARENT, 255), dst);
    }

    #[test]
    fn test_half_opacity_on_opaque_background() {
        let out = blend_over(Rgba::BLACK, Rgba::WHITE, 128);
        assert_eq!(out.a, 255);
        assert!((127..=129).contains(&out.r), "{out:?}");
    }

    #[test]
    fn test_over_transparent_keeps_source_color() {
        let out = blend_over(Rgba::TRANSPARENT, Rgba::new(10, 20, 30, 100), 255);
        assert_eq!(out, Rgba::new(10, 20, 30, 100));
    }

    #[test]
    fn test_composite_clips_to_destination() {
        let mut dst = Bitmap::filled(4, 4, Rgba::BLACK);
        let src = Bitmap::filled(3, 3, Rgba::WHITE);
        composite(&mut dst, &src, 2, 2, 1.0);
        assert_eq!(dst.pixel(1, 1), Rgba::BLACK);
        assert_eq!(dst.pixel(2, 2), Rgba::WHITE);
        assert_eq!(dst.pixel(3, 3), Rgba::WHITE);
    }

    #[test]
    fn test_opacity_conversion() {
        assert_eq!(opacity_to_u8(-1.0), 0);
        assert_eq!(opacity_to_u8(0.5), 128);
        assert_eq!(opacity_to_u8(2.0), 255);
        assert_eq!(opacity_to_u8(f64::NAN), 0);
    }
}
