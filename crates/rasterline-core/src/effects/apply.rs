//! Rasterization of region effects onto a bitmap.

use crate::bitmap::Bitmap;
use crate::geometry::PixelRect;

use super::blur::blur_region;
use super::mosaic::pixelate_rgba8;
use super::{EffectKind, RegionEffect, MAX_SOFTEN_RADIUS};

/// Blur radius in pixels for a soften intensity.
pub fn soften_radius(intensity: f64) -> u32 {
    (intensity.clamp(0.0, 1.0) * MAX_SOFTEN_RADIUS).round() as u32
}

/// Mosaic block edge in pixels for a region of `rect` and an intensity.
///
/// `max(width, height) / 20 * (0.3 + 0.7 * intensity)`, at least 1.
pub fn mosaic_block_size(rect: PixelRect, intensity: f64) -> u32 {
    let longest = rect.width.max(rect.height) as f64;
    let factor = 0.3 + intensity.clamp(0.0, 1.0) * 0.7;
    ((longest / 20.0 * factor).round() as u32).max(1)
}

/// Apply every effect, in list order, to `image`.
///
/// # Arguments
///
/// * `image` - Bitmap modified in place
/// * `effects` - Effects whose rectangles are normalized to `image`
///
/// Rectangles are mapped into the bitmap's own pixel grid. Pixels outside
/// every effect's rectangle are left untouched.
pub fn apply_effects(image: &mut Bitmap, effects: &[RegionEffect]) {
    // Early exit if nothing to do
    if effects.is_empty() || image.is_empty() {
        return;
    }
    for effect in effects {
        apply_effect(image, effect);
    }
}

/// Apply a single effect to `image`.
pub fn apply_effect(image: &mut Bitmap, effect: &RegionEffect) {
    let rect = effect.rect().to_pixels(image.size());
    if rect.is_empty() {
        return;
    }
    tracing::trace!(id = effect.id.0, ?rect, kind = ?effect.kind(), "applying region effect");

    match effect.kind() {
        EffectKind::Soften { intensity } => soften(image, rect, soften_radius(intensity)),
        EffectKind::Mosaic { intensity } => {
            let block = mosaic_block_size(rect, intensity);
            let mut region = image.sub_image(rect);
            pixelate_rgba8(&mut region.pixels, region.width, region.height, block);
            image.blit(&region, rect.x, rect.y);
        }
        EffectKind::SolidFill { color } => image.fill_rect(rect, color.opaque()),
    }
}

/// Blur `rect`, sampling up to `radius` pixels beyond it, and write back
/// only the pixels inside `rect`.
///
/// Where the sampling window hits the image edge the edge pixel repeats, so
/// falloff there is asymmetric.
fn soften(image: &mut Bitmap, rect: PixelRect, radius: u32) {
    if radius == 0 {
        return;
    }
    let blurred = Bitmap::new(rect.width, rect.height, blur_region(image, rect, radius));
    image.blit(&blurred, rect.x, rect.y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Rgba;
    use crate::effects::EffectId;
    use crate::geometry::NormalizedRect;

    fn checkerboard(width: u32, height: u32) -> Bitmap {
        let mut img = Bitmap::filled(width, height, Rgba::BLACK);
        for y in 0..height {
            for x in 0..width {
                if (x + y) % 2 == 0 {
                    img.set_pixel(x, y, Rgba::WHITE);
                }
            }
        }
        img
    }

    fn effect(rect: NormalizedRect, kind: EffectKind) -> RegionEffect {
        RegionEffect::new(EffectId(1), rect, kind)
    }

    /// Every pixel outside `rect` matches `before`.
    fn assert_outside_unchanged(before: &Bitmap, after: &Bitmap, rect: PixelRect) {
        for y in 0..before.height {
            for x in 0..before.width {
                if !rect.contains_point(x, y) {
                    assert_eq!(before.pixel(x, y), after.pixel(x, y), "changed at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn test_solid_fill_containment() {
        let before = checkerboard(50, 40);
        let mut after = before.clone();
        let fill = Rgba::rgb(10, 200, 30);
        let norm = NormalizedRect::new(0.2, 0.25, 0.4, 0.5);
        apply_effects(&mut after, &[effect(norm, EffectKind::solid_fill(fill))]);

        let rect = norm.to_pixels(before.size());
        assert_eq!(rect, PixelRect::new(10, 10, 20, 20));
        assert_outside_unchanged(&before, &after, rect);
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                assert_eq!(after.pixel(x, y), fill);
            }
        }
    }

    #[test]
    fn test_soften_does_not_bleed() {
        let before = checkerboard(64, 64);
        let mut after = before.clone();
        let norm = NormalizedRect::new(0.25, 0.25, 0.5, 0.5);
        apply_effects(&mut after, &[effect(norm, EffectKind::soften(0.2))]);

        let rect = norm.to_pixels(before.size());
        assert_outside_unchanged(&before, &after, rect);
        // A checkerboard blurs towards mid grey inside the rect.
        let centre = after.pixel(32, 32);
        assert!(centre.r > 64 && centre.r < 192, "{centre:?}");
    }

    #[test]
    fn test_soften_zero_intensity_is_noop() {
        let before = checkerboard(16, 16);
        let mut after = before.clone();
        apply_effects(
            &mut after,
            &[effect(NormalizedRect::FULL, EffectKind::soften(0.0))],
        );
        assert_eq!(before, after);
    }

    #[test]
    fn test_soften_samples_outside_rect() {
        // Left half black, right half white; soften only the white column
        // next to the seam. The blur must pull in black from outside.
        let mut before = Bitmap::filled(40, 10, Rgba::WHITE);
        before.fill_rect(PixelRect::new(0, 0, 20, 10), Rgba::BLACK);
        let mut after = before.clone();
        let norm = NormalizedRect::from_pixels(PixelRect::new(20, 0, 4, 10), before.size());
        apply_effects(&mut after, &[effect(norm, EffectKind::soften(0.1))]);

        assert!(after.pixel(20, 5).r < 255);
        assert_eq!(after.pixel(19, 5), Rgba::BLACK);
    }

    #[test]
    fn test_soften_next_to_transparency_keeps_colour() {
        let mut before = Bitmap::filled(40, 10, Rgba::WHITE);
        before.fill_rect(PixelRect::new(0, 0, 20, 10), Rgba::TRANSPARENT);
        let mut after = before.clone();
        let norm = NormalizedRect::from_pixels(PixelRect::new(20, 0, 20, 10), before.size());
        apply_effects(&mut after, &[effect(norm, EffectKind::soften(0.1))]);

        let seam = after.pixel(20, 5);
        assert_eq!((seam.r, seam.g, seam.b), (255, 255, 255));
        assert!(seam.a < 255, "{seam:?}");
        assert_eq!(after.pixel(19, 5), Rgba::TRANSPARENT);
        assert_eq!(after.pixel(39, 5), Rgba::WHITE);
    }

    #[test]
    fn test_mosaic_containment_and_uniform_blocks() {
        let before = checkerboard(100, 100);
        let mut after = before.clone();
        let norm = NormalizedRect::new(0.1, 0.1, 0.4, 0.4);
        apply_effects(&mut after, &[effect(norm, EffectKind::mosaic(1.0))]);

        let rect = norm.to_pixels(before.size());
        let block = mosaic_block_size(rect, 1.0);
        assert_eq!(block, 2);
        assert_outside_unchanged(&before, &after, rect);
        // First block anchored at the rect's top-left is uniform.
        let first = after.pixel(rect.x, rect.y);
        assert_eq!(after.pixel(rect.x + 1, rect.y + 1), first);
        assert_eq!(first.r, 128);
    }

    #[test]
    fn test_later_effects_paint_over_earlier() {
        let mut img = Bitmap::filled(10, 10, Rgba::BLACK);
        let red = Rgba::rgb(255, 0, 0);
        let blue = Rgba::rgb(0, 0, 255);
        apply_effects(
            &mut img,
            &[
                effect(NormalizedRect::new(0.0, 0.0, 0.6, 1.0), EffectKind::solid_fill(red)),
                effect(NormalizedRect::new(0.4, 0.0, 0.6, 1.0), EffectKind::solid_fill(blue)),
            ],
        );
        assert_eq!(img.pixel(0, 0), red);
        assert_eq!(img.pixel(5, 0), blue);
        assert_eq!(img.pixel(9, 9), blue);
    }

    #[test]
    fn test_mosaic_block_size_formula() {
        let rect = PixelRect::new(0, 0, 400, 200);
        assert_eq!(mosaic_block_size(rect, 0.0), 6);
        assert_eq!(mosaic_block_size(rect, 1.0), 20);
        assert_eq!(mosaic_block_size(PixelRect::new(0, 0, 3, 3), 0.0), 1);
    }

    #[test]
    fn test_soften_radius_scale() {
        assert_eq!(soften_radius(0.0), 0);
        assert_eq!(soften_radius(0.5), 20);
        assert_eq!(soften_radius(1.0), 40);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::bitmap::Rgba;
    use crate::effects::EffectId;
    use crate::geometry::NormalizedRect;
    use proptest::prelude::*;

    proptest! {
        /// Property: solid fill touches exactly the mapped pixel rectangle.
        #[test]
        fn prop_solid_fill_containment(
            w in 1u32..48, h in 1u32..48,
            x in 0.0f64..1.0, y in 0.0f64..1.0, rw in 0.0f64..1.0, rh in 0.0f64..1.0,
        ) {
            let mut before = Bitmap::filled(w, h, Rgba::BLACK);
            for py in 0..h {
                for px in 0..w {
                    before.set_pixel(px, py, Rgba::rgb(px as u8, py as u8, 7));
                }
            }
            let mut after = before.clone();
            let fill = Rgba::rgb(250, 1, 2);
            let rect = NormalizedRect::new(x, y, rw, rh);
            let e = RegionEffect::new(EffectId(0), rect, EffectKind::solid_fill(fill));
            apply_effects(&mut after, &[e]);

            let rect = e.rect().to_pixels(before.size());
            for py in 0..h {
                for px in 0..w {
                    if rect.contains_point(px, py) {
                        prop_assert_eq!(after.pixel(px, py), fill);
                    } else {
                        prop_assert_eq!(after.pixel(px, py), before.pixel(px, py));
                    }
                }
            }
        }
    }
}
