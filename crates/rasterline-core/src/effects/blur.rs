//! Gaussian soften of one pixel rectangle.
//!
//! Only the rectangle is produced. The horizontal pass covers the rows of a
//! window that extends `radius` pixels past the rectangle (clipped to the
//! image), restricted to the rectangle's columns; the vertical pass then
//! covers the rectangle's rows alone. Past the window edge the nearest
//! window pixel is repeated.
//!
//! Colour is averaged premultiplied by alpha, so transparent neighbours
//! lower the result's alpha but never darken its colour. Taps are Q16 fixed
//! point and sum to exactly one, which keeps flat areas bit-identical.

use crate::bitmap::{Bitmap, Rgba, CHANNELS};
use crate::geometry::PixelRect;

const Q16_ONE: u32 = 1 << 16;

/// A pixel with colour premultiplied by alpha.
///
/// Every channel is on a 0..=255*255 scale: colour holds `c * a`, alpha
/// holds `a * 255`, so `c = colour * 255 / alpha`.
type Premultiplied = [u32; 4];

/// Blur the pixels of `rect` with a Gaussian of `radius` (sigma
/// `radius / 2`) and return them as RGBA8 rows of `rect.width` pixels.
///
/// `image` is only read. A zero radius returns the rectangle unchanged.
pub fn blur_region(image: &Bitmap, rect: PixelRect, radius: u32) -> Vec<u8> {
    if radius == 0 || rect.is_empty() {
        return image.sub_image(rect).pixels;
    }
    let window = rect.expanded_within(radius, &image.bounds());
    let taps = gaussian_taps(radius);
    let cols = rect.width as usize;

    let (left, right) = (i64::from(window.x), i64::from(window.right()) - 1);
    let clamp_x = |x: i64| x.clamp(left, right) as u32;
    let mut rows: Vec<Premultiplied> = Vec::with_capacity(window.height as usize * cols);
    for y in window.y..window.bottom() {
        for x in rect.x..rect.right() {
            let samples =
                tap_offsets(x, radius).map(|sx| premultiply(image.pixel(clamp_x(sx), y)));
            rows.push(weighted_sum(&taps, samples));
        }
    }

    let (top, bottom) = (i64::from(window.y), i64::from(window.bottom()) - 1);
    let clamp_row = |y: i64| (y.clamp(top, bottom) - top) as usize;
    let mut out = Vec::with_capacity(cols * rect.height as usize * CHANNELS);
    for y in rect.y..rect.bottom() {
        for col in 0..cols {
            let samples = tap_offsets(y, radius).map(|sy| rows[clamp_row(sy) * cols + col]);
            out.extend_from_slice(&unpremultiply(weighted_sum(&taps, samples)));
        }
    }
    out
}

/// Normalised taps for offsets `-radius..=radius`.
fn gaussian_taps(radius: u32) -> Vec<u32> {
    let sigma = (f64::from(radius) / 2.0).max(0.5);
    let two_sigma_sq = 2.0 * sigma * sigma;
    let falloff: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = f64::from(i) - f64::from(radius);
            (-d * d / two_sigma_sq).exp()
        })
        .collect();
    let total: f64 = falloff.iter().sum();
    let mut taps: Vec<u32> = falloff
        .iter()
        .map(|w| (w / total * f64::from(Q16_ONE)).round() as u32)
        .collect();

    // The centre tap absorbs rounding drift
    let sum: u32 = taps.iter().sum();
    let centre = radius as usize;
    taps[centre] = (taps[centre] + Q16_ONE).saturating_sub(sum);
    taps
}

fn tap_offsets(centre: u32, radius: u32) -> impl Iterator<Item = i64> {
    let centre = i64::from(centre);
    let radius = i64::from(radius);
    (centre - radius)..=(centre + radius)
}

fn weighted_sum(taps: &[u32], samples: impl Iterator<Item = Premultiplied>) -> Premultiplied {
    let mut acc = [0u64; 4];
    for (&tap, sample) in taps.iter().zip(samples) {
        for (a, s) in acc.iter_mut().zip(sample) {
            *a += u64::from(tap) * u64::from(s);
        }
    }
    acc.map(|a| ((a + u64::from(Q16_ONE / 2)) >> 16) as u32)
}

pub(crate) fn premultiply(px: Rgba) -> Premultiplied {
    let a = u32::from(px.a);
    [u32::from(px.r) * a, u32::from(px.g) * a, u32::from(px.b) * a, a * 255]
}

pub(crate) fn unpremultiply(px: Premultiplied) -> [u8; 4] {
    let alpha = px[3];
    if alpha == 0 {
        return [0; 4];
    }
    let channel = |c: u32| ((c * 255 + alpha / 2) / alpha).min(255) as u8;
    [
        channel(px[0]),
        channel(px[1]),
        channel(px[2]),
        ((alpha + 127) / 255).min(255) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels(bytes: &[u8]) -> Vec<Rgba> {
        bytes.chunks_exact(CHANNELS).map(Rgba::from_slice).collect()
    }

    #[test]
    fn test_zero_radius_copies_rect() {
        let mut img = Bitmap::filled(6, 6, Rgba::BLACK);
        img.set_pixel(2, 3, Rgba::WHITE);
        let rect = PixelRect::new(1, 2, 3, 2);
        assert_eq!(blur_region(&img, rect, 0), img.sub_image(rect).pixels);
    }

    #[test]
    fn test_flat_region_is_unchanged() {
        let color = Rgba::new(10, 120, 240, 200);
        let img = Bitmap::filled(30, 20, color);
        let out = blur_region(&img, PixelRect::new(5, 5, 10, 8), 6);
        assert_eq!(out.len(), 10 * 8 * CHANNELS);
        assert!(pixels(&out).iter().all(|&px| px == color));
    }

    #[test]
    fn test_transparent_neighbours_keep_colour() {
        let mut img = Bitmap::filled(40, 10, Rgba::TRANSPARENT);
        img.fill_rect(PixelRect::new(20, 0, 20, 10), Rgba::rgb(200, 40, 90));
        let out = pixels(&blur_region(&img, PixelRect::new(20, 0, 4, 10), 4));
        let seam = out[5 * 4];
        assert_eq!((seam.r, seam.g, seam.b), (200, 40, 90));
        assert!(seam.a < 255 && seam.a > 0, "{seam:?}");
    }

    #[test]
    fn test_fully_transparent_stays_zero() {
        let img = Bitmap::filled(12, 12, Rgba::new(90, 90, 90, 0));
        let out = blur_region(&img, PixelRect::new(2, 2, 8, 8), 3);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reads_beyond_rect_but_not_beyond_radius() {
        // A white column 3 px left of the rect reaches it with radius 4
        // but not with radius 2.
        let mut img = Bitmap::filled(30, 5, Rgba::BLACK);
        img.fill_rect(PixelRect::new(7, 0, 1, 5), Rgba::WHITE);
        let rect = PixelRect::new(10, 0, 5, 5);
        assert!(pixels(&blur_region(&img, rect, 4))[0].r > 0);
        assert_eq!(pixels(&blur_region(&img, rect, 2))[0], Rgba::BLACK);
    }

    #[test]
    fn test_taps_are_symmetric_and_normalised() {
        for radius in [1, 3, 40] {
            let taps = gaussian_taps(radius);
            assert_eq!(taps.len(), 2 * radius as usize + 1);
            assert_eq!(taps.iter().sum::<u32>(), Q16_ONE);
            assert!(taps.iter().eq(taps.iter().rev()));
        }
    }

    #[test]
    fn test_premultiply_round_trips_opaque_and_translucent() {
        for px in [Rgba::rgb(1, 128, 255), Rgba::new(200, 17, 64, 77)] {
            let back = unpremultiply(premultiply(px));
            assert_eq!(Rgba::from_slice(&back), px);
        }
    }
}
