//! Block-average pixelation.
//!
//! Colour is averaged premultiplied by alpha, like the soften blur.

use super::blur::{premultiply, unpremultiply};
use crate::bitmap::Rgba;

/// Pixelate an RGBA8 buffer of `width x height` in place.
///
/// Blocks are `block x block` pixels anchored at the buffer's top-left
/// corner; blocks on the right and bottom edges are truncated. Each block
/// is filled with the rounded alpha-weighted mean of its pixels.
pub fn pixelate_rgba8(pixels: &mut [u8], width: u32, height: u32, block: u32) {
    let (w, h) = (width as usize, height as usize);
    if block <= 1 || pixels.len() != w * h * 4 {
        return;
    }
    let block = block as usize;

    for by in (0..h).step_by(block) {
        let y1 = (by + block).min(h);
        for bx in (0..w).step_by(block) {
            let x1 = (bx + block).min(w);

            let mut sum = [0u64; 4];
            for y in by..y1 {
                for x in bx..x1 {
                    let idx = (y * w + x) * 4;
                    let px = premultiply(Rgba::from_slice(&pixels[idx..idx + 4]));
                    for (s, c) in sum.iter_mut().zip(px) {
                        *s += u64::from(c);
                    }
                }
            }
            let count = ((y1 - by) * (x1 - bx)) as u64;
            let mean = unpremultiply(sum.map(|s| ((s + count / 2) / count) as u32));

            for y in by..y1 {
                for x in bx..x1 {
                    let idx = (y * w + x) * 4;
                    pixels[idx..idx + 4].copy_from_slice(&mean);
                }
            }
        }
    }
}
