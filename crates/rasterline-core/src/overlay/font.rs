//! Glyph rasterization for text overlays.

use font8x8::{UnicodeFonts, BASIC_FONTS};

/// Cell size of the built-in font, in font units.
const CELL: u32 = 8;

/// Largest line height the built-in font renders; larger requests are
/// drawn at this size.
pub const MAX_SIZE_PX: u32 = 1024;

/// Single-channel coverage mask of rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    /// Row-major coverage, 0 = empty, 255 = fully covered.
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            coverage: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.coverage[y as usize * self.width as usize + x as usize]
    }
}

/// Turns a string into a coverage mask at a given pixel size.
///
/// `size_px` is the line height. Lines are separated by `'\n'`.
pub trait GlyphRasterizer: Send + Sync {
    fn rasterize(&self, text: &str, size_px: u32) -> GlyphMask;
}

/// The built-in 8x8 bitmap font, scaled by whole multiples with
/// nearest-neighbour sampling.
///
/// Characters outside the basic Latin set render as `'?'`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapFont;

impl BitmapFont {
    /// Integer scale for a requested line height, at most
    /// `MAX_SIZE_PX / 8`.
    pub fn scale_for(size_px: u32) -> u32 {
        ((size_px.min(MAX_SIZE_PX) + CELL / 2) / CELL).max(1)
    }

    fn glyph(ch: char) -> [u8; 8] {
        BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8])
    }
}

impl GlyphRasterizer for BitmapFont {
    fn rasterize(&self, text: &str, size_px: u32) -> GlyphMask {
        let lines: Vec<&str> = text.lines().collect();
        let columns = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        if columns == 0 {
            return GlyphMask::empty();
        }

        let scale = Self::scale_for(size_px);
        let cell = CELL * scale;
        // Text too long to address in u32 pixels renders nothing
        let extent = |n: usize| u32::try_from(n).ok().and_then(|n| n.checked_mul(cell));
        let (Some(width), Some(height)) = (extent(columns), extent(lines.len())) else {
            return GlyphMask::empty();
        };
        let stride = width as usize;
        let mut coverage = vec![0u8; stride * height as usize];

        for (line_idx, line) in lines.iter().enumerate() {
            let top = line_idx as u32 * cell;
            for (col_idx, ch) in line.chars().enumerate() {
                let left = col_idx as u32 * cell;
                for (row, bits) in Self::glyph(ch).iter().enumerate() {
                    for col in 0..CELL {
                        // Bit 0 is the leftmost column
                        if (bits >> col) & 1 == 0 {
                            continue;
                        }
                        let x0 = left + col * scale;
                        let y0 = top + row as u32 * scale;
                        for dy in 0..scale {
                            let start = (y0 + dy) as usize * stride + x0 as usize;
                            coverage[start..start + scale as usize].fill(255);
                        }
                    }
                }
            }
        }

        GlyphMask {
            width,
            height,
            coverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_rounds_to_cells() {
        assert_eq!(BitmapFont::scale_for(1), 1);
        assert_eq!(BitmapFont::scale_for(8), 1);
        assert_eq!(BitmapFont::scale_for(16), 2);
        assert_eq!(BitmapFont::scale_for(20), 3);
    }

    #[test]
    fn test_huge_size_is_capped() {
        assert_eq!(BitmapFont::scale_for(u32::MAX), MAX_SIZE_PX / CELL);
        let mask = BitmapFont.rasterize("IMG_20240101_123456", 20_000);
        assert_eq!((mask.width, mask.height), (19 * MAX_SIZE_PX, MAX_SIZE_PX));
        assert_eq!(mask.get(mask.width - 1, mask.height - 1), 0);
    }

    #[test]
    fn test_mask_dimensions() {
        let mask = BitmapFont.rasterize("abc", 16);
        assert_eq!((mask.width, mask.height), (48, 16));
        assert_eq!(mask.coverage.len(), 48 * 16);

        let two_lines = BitmapFont.rasterize("ab\nwxyz", 8);
        assert_eq!((two_lines.width, two_lines.height), (32, 16));
    }

    #[test]
    fn test_empty_text_has_no_mask() {
        assert!(BitmapFont.rasterize("", 24).is_empty());
    }

    #[test]
    fn test_glyph_has_coverage_and_space_does_not() {
        let a = BitmapFont.rasterize("A", 8);
        assert!(a.coverage.iter().any(|&c| c == 255));
        let space = BitmapFont.rasterize(" ", 8);
        assert!(space.coverage.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_unknown_char_falls_back() {
        let unknown = BitmapFont.rasterize("\u{2603}", 8);
        let question = BitmapFont.rasterize("?", 8);
        assert_eq!(unknown, question);
    }
}
