//! Quarter-turn rotation and axis flips.
//!
//! A [`GeometricTransform`] is a rotation by a multiple of 90° clockwise
//! followed by optional horizontal and vertical mirrors in the rotated
//! space. Pixel application is a pure coordinate remap, so no resampling
//! happens and the operation is lossless. Arbitrary-angle rotation is not
//! supported.
//!
//! For a source pixel `(x, y)` of a `W x H` image the rotation step maps:
//!
//! ```text
//!   0°: (x, y)              -> W x H
//!  90°: (H - 1 - y, x)      -> H x W
//! 180°: (W - 1 - x, H - 1 - y)
//! 270°: (y, W - 1 - x)      -> H x W
//! ```

use serde::{Deserialize, Serialize};

use crate::bitmap::{Bitmap, CHANNELS};
use crate::decode::Orientation;
use crate::geometry::ImageSize;

/// Clockwise rotation by a multiple of 90°.
///
/// Serialized as degrees (`0`, `90`, `180`, `270`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Normalize any multiple of 90 (negative allowed) to a rotation.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(match degrees.rem_euclid(360) {
            0 => Rotation::Deg0,
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            _ => Rotation::Deg270,
        })
    }

    pub fn cw(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    pub fn ccw(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg270,
            Rotation::Deg90 => Rotation::Deg0,
            Rotation::Deg180 => Rotation::Deg90,
            Rotation::Deg270 => Rotation::Deg180,
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            Rotation::Deg90 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg90,
            other => other,
        }
    }

    /// True for 90° and 270°.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl From<Rotation> for u32 {
    fn from(r: Rotation) -> u32 {
        r.degrees()
    }
}

impl TryFrom<u32> for Rotation {
    type Error = String;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees as i64)
            .ok_or_else(|| format!("rotation must be a multiple of 90 degrees, got {degrees}"))
    }
}

/// Rotation plus independent horizontal/vertical mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometricTransform {
    pub rotation: Rotation,
    /// Mirror left/right after rotating.
    pub flip_horizontal: bool,
    /// Mirror top/bottom after rotating.
    pub flip_vertical: bool,
}

impl GeometricTransform {
    pub const IDENTITY: GeometricTransform = GeometricTransform {
        rotation: Rotation::Deg0,
        flip_horizontal: false,
        flip_vertical: false,
    };

    pub fn new(rotation: Rotation, flip_horizontal: bool, flip_vertical: bool) -> Self {
        Self {
            rotation,
            flip_horizontal,
            flip_vertical,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn swaps_width_and_height(&self) -> bool {
        self.rotation.is_quarter_turn()
    }

    /// Size of a bitmap of `size` after this transform.
    pub fn transformed_size(&self, size: ImageSize) -> ImageSize {
        if self.swaps_width_and_height() {
            size.swapped()
        } else {
            size
        }
    }

    /// Rotate the visible result a quarter turn clockwise.
    ///
    /// A mirror followed by a quarter turn equals the opposite mirror before
    /// it, so the flip flags trade places.
    pub fn rotate_cw(&mut self) {
        self.rotation = self.rotation.cw();
        self.swap_flips();
    }

    /// Rotate the visible result a quarter turn counter-clockwise.
    pub fn rotate_ccw(&mut self) {
        self.rotation = self.rotation.ccw();
        self.swap_flips();
    }

    /// Mirror the visible result left/right.
    pub fn toggle_flip_horizontal(&mut self) {
        self.flip_horizontal = !self.flip_horizontal;
    }

    /// Mirror the visible result top/bottom.
    pub fn toggle_flip_vertical(&mut self) {
        self.flip_vertical = !self.flip_vertical;
    }

    pub fn reset(&mut self) {
        *self = Self::IDENTITY;
    }

    /// The transform that undoes this one.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        let (h, v) = if rotation.is_quarter_turn() {
            (self.flip_vertical, self.flip_horizontal)
        } else {
            (self.flip_horizontal, self.flip_vertical)
        };
        Self::new(rotation, h, v)
    }

    /// The transform that displays an image stored with EXIF `orientation`
    /// upright.
    pub fn from_exif_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Normal => Self::IDENTITY,
            Orientation::FlipHorizontal => Self::new(Rotation::Deg0, true, false),
            Orientation::Rotate180 => Self::new(Rotation::Deg180, false, false),
            Orientation::FlipVertical => Self::new(Rotation::Deg0, false, true),
            Orientation::Transpose => Self::new(Rotation::Deg90, true, false),
            Orientation::Rotate90CW => Self::new(Rotation::Deg90, false, false),
            Orientation::Transverse => Self::new(Rotation::Deg270, true, false),
            Orientation::Rotate270CW => Self::new(Rotation::Deg270, false, false),
        }
    }

    /// Every distinct transform (four rotations times four flip combinations).
    pub fn all() -> impl Iterator<Item = GeometricTransform> {
        [
            Rotation::Deg0,
            Rotation::Deg90,
            Rotation::Deg180,
            Rotation::Deg270,
        ]
        .into_iter()
        .flat_map(|r| {
            [(false, false), (true, false), (false, true), (true, true)]
                .into_iter()
                .map(move |(h, v)| GeometricTransform::new(r, h, v))
        })
    }

    fn swap_flips(&mut self) {
        std::mem::swap(&mut self.flip_horizontal, &mut self.flip_vertical);
    }

    /// Destination of source pixel `(x, y)` in an image of `size`.
    #[inline]
    fn map_pixel(&self, x: u32, y: u32, size: ImageSize) -> (u32, u32) {
        let (w, h) = (size.width, size.height);
        let (mut dx, mut dy) = match self.rotation {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (h - 1 - y, x),
            Rotation::Deg180 => (w - 1 - x, h - 1 - y),
            Rotation::Deg270 => (y, w - 1 - x),
        };
        let out = self.transformed_size(size);
        if self.flip_horizontal {
            dx = out.width - 1 - dx;
        }
        if self.flip_vertical {
            dy = out.height - 1 - dy;
        }
        (dx, dy)
    }
}

/// Apply a transform to a bitmap, producing a new bitmap.
///
/// # Arguments
///
/// * `image` - Source bitmap
/// * `transform` - Quarter-turn rotation followed by optional flips
///
/// # Returns
///
/// The transformed bitmap. The canvas has swapped dimensions for 90°/270°.
/// Every source pixel lands on exactly one destination pixel.
pub fn apply_transform(image: &Bitmap, transform: &GeometricTransform) -> Bitmap {
    // Fast path: identity returns a clone
    if transform.is_identity() || image.is_empty() {
        return image.clone();
    }

    let size = image.size();
    let out_size = transform.transformed_size(size);
    let mut output = vec![0u8; image.pixels.len()];

    for y in 0..size.height {
        for x in 0..size.width {
            let (dx, dy) = transform.map_pixel(x, y, size);
            let src = image.index(x, y);
            let dst = (dy as usize * out_size.width as usize + dx as usize) * CHANNELS;
            output[dst..dst + CHANNELS].copy_from_slice(&image.pixels[src..src + CHANNELS]);
        }
    }

    Bitmap::new(out_size.width, out_size.height, output)
}
