//! Format-sniffing decode with EXIF orientation handling.
//!
//! Codec work is delegated to the `image` crate. The EXIF orientation tag is
//! read with `kamadak-exif` and applied through the same lossless
//! [`apply_transform`] the pipeline uses, so decoded bitmaps are always
//! upright.

use std::io::Cursor;
use std::path::Path;

use exif::{In, Reader, Tag};
use image::ImageReader;

use super::{DecodeError, Orientation};
use crate::bitmap::Bitmap;
use crate::transform::{apply_transform, GeometricTransform};

/// Decode an encoded image (any format enabled on the `image` crate),
/// applying EXIF orientation correction.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the format cannot be determined.
/// Returns `DecodeError::CorruptedFile` if the data is corrupted.
pub fn decode_bytes(bytes: &[u8]) -> Result<Bitmap, DecodeError> {
    let orientation = extract_orientation(bytes);
    let bitmap = decode_pixels(bytes)?;
    Ok(orient(bitmap, orientation))
}

/// Decode as stored, without EXIF orientation.
fn decode_pixels(bytes: &[u8]) -> Result<Bitmap, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }

    let img = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    Ok(Bitmap::from_rgba_image(img.into_rgba8()))
}

/// Read and decode a file from disk.
pub fn decode_file(path: &Path) -> Result<Bitmap, DecodeError> {
    let bytes = std::fs::read(path).map_err(|e| DecodeError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    decode_bytes(&bytes)
}

/// EXIF orientation of encoded bytes; `Orientation::Normal` when there is
/// no readable tag.
fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

fn orient(bitmap: Bitmap, orientation: Orientation) -> Bitmap {
    let transform = GeometricTransform::from_exif_orientation(orientation);
    if transform.is_identity() {
        return bitmap;
    }
    apply_transform(&bitmap, &transform)
}
