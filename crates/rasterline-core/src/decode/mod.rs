//! Image decoding for the pipeline.
//!
//! This module provides functionality for:
//! - Decoding any raster format enabled on the `image` crate into a [`Bitmap`](crate::Bitmap)
//! - Reading EXIF orientation and returning upright bitmaps
//!
//! # Examples
//!
//! ```ignore
//! use rasterline_core::decode::decode_file;
//!
//! let image = decode_file(Path::new("photo.jpg"))?;
//! println!("Decoded {}x{} image", image.width, image.height);
//! ```

mod reader;
mod types;

pub use reader::{decode_bytes, decode_file};
pub use types::{DecodeError, Orientation};
