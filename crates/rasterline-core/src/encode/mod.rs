//! Image encoding for export.
//!
//! This module provides functionality for:
//! - Encoding bitmaps to JPEG with configurable quality
//! - Encoding bitmaps to PNG (alpha preserved)
//!
//! # Examples
//!
//! ```ignore
//! use rasterline_core::encode::{encode_bitmap, EncodeSettings};
//!
//! let bytes = encode_bitmap(&bitmap, &EncodeSettings::default())?;
//! println!("Encoded {} bytes", bytes.len());
//! ```

mod format;

pub use format::{encode_bitmap, EncodeError, EncodeSettings, OutputFormat, DEFAULT_QUALITY};
