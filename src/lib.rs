//! Image Converter Library
//!
//! Decode an uploaded image and re-encode it into a requested output format
//! (JPEG, PNG, TIFF or ICO). The HTTP surface lives in the binary; this
//! library exposes the format lookup and the conversion pipeline.

pub mod converter;
pub mod types;

pub use converter::convert;
pub use types::{ConversionError, OutputFormat, ALLOWED_EXTENSIONS};
