use serde::Serialize;
use thiserror::Error;

/// Output formats the server knows how to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Tiff,
    Ico,
}

// Fixed MIME -> format table. Adding a format means adding a row here
// (plus its codec feature in Cargo.toml), not another branch.
const MIME_FORMATS: &[(&str, OutputFormat)] = &[
    ("image/jpeg", OutputFormat::Jpeg),
    ("image/png", OutputFormat::Png),
    ("image/tiff", OutputFormat::Tiff),
    ("image/x-icon", OutputFormat::Ico),
];

/// Filename extensions accepted for uploads. Extension-based only; decode
/// can still fail later for content that does not match its name.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "ico"];

impl OutputFormat {
    /// Look up a format by its MIME type string, case-insensitively.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.to_ascii_lowercase();
        MIME_FORMATS
            .iter()
            .find(|(candidate, _)| *candidate == mime)
            .map(|(_, format)| *format)
    }

    /// Canonical MIME type for this format.
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Tiff => "image/tiff",
            OutputFormat::Ico => "image/x-icon",
        }
    }

    /// Extension used in the suggested download filename.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Ico => "ico",
        }
    }
}

/// Case-insensitive check of the upload's filename against the allow-list.
pub fn has_allowed_extension(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// JSON body for every 4xx/5xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
