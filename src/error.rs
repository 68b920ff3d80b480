use std::time::Duration;

use thiserror::Error;

/// Client-side problems with a conversion request.
///
/// These are detected before any scratch file is created or any conversion
/// slot is taken. The `Display` text is the message returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The multipart body has no `file` field
    #[error("No file part")]
    MissingFilePart,

    /// The `file` field carries an empty filename
    #[error("No file selected")]
    NoFileSelected,

    /// The filename extension is not in the whitelist
    #[error("Only PDF files are allowed")]
    UnsupportedFileType { filename: String },

    /// The requested page index is below 1
    #[error("Page must be a positive integer")]
    InvalidPage { page: i64 },

    /// The multipart body could not be parsed
    #[error("Invalid upload: {0}")]
    MalformedUpload(String),
}

/// Server-side failures while converting an admitted request.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The rasterization backend failed to decode or render the document
    #[error("{message}")]
    Engine { message: String },

    /// The backend succeeded but produced no page image
    #[error("No image produced for page {page}")]
    EmptyResult { page: u32 },

    /// Re-encoding the rendered page as JPEG failed
    #[error("Failed to encode JPEG: {message}")]
    Encode { message: String },

    /// Creating, writing or reading a scratch file failed
    #[error("Scratch file error: {0}")]
    Scratch(#[from] std::io::Error),

    /// No conversion slot became free within the admission timeout
    #[error("Server busy: no conversion slot became free within {}s", waited.as_secs_f64())]
    Overloaded { waited: Duration },

    /// The limiter was shut down while the request was waiting
    #[error("Conversion limiter is closed")]
    LimiterClosed,
}

impl ConvertError {
    /// Build an engine failure from any displayable error.
    pub fn engine(message: impl Into<String>) -> Self {
        ConvertError::Engine {
            message: message.into(),
        }
    }

    /// Build an encode failure from any displayable error.
    pub fn encode(message: impl Into<String>) -> Self {
        ConvertError::Encode {
            message: message.into(),
        }
    }
}
