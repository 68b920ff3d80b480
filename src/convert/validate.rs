//! Upload checks performed before any expensive work.

use bytes::Bytes;

use crate::error::ValidationError;

/// Name of the multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

/// Accepted filename extensions (lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

/// The `file` part of a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename declared by the client, if any
    pub filename: Option<String>,

    /// Raw file contents
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(filename: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename,
            data: data.into(),
        }
    }
}

/// Check that an upload is present, named, and has an allowed extension.
///
/// Checks run in that order and the first failure is returned.
pub fn validate_upload(file: Option<&UploadedFile>) -> Result<(), ValidationError> {
    let file = file.ok_or(ValidationError::MissingFilePart)?;

    let filename = file.filename.as_deref().unwrap_or("");
    if filename.is_empty() {
        return Err(ValidationError::NoFileSelected);
    }

    if !allowed_file(filename) {
        return Err(ValidationError::UnsupportedFileType {
            filename: filename.to_string(),
        });
    }

    Ok(())
}

/// Whether `filename` ends in an allowed extension (case-insensitive).
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Convert a requested page index into a 1-based page number.
///
/// Pages past `u32::MAX` saturate; no document has that many, so the
/// conversion later fails with an empty result like any out-of-range page.
pub fn validate_page(page: i64) -> Result<u32, ValidationError> {
    if page < 1 {
        return Err(ValidationError::InvalidPage { page });
    }
    Ok(u32::try_from(page).unwrap_or(u32::MAX))
}
