//! Document-to-JPEG conversion.
//!
//! This module holds everything between the HTTP handler and the rasterization
//! backend:
//!
//! - [`validate_upload`]: cheap checks on the upload before any work starts
//! - [`ConversionRequest`] / [`ConvertedPage`]: the per-request input and output
//! - [`JpegPageEncoder`]: encodes rendered pages at a clamped quality
//! - [`ConversionService`]: admission, scratch files, rasterization and encoding
//!
//! # Example
//!
//! ```
//! use pdf_raster::convert::{allowed_file, clamp_quality};
//!
//! assert!(allowed_file("Invoice.PDF"));
//! assert!(!allowed_file("notes.txt"));
//! assert_eq!(clamp_quality(200), 95);
//! ```

mod encoder;
mod request;
mod service;
mod validate;

pub use encoder::{
    clamp_quality, JpegPageEncoder, DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use request::{ConversionRequest, ConvertedPage, DEFAULT_PAGE};
pub use service::ConversionService;
pub use validate::{
    allowed_file, validate_page, validate_upload, UploadedFile, ALLOWED_EXTENSIONS, FILE_FIELD,
};
