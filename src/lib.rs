//! # pdf-raster
//!
//! An HTTP service that renders one page of an uploaded PDF to JPEG.
//!
//! A client posts a document to `POST /convert` as `multipart/form-data`,
//! optionally naming a page and a JPEG quality, and receives the rendered page
//! as `image/jpeg`. Pages are rasterized at 200 DPI by the poppler tools.
//!
//! ## Features
//!
//! - **Bounded concurrency**: At most N conversions run at once, the rest queue
//! - **No leftover files**: Uploads and rendered pages live in temporary files
//!   that are removed on every exit path, including client disconnects
//! - **Streaming responses**: The encoded page is streamed from disk
//! - **Pluggable renderer**: Any [`engine::Rasterizer`] can back the service
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`engine`] - Rasterizer trait and the poppler backend
//! - [`scratch`] - Temporary artifacts and the response body stream
//! - [`limiter`] - Conversion slots
//! - [`convert`] - Validation, JPEG encoding and the conversion service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use pdf_raster::{create_router, ConversionService, PopplerRasterizer, RouterConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = Arc::new(ConversionService::new(PopplerRasterizer::new()));
//!     let router = create_router(service, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod limiter;
pub mod scratch;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use convert::{
    allowed_file, clamp_quality, validate_page, validate_upload, ConversionRequest,
    ConversionService, ConvertedPage, JpegPageEncoder, UploadedFile, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use engine::{Backend, PopplerRasterizer, RasterOptions, Rasterizer, DEFAULT_DPI};
pub use error::{ConvertError, ValidationError};
pub use limiter::{ConcurrencyLimiter, ConversionSlot, DEFAULT_MAX_CONCURRENT_CONVERSIONS};
pub use scratch::{ArtifactKind, ArtifactStream, ScratchSpace, TempArtifact};
pub use server::{
    convert_handler, create_router, health_handler, ApiError, AppState, ConvertQueryParams,
    ErrorResponse, HealthResponse, RouterConfig,
};
