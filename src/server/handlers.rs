//! HTTP request handlers for the conversion API.
//!
//! # Endpoints
//!
//! - `POST /convert` - Rasterize one page of an uploaded PDF to JPEG
//! - `GET /health` - Health check endpoint

use std::error::Error as StdError;
use std::num::IntErrorKind;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use http_body_util::LengthLimitError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::convert::{
    validate_page, validate_upload, ConversionRequest, ConversionService, UploadedFile,
    DEFAULT_JPEG_QUALITY, DEFAULT_PAGE, FILE_FIELD,
};
use crate::engine::Rasterizer;
use crate::error::{ConvertError, ValidationError};
use crate::scratch::ArtifactStream;

/// Header carrying the conversion time in seconds.
pub const PROCESSING_TIME_HEADER: &str = "x-processing-time";

/// Header carrying the rendered page number.
pub const PAGE_HEADER: &str = "x-page";

/// Header carrying the JPEG quality actually used.
pub const QUALITY_HEADER: &str = "x-quality";

/// Default Cache-Control max-age for converted pages (24 hours).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 86400;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the conversion service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<R: Rasterizer> {
    /// The service that performs conversions
    pub service: Arc<ConversionService<R>>,

    /// Cache-Control max-age in seconds for successful conversions
    pub cache_max_age: u32,

    /// JPEG quality used when the request does not name one
    pub default_quality: u8,
}

impl<R: Rasterizer> AppState<R> {
    /// Create a new application state with the default cache max-age.
    pub fn new(service: Arc<ConversionService<R>>) -> Self {
        Self::with_cache_max_age(service, DEFAULT_CACHE_MAX_AGE)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(service: Arc<ConversionService<R>>, cache_max_age: u32) -> Self {
        Self {
            service,
            cache_max_age,
            default_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Set the quality used when the request omits `quality`.
    pub fn with_default_quality(mut self, quality: u8) -> Self {
        self.default_quality = quality;
        self
    }
}

impl<R: Rasterizer> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache_max_age: self.cache_max_age,
            default_quality: self.default_quality,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for conversion requests.
///
/// Values that are not integers fall back to their defaults. Integers too
/// large for `i64` saturate, so they are still clamped or rejected downstream.
#[derive(Debug, Default, Deserialize)]
pub struct ConvertQueryParams {
    /// 1-based page to render (default: 1)
    #[serde(default)]
    pub page: Option<String>,

    /// JPEG quality, clamped to 1-95 (default: the server's configured quality)
    #[serde(default)]
    pub quality: Option<String>,
}

impl ConvertQueryParams {
    /// Build from raw query pairs. The first occurrence of a repeated key wins.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "page" => &mut params.page,
                "quality" => &mut params.quality,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }

    pub fn page(&self) -> i64 {
        parse_int(self.page.as_deref()).unwrap_or(i64::from(DEFAULT_PAGE))
    }

    pub fn quality(&self) -> i64 {
        self.quality_or(DEFAULT_JPEG_QUALITY)
    }

    /// Requested quality, or `default` when absent or not an integer.
    pub fn quality_or(&self, default: u8) -> i64 {
        parse_int(self.quality.as_deref()).unwrap_or(i64::from(default))
    }
}

fn parse_int(value: Option<&str>) -> Option<i64> {
    match value?.trim().parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Every way a conversion request can fail at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Problem with the client's input (400)
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Upload exceeds the body size limit (413)
    #[error("File too large")]
    PayloadTooLarge,

    /// Failure after the request was accepted (500, or 503 when overloaded)
    #[error(transparent)]
    Conversion(#[from] ConvertError),
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE || exceeded_body_limit(&err) {
            ApiError::PayloadTooLarge
        } else {
            ApiError::Validation(ValidationError::MalformedUpload(err.body_text()))
        }
    }
}

/// Whether the body limit tripped while the multipart stream was being read.
///
/// Bodies without a `Content-Length` hit the limit mid-stream, and the
/// resulting error arrives wrapped in the multipart parser's stream error.
fn exceeded_body_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() || e.to_string().contains("length limit exceeded") {
            return true;
        }
        current = e.source();
    }
    false
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Conversion(ConvertError::Overloaded { .. } | ConvertError::LimiterClosed) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Conversion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the response body.
    pub fn message(&self) -> String {
        match self {
            ApiError::Conversion(
                err @ (ConvertError::Engine { .. }
                | ConvertError::EmptyResult { .. }
                | ConvertError::Encode { .. }
                | ConvertError::Scratch(_)),
            ) => format!("Conversion failed: {}", err),
            other => other.to_string(),
        }
    }
}

/// Convert ApiError to HTTP response.
///
/// - 4xx errors are logged at WARN level (client errors)
/// - 5xx errors are logged at ERROR level (server errors)
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            error!(status = status.as_u16(), "Error during conversion: {}", message);
        } else {
            warn!(status = status.as_u16(), "Rejected request: {}", message);
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body `{"status": "healthy"}`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Handle conversion requests.
///
/// # Endpoint
///
/// `POST /convert` with a `multipart/form-data` body containing a `file` field
///
/// # Query Parameters
///
/// - `page`: 1-based page to render (default: 1)
/// - `quality`: JPEG quality, clamped to 1-95 (default: 85)
///
/// When a key is repeated, its first value is used.
///
/// # Response
///
/// - `200 OK`: JPEG image with `Content-Type: image/jpeg`
/// - `400 Bad Request`: Missing file, empty filename, non-PDF, or invalid page
/// - `413 Payload Too Large`: Upload exceeds the configured limit
/// - `500 Internal Server Error`: Rasterization or encoding failed
/// - `503 Service Unavailable`: No conversion slot within the admission timeout
///
/// # Headers
///
/// - `Content-Type: image/jpeg`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Processing-Time: <seconds>`
/// - `X-Page`, `X-Quality`
pub async fn convert_handler<R: Rasterizer + 'static>(
    State(state): State<AppState<R>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = state.service.next_request_id();
    let span = info_span!("convert", request_id);

    async move {
        let query = match query {
            Ok(Query(pairs)) => ConvertQueryParams::from_pairs(pairs),
            Err(rejection) => {
                debug!("Ignoring unreadable query string: {}", rejection.body_text());
                ConvertQueryParams::default()
            }
        };

        match handle_convert(&state, request_id, &query, multipart).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
    .instrument(span)
    .await
}

async fn handle_convert<R: Rasterizer + 'static>(
    state: &AppState<R>,
    request_id: u64,
    query: &ConvertQueryParams,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    info!("Starting PDF conversion");

    // Validating
    let upload = match multipart {
        Ok(multipart) => read_upload(multipart).await?,
        Err(rejection) => {
            debug!("Request body is not multipart: {}", rejection.body_text());
            None
        }
    };
    validate_upload(upload.as_ref())?;
    let page = validate_page(query.page())?;
    let upload = upload.ok_or(ValidationError::MissingFilePart)?;

    // Admitting through Encoding
    let request = ConversionRequest::new(request_id, upload.data)
        .with_page(page)
        .with_quality(query.quality_or(state.default_quality));
    let converted = state.service.convert_detached(request).await?;

    // Streaming; the artifact is released when the body is dropped
    let stream = ArtifactStream::open(converted.artifact)
        .await
        .map_err(ConvertError::from)?;
    let headers = [
        (header::CONTENT_TYPE, "image/jpeg".to_string()),
        (header::CONTENT_LENGTH, stream.len().to_string()),
        (
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        ),
        (
            HeaderName::from_static(PROCESSING_TIME_HEADER),
            converted.elapsed.as_secs_f64().to_string(),
        ),
        (HeaderName::from_static(PAGE_HEADER), converted.page.to_string()),
        (
            HeaderName::from_static(QUALITY_HEADER),
            converted.quality.to_string(),
        ),
    ];

    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}

/// Pull the `file` part out of a multipart body.
///
/// Only a part that declares a `filename` counts as a file upload; a plain
/// form field named `file` is skipped.
async fn read_upload(mut multipart: Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            debug!("Skipping form field named {} without a filename", FILE_FIELD);
            continue;
        };
        let data = field.bytes().await?;
        return Ok(Some(UploadedFile::new(Some(filename), data)));
    }

    Ok(None)
}

// =============================================================================
// Tests
// =============================================================================
