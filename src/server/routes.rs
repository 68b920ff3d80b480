//! Router configuration for the conversion server.
//!
//! This module defines the HTTP routes and applies middleware for body size
//! limits, CORS and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health    GET   - Health check
//! /convert   POST  - Rasterize one page of an uploaded PDF to JPEG
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pdf_raster::convert::ConversionService;
//! use pdf_raster::engine::PopplerRasterizer;
//! use pdf_raster::server::{create_router, RouterConfig};
//! use std::sync::Arc;
//!
//! let service = Arc::new(ConversionService::new(PopplerRasterizer::new()));
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    convert_handler, health_handler, AppState, DEFAULT_CACHE_MAX_AGE, PAGE_HEADER,
    PROCESSING_TIME_HEADER, QUALITY_HEADER,
};
use crate::convert::{ConversionService, DEFAULT_JPEG_QUALITY};
use crate::engine::Rasterizer;

/// Default maximum request body size (16 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Maximum request body size in bytes
    pub max_upload_size: usize,

    /// JPEG quality used when a request omits `quality`
    pub default_quality: u8,
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 24 hours (86400 seconds)
    /// - Tracing is enabled
    /// - Request bodies are limited to 16 MiB
    /// - Requests without `quality` are encoded at 85
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            enable_tracing: true,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            default_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the maximum request body size in bytes.
    pub fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }

    /// Set the JPEG quality used when a request omits `quality`.
    pub fn with_default_quality(mut self, quality: u8) -> Self {
        self.default_quality = quality;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - The health and conversion routes
/// - Body size limits (requests above the limit get 413)
/// - CORS configuration
/// - Request tracing (optional)
///
/// # Arguments
///
/// * `service` - The shared conversion service
/// * `config` - Router configuration
pub fn create_router<R>(service: Arc<ConversionService<R>>, config: RouterConfig) -> Router
where
    R: Rasterizer + 'static,
{
    let app_state = AppState::with_cache_max_age(service, config.cache_max_age)
        .with_default_quality(config.default_quality);
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/convert", post(convert_handler::<R>))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.max_upload_size))
        .layer(RequestBodyLimitLayer::new(config.max_upload_size))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .expose_headers([
            HeaderName::from_static(PROCESSING_TIME_HEADER),
            HeaderName::from_static(PAGE_HEADER),
            HeaderName::from_static(QUALITY_HEADER),
        ])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
