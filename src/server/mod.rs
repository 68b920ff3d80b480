//! HTTP server layer.
//!
//! This module exposes the conversion service over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │          POST /convert?page=N&quality=Q     GET /health         │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (multipart, validation,  │  │ (body limit, CORS, tracing) │  │
//! │  │  streaming response)     │  │                             │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    convert_handler, health_handler, ApiError, AppState, ConvertQueryParams, ErrorResponse,
    HealthResponse, DEFAULT_CACHE_MAX_AGE, PAGE_HEADER, PROCESSING_TIME_HEADER, QUALITY_HEADER,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_SIZE};
