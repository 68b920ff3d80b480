//! Configuration management for the conversion server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables (`PORT`, and the `RASTER_` prefix for the rest)
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use pdf_raster::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//!
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `PORT` - Server port (default: 8080)
//! - `RASTER_HOST` - Server bind address (default: 0.0.0.0)
//! - `RASTER_DPI` - Rendering resolution (default: 200)
//! - `RASTER_JPEG_QUALITY` - Quality when the request omits it (default: 85)
//! - `RASTER_MAX_CONCURRENT` - Simultaneous conversions (default: 10)
//! - `RASTER_ENGINE_THREADS` - Renderer processes per conversion (default: 2)
//! - `RASTER_BACKEND` - `cairo` or `ppm` (default: cairo)
//! - `RASTER_POPPLER_PATH` - Directory holding the poppler tools
//! - `RASTER_SCRATCH_DIR` - Directory for temporary files (default: OS temp dir)
//! - `RASTER_MAX_UPLOAD_SIZE` - Request body limit in bytes (default: 16 MiB)
//! - `RASTER_ADMISSION_TIMEOUT` - Seconds to wait for a slot (default: forever)
//! - `RASTER_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 86400)
//! - `RASTER_CORS_ORIGINS` - Allowed CORS origins, comma separated

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::convert::{DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY};
use crate::engine::{Backend, RasterOptions, DEFAULT_DPI, DEFAULT_ENGINE_THREADS};
use crate::limiter::DEFAULT_MAX_CONCURRENT_CONVERSIONS;
use crate::server::{DEFAULT_CACHE_MAX_AGE, DEFAULT_MAX_UPLOAD_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Highest accepted rendering resolution.
pub const MAX_DPI: u32 = 2400;

// =============================================================================
// CLI Arguments
// =============================================================================

/// pdf-raster - Render PDF pages to JPEG over HTTP.
///
/// Accepts PDF uploads on `POST /convert`, rasterizes the requested page with
/// poppler and streams back a JPEG.
#[derive(Parser, Debug, Clone)]
#[command(name = "pdf-raster")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "RASTER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Maximum request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_SIZE, env = "RASTER_MAX_UPLOAD_SIZE")]
    pub max_upload_size: usize,

    // =========================================================================
    // Conversion Configuration
    // =========================================================================
    /// Rendering resolution in dots per inch.
    #[arg(long, default_value_t = DEFAULT_DPI, env = "RASTER_DPI")]
    pub dpi: u32,

    /// JPEG quality used when a request does not specify one (1-95).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "RASTER_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Maximum number of conversions running at the same time.
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_CONVERSIONS, env = "RASTER_MAX_CONCURRENT")]
    pub max_concurrent: usize,

    /// Seconds a request may wait for a conversion slot before getting 503.
    ///
    /// If not specified, requests wait until a slot is free.
    #[arg(long, env = "RASTER_ADMISSION_TIMEOUT")]
    pub admission_timeout: Option<u64>,

    /// Directory for uploaded and rendered temporary files.
    ///
    /// If not specified, uses the operating system's temp directory.
    #[arg(long, env = "RASTER_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    // =========================================================================
    // Engine Configuration
    // =========================================================================
    /// Poppler tool used to render pages.
    #[arg(long, value_enum, default_value_t = Backend::Cairo, env = "RASTER_BACKEND")]
    pub backend: Backend,

    /// Renderer processes used for one conversion.
    #[arg(long, default_value_t = DEFAULT_ENGINE_THREADS, env = "RASTER_ENGINE_THREADS")]
    pub engine_threads: usize,

    /// Directory containing pdfinfo, pdftocairo and pdftoppm.
    ///
    /// If not specified, the tools are looked up on PATH.
    #[arg(long, env = "RASTER_POPPLER_PATH")]
    pub poppler_path: Option<PathBuf>,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "RASTER_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "RASTER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&self.jpeg_quality) {
            return Err(format!(
                "jpeg_quality must be between {} and {}",
                MIN_JPEG_QUALITY, MAX_JPEG_QUALITY
            ));
        }

        if self.dpi == 0 || self.dpi > MAX_DPI {
            return Err(format!("dpi must be between 1 and {}", MAX_DPI));
        }

        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".to_string());
        }
        if self.engine_threads == 0 {
            return Err("engine_threads must be greater than 0".to_string());
        }
        if self.max_upload_size == 0 {
            return Err("max_upload_size must be greater than 0".to_string());
        }

        if let Some(dir) = &self.scratch_dir {
            if !dir.is_dir() {
                return Err(format!(
                    "Scratch directory {} does not exist. Set --scratch-dir or RASTER_SCRATCH_DIR",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rendering options for the engine.
    pub fn raster_options(&self) -> RasterOptions {
        RasterOptions {
            dpi: self.dpi,
            thread_count: self.engine_threads,
            backend: self.backend,
        }
    }

    /// Directory for temporary files, falling back to the OS temp dir.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Admission timeout as a duration, if configured.
    pub fn admission_timeout(&self) -> Option<Duration> {
        self.admission_timeout.map(Duration::from_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
