//! Page rasterization.
//!
//! The service never interprets documents itself. A [`Rasterizer`] turns pages
//! of a document on disk into in-memory images, and the rest of the pipeline
//! only relies on that narrow contract:
//!
//! ```text
//! rasterize_range(path, first, last, options) -> [image; 0..=last-first+1]
//! ```
//!
//! [`PopplerRasterizer`] implements it by driving the poppler command-line
//! tools. Tests substitute their own implementation.

mod poppler;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use clap::ValueEnum;
use image::DynamicImage;
use tracing::warn;

use crate::error::ConvertError;

pub use poppler::{parse_page_count, plan_chunks, PopplerRasterizer};

/// Default rendering resolution in dots per inch.
pub const DEFAULT_DPI: u32 = 200;

/// Default number of backend processes used for one range.
pub const DEFAULT_ENGINE_THREADS: usize = 2;

// =============================================================================
// Options
// =============================================================================

/// Rendering backend, when more than one is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Backend {
    /// `pdftocairo`, usually the faster renderer
    #[default]
    Cairo,
    /// `pdftoppm`
    Ppm,
}

impl Backend {
    /// Name of the executable for this backend.
    pub fn program(self) -> &'static str {
        match self {
            Backend::Cairo => "pdftocairo",
            Backend::Ppm => "pdftoppm",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Per-call rendering parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterOptions {
    /// Output resolution in dots per inch
    pub dpi: u32,

    /// Upper bound on parallel decoding work for one call
    pub thread_count: usize,

    /// Preferred rendering backend
    pub backend: Backend,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            thread_count: DEFAULT_ENGINE_THREADS,
            backend: Backend::default(),
        }
    }
}

// =============================================================================
// Rasterizer Trait
// =============================================================================

/// Turns document pages into raster images.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render pages `first_page..=last_page` (1-based) in page order.
    ///
    /// Pages beyond the end of the document are not an error; they are simply
    /// absent from the result, which may therefore be empty.
    async fn rasterize_range(
        &self,
        input: &Path,
        first_page: u32,
        last_page: u32,
        options: &RasterOptions,
    ) -> Result<Vec<DynamicImage>, ConvertError>;

    /// Render exactly one page.
    ///
    /// # Errors
    ///
    /// - [`ConvertError::Engine`] if `page` is 0 or the backend fails
    /// - [`ConvertError::EmptyResult`] if the backend produced no image
    async fn rasterize(
        &self,
        input: &Path,
        page: u32,
        options: &RasterOptions,
    ) -> Result<DynamicImage, ConvertError> {
        if page < 1 {
            return Err(ConvertError::engine("Page index must be at least 1"));
        }

        let images = self.rasterize_range(input, page, page, options).await?;
        if images.len() > 1 {
            warn!(
                page,
                count = images.len(),
                "Backend returned more than one image for a single page; using the first"
            );
        }

        images
            .into_iter()
            .next()
            .ok_or(ConvertError::EmptyResult { page })
    }
}

// =============================================================================
// Tests
// =============================================================================
