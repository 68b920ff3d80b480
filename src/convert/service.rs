//! Conversion service: admission, scratch files, rasterization and encoding.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       ConversionService                          │
//! │                                                                  │
//! │  Admitting ──► WritingInput ──► Converting ──► Encoding ──► out  │
//! │      │              │               │              │             │
//! │      ▼              ▼               ▼              ▼             │
//! │  ┌─────────┐  ┌────────────┐  ┌────────────┐  ┌──────────────┐   │
//! │  │ Limiter │  │ Scratch    │  │ Rasterizer │  │ JpegPage     │   │
//! │  │ (slot)  │  │ (input)    │  │            │  │ Encoder      │   │
//! │  └─────────┘  └────────────┘  └────────────┘  └──────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The slot and the input artifact are held as guards, so every early return
//! gives them back. The output artifact is handed to the caller inside
//! [`ConvertedPage`] and lives until the response body is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, Instrument};

use super::encoder::JpegPageEncoder;
use super::request::{ConversionRequest, ConvertedPage};
use crate::engine::{RasterOptions, Rasterizer};
use crate::error::ConvertError;
use crate::limiter::ConcurrencyLimiter;
use crate::scratch::{ArtifactKind, ScratchSpace};

/// Converts uploaded documents into JPEG pages.
///
/// Constructed once at startup and shared by all handlers.
///
/// # Type Parameters
///
/// * `R` - The rasterization backend
///
/// # Example
///
/// ```ignore
/// use pdf_raster::convert::{ConversionRequest, ConversionService};
/// use pdf_raster::engine::PopplerRasterizer;
///
/// let service = ConversionService::new(PopplerRasterizer::new());
/// let request = ConversionRequest::new(service.next_request_id(), pdf_bytes).with_page(2);
/// let page = service.convert(request).await?;
///
/// println!("{} bytes in {:?}", page.size, page.elapsed);
/// ```
pub struct ConversionService<R: Rasterizer> {
    rasterizer: Arc<R>,
    limiter: ConcurrencyLimiter,
    scratch: ScratchSpace,
    encoder: JpegPageEncoder,
    options: RasterOptions,
    next_request_id: AtomicU64,
}

impl<R: Rasterizer> ConversionService<R> {
    /// Create a service with default limits, the system temp directory and
    /// default rendering options.
    pub fn new(rasterizer: R) -> Self {
        Self::with_shared_rasterizer(Arc::new(rasterizer))
    }

    /// Create a service around a rasterizer that is shared elsewhere.
    pub fn with_shared_rasterizer(rasterizer: Arc<R>) -> Self {
        Self {
            rasterizer,
            limiter: ConcurrencyLimiter::default(),
            scratch: ScratchSpace::default(),
            encoder: JpegPageEncoder::new(),
            options: RasterOptions::default(),
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn with_limiter(mut self, limiter: ConcurrencyLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_scratch(mut self, scratch: ScratchSpace) -> Self {
        self.scratch = scratch;
        self
    }

    pub fn with_raster_options(mut self, options: RasterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    /// Allocate an identifier for a new request.
    pub fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Run one conversion.
    ///
    /// # Errors
    ///
    /// - [`ConvertError::Overloaded`] / [`ConvertError::LimiterClosed`] if no slot was granted
    /// - [`ConvertError::Scratch`] if a temporary file could not be created or written
    /// - [`ConvertError::Engine`] / [`ConvertError::EmptyResult`] from rasterization
    /// - [`ConvertError::Encode`] if the JPEG could not be produced
    pub async fn convert(&self, request: ConversionRequest) -> Result<ConvertedPage, ConvertError> {
        let started = Instant::now();
        let request_id = request.request_id;

        // Admitting
        let slot = self.limiter.acquire().await?;

        // WritingInput
        let input = self.scratch.acquire(ArtifactKind::Input, request_id)?;
        tokio::fs::write(input.path(), &request.payload).await?;

        // Converting
        let quality = request.effective_quality();
        info!(page = request.page, quality, "Converting PDF to image");
        let image = self
            .rasterizer
            .rasterize(input.path(), request.page, &self.options)
            .await?;
        let (width, height) = (image.width(), image.height());

        // Encoding
        let output = self.scratch.acquire(ArtifactKind::Output, request_id)?;
        let size = self
            .encoder
            .encode_to_file(image, output.path(), quality)
            .await?;
        input.release();
        drop(slot);

        let elapsed = started.elapsed();
        info!(
            width,
            height,
            size,
            "Processing completed in {:.2}s",
            elapsed.as_secs_f64()
        );

        Ok(ConvertedPage {
            artifact: output,
            page: request.page,
            quality,
            width,
            height,
            size,
            elapsed,
        })
    }
}

impl<R: Rasterizer + 'static> ConversionService<R> {
    /// Run one conversion on its own task.
    ///
    /// The conversion keeps running if the caller stops waiting (for example
    /// when the client disconnects); its artifacts are released when it ends.
    pub async fn convert_detached(
        self: &Arc<Self>,
        request: ConversionRequest,
    ) -> Result<ConvertedPage, ConvertError> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.convert(request).await }.in_current_span())
            .await
            .map_err(|e| ConvertError::engine(format!("Conversion task failed: {}", e)))?
    }
}

// =============================================================================
// Tests
// =============================================================================
