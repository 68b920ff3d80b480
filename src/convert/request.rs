use std::time::Duration;

use bytes::Bytes;

use super::encoder::{clamp_quality, DEFAULT_JPEG_QUALITY};
use crate::scratch::TempArtifact;

/// Default page when the request does not name one.
pub const DEFAULT_PAGE: u32 = 1;

/// One conversion, owned by the request that created it.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Identifier used in logs and artifact bookkeeping
    pub request_id: u64,

    /// Uploaded document bytes
    pub payload: Bytes,

    /// 1-based page to render
    pub page: u32,

    /// Requested JPEG quality before clamping
    pub quality: i64,
}

impl ConversionRequest {
    /// Create a request for the first page at the default quality.
    pub fn new(request_id: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            request_id,
            payload: payload.into(),
            page: DEFAULT_PAGE,
            quality: i64::from(DEFAULT_JPEG_QUALITY),
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_quality(mut self, quality: i64) -> Self {
        self.quality = quality;
        self
    }

    /// Quality actually used for encoding.
    pub fn effective_quality(&self) -> u8 {
        clamp_quality(self.quality)
    }
}

/// A rendered page waiting to be sent.
///
/// The JPEG lives in `artifact`; dropping this value deletes it.
#[derive(Debug)]
pub struct ConvertedPage {
    /// Output file holding the encoded JPEG
    pub artifact: TempArtifact,

    /// Page that was rendered
    pub page: u32,

    /// JPEG quality used
    pub quality: u8,

    /// Rendered width in pixels
    pub width: u32,

    /// Rendered height in pixels
    pub height: u32,

    /// Size of the encoded JPEG in bytes
    pub size: u64,

    /// Time from admission request to encoded output
    pub elapsed: Duration,
}
