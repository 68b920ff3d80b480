//! JPEG page encoder.
//!
//! Rendered pages arrive as decoded images in whatever pixel format the
//! backend produced. They are flattened to 8-bit RGB (or gray) and encoded as
//! baseline JPEG at the requested quality, with Huffman tables optimized for
//! the page to keep the output small.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use image::{DynamicImage, ImageReader};
use jpeg_encoder::{ColorType, Encoder};

use crate::error::ConvertError;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 95;

// =============================================================================
// JPEG Encoder
// =============================================================================

/// Encodes rendered pages as JPEG.
#[derive(Debug, Clone)]
pub struct JpegPageEncoder {
    optimize_huffman: bool,
}

impl JpegPageEncoder {
    pub fn new() -> Self {
        Self {
            optimize_huffman: true,
        }
    }

    /// Enable or disable per-image Huffman table optimization (on by default).
    pub fn with_optimized_huffman(mut self, enabled: bool) -> Self {
        self.optimize_huffman = enabled;
        self
    }

    /// Encode `image` in memory at `quality` (clamped to 1-95).
    pub fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Bytes, ConvertError> {
        let mut output = Vec::new();
        write_jpeg(image, quality, self.optimize_huffman, &mut output)?;
        Ok(Bytes::from(output))
    }

    /// Encode `image` into the file at `path`, returning the bytes written.
    ///
    /// Encoding runs on the blocking pool.
    pub async fn encode_to_file(
        &self,
        image: DynamicImage,
        path: &Path,
        quality: u8,
    ) -> Result<u64, ConvertError> {
        let path: PathBuf = path.to_path_buf();
        let optimize_huffman = self.optimize_huffman;

        tokio::task::spawn_blocking(move || -> Result<u64, ConvertError> {
            let file = File::create(&path)?;
            let mut writer = BufWriter::new(file);
            write_jpeg(&image, quality, optimize_huffman, &mut writer)?;
            writer.flush()?;
            Ok(std::fs::metadata(&path)?.len())
        })
        .await
        .map_err(|e| ConvertError::encode(format!("Encode task failed: {}", e)))?
    }

    /// Read the dimensions of an encoded JPEG without decoding it fully.
    pub fn dimensions(&self, jpeg: &[u8]) -> Result<(u32, u32), ConvertError> {
        ImageReader::with_format(Cursor::new(jpeg), image::ImageFormat::Jpeg)
            .into_dimensions()
            .map_err(|e| ConvertError::encode(e.to_string()))
    }
}

impl Default for JpegPageEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn write_jpeg<W: Write>(
    image: &DynamicImage,
    quality: u8,
    optimize_huffman: bool,
    writer: W,
) -> Result<(), ConvertError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(ConvertError::encode(format!(
            "page has no pixels ({}x{})",
            width, height
        )));
    }
    let (Ok(jpeg_width), Ok(jpeg_height)) = (u16::try_from(width), u16::try_from(height)) else {
        return Err(ConvertError::encode(format!(
            "page is {}x{}, JPEG allows at most {}x{}",
            width,
            height,
            u16::MAX,
            u16::MAX
        )));
    };

    let quality = quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY);
    let mut encoder = Encoder::new(writer, quality);
    encoder.set_optimized_huffman_tables(optimize_huffman);

    let image = jpeg_compatible(image);
    let color_type = match &*image {
        DynamicImage::ImageLuma8(_) => ColorType::Luma,
        _ => ColorType::Rgb,
    };

    encoder
        .encode(image.as_bytes(), jpeg_width, jpeg_height, color_type)
        .map_err(|e| ConvertError::encode(e.to_string()))
}

/// JPEG has no alpha channel and no 16-bit samples.
fn jpeg_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(image),
        other if other.color().has_color() => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
        other => Cow::Owned(DynamicImage::ImageLuma8(other.to_luma8())),
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Clamp a requested quality into the accepted range.
///
/// Values below 1 become 1, values above 95 become 95.
#[inline]
pub fn clamp_quality(quality: i64) -> u8 {
    quality.clamp(i64::from(MIN_JPEG_QUALITY), i64::from(MAX_JPEG_QUALITY)) as u8
}

// =============================================================================
// Tests
// =============================================================================
