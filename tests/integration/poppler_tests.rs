//! End-to-end tests against the real poppler tools.
//!
//! Each test returns early when `pdfinfo` / `pdftocairo` / `pdftoppm` are not
//! installed.

use std::path::Path;
use std::sync::Arc;

use axum::http::StatusCode;
use tower::ServiceExt;

use pdf_raster::engine::{Backend, PopplerRasterizer, RasterOptions, Rasterizer};
use pdf_raster::scratch::ScratchSpace;
use pdf_raster::{create_router, ConversionService, RouterConfig};

use super::test_utils::{
    body_bytes, body_json, entry_count, header_str, jpeg_dimensions, minimal_pdf,
    multipart_request, poppler_available, Part,
};

macro_rules! require_poppler {
    () => {
        if !poppler_available() {
            eprintln!("skipping: poppler tools not found on PATH");
            return;
        }
    };
}

/// First row, scanning down column `x`, covered by the blue rectangle.
fn first_filled_row(page: &image::DynamicImage, x: u32) -> Option<u32> {
    let rgb = page.to_rgb8();
    (0..rgb.height()).find(|&y| {
        let [r, _, b] = rgb.get_pixel(x, y).0;
        b > 150 && r < 100
    })
}

fn poppler_app(scratch: &Path, backend: Backend) -> axum::Router {
    let service = ConversionService::new(PopplerRasterizer::new())
        .with_scratch(ScratchSpace::new(scratch))
        .with_raster_options(RasterOptions {
            backend,
            ..RasterOptions::default()
        });
    create_router(Arc::new(service), RouterConfig::new().with_tracing(false))
}

#[tokio::test]
async fn test_letter_page_at_200_dpi() {
    require_poppler!();
    let scratch = tempfile::tempdir().unwrap();
    let router = poppler_app(scratch.path(), Backend::Cairo);

    let pdf = minimal_pdf(1);
    let request = multipart_request("/convert", &[Part::file("letter.pdf", &pdf)]);
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "image/jpeg");
    let body = body_bytes(response).await;
    assert_eq!(jpeg_dimensions(&body), (1700, 2200));
    assert_eq!(entry_count(scratch.path()), 0);
}

#[tokio::test]
async fn test_ppm_backend_matches_size() {
    require_poppler!();
    let scratch = tempfile::tempdir().unwrap();
    let router = poppler_app(scratch.path(), Backend::Ppm);

    let pdf = minimal_pdf(1);
    let request = multipart_request("/convert", &[Part::file("letter.pdf", &pdf)]);
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert_eq!(jpeg_dimensions(&body), (1700, 2200));
}

#[tokio::test]
async fn test_second_page_of_three() {
    require_poppler!();
    let scratch = tempfile::tempdir().unwrap();
    let router = poppler_app(scratch.path(), Backend::Cairo);

    let pdf = minimal_pdf(3);
    let request = multipart_request("/convert?page=2", &[Part::file("three.pdf", &pdf)]);
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-page"), "2");
}

#[tokio::test]
async fn test_page_beyond_document() {
    require_poppler!();
    let scratch = tempfile::tempdir().unwrap();
    let router = poppler_app(scratch.path(), Backend::Cairo);

    let pdf = minimal_pdf(1);
    let request = multipart_request("/convert?page=999", &[Part::file("letter.pdf", &pdf)]);
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await;
    assert_eq!(
        error["error"],
        "Conversion failed: No image produced for page 999"
    );
    assert_eq!(entry_count(scratch.path()), 0);
}

#[tokio::test]
async fn test_corrupt_document() {
    require_poppler!();
    let scratch = tempfile::tempdir().unwrap();
    let router = poppler_app(scratch.path(), Backend::Cairo);

    let request = multipart_request(
        "/convert",
        &[Part::file("broken.pdf", b"this is not a pdf at all")],
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await;
    assert!(error["error"]
        .as_str()
        .unwrap()
        .starts_with("Conversion failed: "));
    assert_eq!(entry_count(scratch.path()), 0);
}

#[tokio::test]
async fn test_rasterize_range_in_page_order() {
    require_poppler!();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("five.pdf");
    std::fs::write(&input, minimal_pdf(5)).unwrap();

    let rasterizer = PopplerRasterizer::new();
    let options = RasterOptions {
        dpi: 36,
        thread_count: 3,
        ..RasterOptions::default()
    };

    assert_eq!(rasterizer.page_count(&input).await.unwrap(), 5);

    let pages = rasterizer
        .rasterize_range(&input, 2, 10, &options)
        .await
        .unwrap();
    assert_eq!(pages.len(), 4);
    for page in &pages {
        assert_eq!((page.width(), page.height()), (306, 396));
    }

    // Page n carries its rectangle 100pt higher than page n-1, so at 36 dpi
    // the rectangle's top edge moves up by 50 rows per page.
    for (page_number, page) in (2u32..).zip(&pages) {
        let expected_top = 260 - 50 * (page_number - 1);
        let top = first_filled_row(page, 86).expect("page has a filled rectangle");
        assert!(
            top.abs_diff(expected_top) <= 2,
            "page {}: rectangle top at row {}, expected {}",
            page_number,
            top,
            expected_top
        );
    }

    // Only the input document remains; render directories are removed
    assert_eq!(entry_count(dir.path()), 1);
}

#[tokio::test]
async fn test_backend_version_probe() {
    require_poppler!();
    let rasterizer = PopplerRasterizer::new();

    assert!(!rasterizer.version(Backend::Cairo).await.unwrap().is_empty());
    assert!(!rasterizer.version(Backend::Ppm).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_tool_dir_fails_probe() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = PopplerRasterizer::with_tool_dir(dir.path());

    assert!(rasterizer.version(Backend::Cairo).await.is_err());
}
