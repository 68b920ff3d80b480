//! API integration tests for conversion and error handling.
//!
//! Tests verify:
//! - Successful conversion with response headers
//! - Query parameter handling (page, quality clamping, lenient parsing)
//! - Validation errors (missing part, empty filename, wrong extension)
//! - Engine failures and body size limits

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use bytes::Bytes;
use tower::ServiceExt;

use pdf_raster::RouterConfig;

use super::test_utils::{
    body_bytes, body_json, header_str, is_valid_jpeg, jpeg_dimensions, multipart_body,
    multipart_request, pdf_request, MockRasterizer, Part, TestApp, BOUNDARY, FAKE_PDF,
};

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert_eq!(body, br#"{"status":"healthy"}"#);
}

// =============================================================================
// Successful Conversion
// =============================================================================

#[tokio::test]
async fn test_convert_success() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let response = app
        .router
        .clone()
        .oneshot(pdf_request("/convert"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "image/jpeg");
    assert_eq!(
        header_str(&response, "cache-control"),
        "public, max-age=86400"
    );
    assert_eq!(header_str(&response, "x-page"), "1");
    assert_eq!(header_str(&response, "x-quality"), "85");

    let elapsed: f64 = header_str(&response, "x-processing-time").parse().unwrap();
    assert!(elapsed >= 0.0);

    let length: usize = header_str(&response, "content-length").parse().unwrap();
    let body = body_bytes(response).await;
    assert_eq!(body.len(), length);
    assert!(is_valid_jpeg(&body));
    assert_eq!(jpeg_dimensions(&body), (170, 220));

    assert_eq!(app.mock().calls(), 1);
}

#[tokio::test]
async fn test_convert_requested_page() {
    let app = TestApp::new(MockRasterizer::pages(5));

    let response = app
        .router
        .clone()
        .oneshot(pdf_request("/convert?page=3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-page"), "3");
    assert_eq!(app.mock().requested_pages(), vec![3]);
}

#[tokio::test]
async fn test_convert_uppercase_extension() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let request = multipart_request("/convert", &[Part::file("REPORT.PDF", FAKE_PDF)]);
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_file_part_after_other_fields() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let request = multipart_request(
        "/convert",
        &[
            Part::field("comment", b"quarterly numbers"),
            Part::file("document.pdf", FAKE_PDF),
        ],
    );
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_convert_is_deterministic() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let first = app
        .router
        .clone()
        .oneshot(pdf_request("/convert?quality=70"))
        .await
        .unwrap();
    let second = app
        .router
        .clone()
        .oneshot(pdf_request("/convert?quality=70"))
        .await
        .unwrap();

    assert_eq!(body_bytes(first).await, body_bytes(second).await);
}

#[tokio::test]
async fn test_custom_cache_max_age() {
    let app = TestApp::with_config(
        MockRasterizer::pages(1),
        RouterConfig::new().with_cache_max_age(600),
    );

    let response = app
        .router
        .clone()
        .oneshot(pdf_request("/convert"))
        .await
        .unwrap();

    assert_eq!(header_str(&response, "cache-control"), "public, max-age=600");
}

// =============================================================================
// Quality Handling
// =============================================================================

async fn convert_with_quality(app: &TestApp<MockRasterizer>, quality: &str) -> (String, Vec<u8>) {
    let uri = format!("/convert?quality={}", quality);
    let response = app.router.clone().oneshot(pdf_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let effective = header_str(&response, "x-quality").to_string();
    (effective, body_bytes(response).await)
}

#[tokio::test]
async fn test_quality_below_range_is_clamped() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let (low_quality, low) = convert_with_quality(&app, "-5").await;
    let (min_quality, min) = convert_with_quality(&app, "1").await;

    assert_eq!(low_quality, "1");
    assert_eq!(min_quality, "1");
    assert_eq!(low, min);
}

#[tokio::test]
async fn test_quality_above_range_is_clamped() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let (high_quality, high) = convert_with_quality(&app, "200").await;
    let (max_quality, max) = convert_with_quality(&app, "95").await;

    assert_eq!(high_quality, "95");
    assert_eq!(max_quality, "95");
    assert_eq!(high, max);
}

#[tokio::test]
async fn test_quality_changes_output() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let (_, low) = convert_with_quality(&app, "10").await;
    let (_, high) = convert_with_quality(&app, "90").await;

    assert!(low.len() < high.len());
}

#[tokio::test]
async fn test_non_integer_params_use_defaults() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let response = app
        .router
        .clone()
        .oneshot(pdf_request("/convert?page=first&quality=best"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-page"), "1");
    assert_eq!(header_str(&response, "x-quality"), "85");
}

#[tokio::test]
async fn test_huge_quality_saturates_then_clamps() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let (high_quality, high) = convert_with_quality(&app, "100000000000000000000").await;
    let (max_quality, max) = convert_with_quality(&app, "95").await;
    assert_eq!(high_quality, "95");
    assert_eq!(high, max);

    let (low_quality, low) = convert_with_quality(&app, "-100000000000000000000").await;
    let (min_quality, min) = convert_with_quality(&app, "1").await;
    assert_eq!(low_quality, "1");
    assert_eq!(low, min);
}

#[tokio::test]
async fn test_repeated_query_keys_use_first() {
    let app = TestApp::new(MockRasterizer::pages(3));

    let response = app
        .router
        .clone()
        .oneshot(pdf_request("/convert?page=2&page=3&quality=40&quality=90"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-page"), "2");
    assert_eq!(header_str(&response, "x-quality"), "40");
    assert_eq!(app.mock().requested_pages(), vec![2]);
}

#[tokio::test]
async fn test_configured_default_quality() {
    let app = TestApp::with_config(
        MockRasterizer::pages(1),
        RouterConfig::new().with_default_quality(60),
    );

    let response = app
        .router
        .clone()
        .oneshot(pdf_request("/convert"))
        .await
        .unwrap();

    assert_eq!(header_str(&response, "x-quality"), "60");
}

// =============================================================================
// Validation Errors
// =============================================================================

#[tokio::test]
async fn test_missing_file_part() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let request = multipart_request("/convert", &[Part::field("document", FAKE_PDF)]);
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header_str(&response, "content-type"), "application/json");
    let error = body_json(response).await;
    assert_eq!(error["error"], "No file part");
    assert_eq!(app.mock().calls(), 0);
}

#[tokio::test]
async fn test_non_multipart_body() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let request = Request::builder()
        .method("POST")
        .uri("/convert")
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from(FAKE_PDF))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error"], "No file part");
}

#[tokio::test]
async fn test_file_field_without_filename() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let request = multipart_request("/convert", &[Part::field("file", FAKE_PDF)]);
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error"], "No file part");
    assert_eq!(app.mock().calls(), 0);
}

#[tokio::test]
async fn test_file_part_after_plain_file_field() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let request = multipart_request(
        "/convert",
        &[
            Part::field("file", b"not an upload"),
            Part::file("report.pdf", FAKE_PDF),
        ],
    );
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_empty_filename() {
    let app = TestApp::new(MockRasterizer::pages(1));

    let request = multipart_request("/convert", &[Part::file("", FAKE_PDF)]);
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error"], "No file selected");
}

#[tokio::test]
async fn test_non_pdf_rejected() {
    let app = TestApp::new(MockRasterizer::pages(1));

    for filename in ["doc.txt", "pdf", "archive.pdf.zip"] {
        let request = multipart_request("/convert", &[Part::file(filename, FAKE_PDF)]);
        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", filename);
        let error = body_json(response).await;
        assert_eq!(error["error"], "Only PDF files are allowed");
    }

    assert_eq!(app.mock().calls(), 0);
    assert_eq!(app.scratch_entries(), 0);
}

#[tokio::test]
async fn test_page_below_one_rejected() {
    let app = TestApp::new(MockRasterizer::pages(1));

    for page in ["0", "-2"] {
        let uri = format!("/convert?page={}", page);
        let response = app.router.clone().oneshot(pdf_request(&uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = body_json(response).await;
        assert_eq!(error["error"], "Page must be a positive integer");
    }

    assert_eq!(app.mock().calls(), 0);
}

// =============================================================================
// Conversion Errors
// =============================================================================

#[tokio::test]
async fn test_engine_failure() {
    let app = TestApp::new(MockRasterizer::failing(
        "Syntax Error: Couldn't read xref table",
    ));

    let response = app
        .router
        .clone()
        .oneshot(pdf_request("/convert"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await;
    assert_eq!(
        error["error"],
        "Conversion failed: Syntax Error: Couldn't read xref table"
    );
}

#[tokio::test]
async fn test_page_beyond_document() {
    let app = TestApp::new(MockRasterizer::pages(2));

    let response = app
        .router
        .clone()
        .oneshot(pdf_request("/convert?page=999"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await;
    assert_eq!(
        error["error"],
        "Conversion failed: No image produced for page 999"
    );
}

#[tokio::test]
async fn test_huge_page_is_past_the_end() {
    let app = TestApp::new(MockRasterizer::pages(2));

    let response = app
        .router
        .clone()
        .oneshot(pdf_request("/convert?page=100000000000000000000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await;
    assert!(error["error"]
        .as_str()
        .unwrap()
        .starts_with("Conversion failed: No image produced"));
    assert_eq!(app.mock().requested_pages(), vec![u32::MAX]);
}

// =============================================================================
// Body Size Limit
// =============================================================================

#[tokio::test]
async fn test_upload_too_large() {
    let app = TestApp::with_config(
        MockRasterizer::pages(1),
        RouterConfig::new().with_max_upload_size(1024),
    );

    let large = vec![b'x'; 4096];
    let request = multipart_request("/convert", &[Part::file("big.pdf", &large)]);
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.mock().calls(), 0);
    assert_eq!(app.scratch_entries(), 0);
}

#[tokio::test]
async fn test_upload_within_limit() {
    let app = TestApp::with_config(
        MockRasterizer::pages(1),
        RouterConfig::new().with_max_upload_size(4096),
    );

    let response = app
        .router
        .clone()
        .oneshot(pdf_request("/convert"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_streamed_upload_too_large() {
    let app = TestApp::with_config(
        MockRasterizer::pages(1),
        RouterConfig::new().with_max_upload_size(1024),
    );

    // No Content-Length, so the limit can only trip while the body is read
    let large = vec![b'x'; 8 * 1024];
    let body = multipart_body(&[Part::file("big.pdf", &large)]);
    let chunks: Vec<Result<Bytes, Infallible>> = body
        .chunks(512)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();

    let request = Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let error = body_json(response).await;
    assert_eq!(error["error"], "File too large");
    assert_eq!(app.mock().calls(), 0);
    assert_eq!(app.scratch_entries(), 0);
}
