//! pdf-raster - Render PDF pages to JPEG over HTTP.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_raster::{
    config::Config,
    convert::ConversionService,
    engine::PopplerRasterizer,
    limiter::ConcurrencyLimiter,
    scratch::ScratchSpace,
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("pdf-raster v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Resolution: {} dpi", config.dpi);
    info!("  Default JPEG quality: {}", config.jpeg_quality);
    info!("  Max concurrent conversions: {}", config.max_concurrent);
    match config.admission_timeout() {
        Some(timeout) => info!("  Admission timeout: {}s", timeout.as_secs()),
        None => info!("  Admission timeout: none (requests queue until a slot is free)"),
    }
    info!(
        "  Max upload size: {}MB",
        config.max_upload_size / (1024 * 1024)
    );
    info!("  Scratch directory: {}", config.scratch_dir().display());

    // Check that the renderer is installed
    let rasterizer = match &config.poppler_path {
        Some(dir) => PopplerRasterizer::with_tool_dir(dir),
        None => PopplerRasterizer::new(),
    };
    match rasterizer.version(config.backend).await {
        Ok(version) => info!("  Backend: {} ({})", config.backend, version),
        Err(e) => {
            error!("  Backend {} is not usable: {}", config.backend, e);
            error!("");
            error!("  Please check:");
            error!("    - poppler-utils is installed");
            error!("    - The tools are on PATH, or set --poppler-path / RASTER_POPPLER_PATH");
            return ExitCode::FAILURE;
        }
    }

    // Create conversion service
    let mut limiter = ConcurrencyLimiter::new(config.max_concurrent);
    if let Some(timeout) = config.admission_timeout() {
        limiter = limiter.with_admission_timeout(timeout);
    }
    let service = ConversionService::new(rasterizer)
        .with_limiter(limiter)
        .with_scratch(ScratchSpace::new(config.scratch_dir()))
        .with_raster_options(config.raster_options());

    // Create router
    let router = create_router(Arc::new(service), build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -F file=@document.pdf 'http://{}/convert?page=1&quality=85' -o page.jpg",
        addr
    );
    info!("");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Initialize the tracing subscriber for logging.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pdf_raster=debug,tower_http=debug"
    } else {
        "pdf_raster=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build router configuration from CLI config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_max_upload_size(config.max_upload_size)
        .with_default_quality(config.jpeg_quality)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

/// Resolve when the process receives Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, finishing in-flight requests");
}
