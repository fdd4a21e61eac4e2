//! PdfMagic Server
//!
//! Accepts uploaded files and answers with one combined PDF. Provides REST
//! endpoints for:
//!
//! - Merging PDFs (`POST /merge-pdf`)
//! - Converting images to a PDF (`POST /images-to-pdf`)
//! - Merging a mix of PDFs and images (`POST /merge-files`)
//! - Liveness (`GET /health`)
//!
//! ## Architecture
//!
//! All classification and page assembly lives in `pdfmagic-core`. This
//! binary only adds the HTTP surface around it:
//!
//! - Multipart upload parsing and body size limits
//! - Blocking-pool execution with a processing timeout
//! - Rate limiting via tower-governor
//! - Permissive CORS for browser frontends

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;

use api::{handle_health, handle_images_to_pdf, handle_merge_files, handle_merge_pdf};

/// Command-line arguments for the PdfMagic server
#[derive(Parser, Debug)]
#[command(name = "pdfmagic-server")]
#[command(about = "Merge PDFs and images into a single PDF over HTTP")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PDFMAGIC_PORT", default_value = "8000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "PDFMAGIC_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Processing timeout per request in milliseconds
    #[arg(long, env = "PDFMAGIC_TIMEOUT_MS", default_value = "60000")]
    timeout_ms: u64,

    /// Maximum request body size in megabytes
    #[arg(long, env = "PDFMAGIC_MAX_UPLOAD_MB", default_value = "100")]
    max_upload_mb: usize,

    /// Rate limit: requests per second per IP
    #[arg(long, env = "PDFMAGIC_RATE_LIMIT", default_value = "10")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Processing timeout in milliseconds
    pub timeout_ms: u64,
    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

/// Routes, body limit, tracing and CORS. Rate limiting is added in `main`
/// because it needs the peer address from the connection.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // Assembly endpoints
        .route("/merge-pdf", post(handle_merge_pdf))
        .route("/images-to-pdf", post(handle_images_to_pdf))
        .route("/merge-files", post(handle_merge_files))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PdfMagic server on {}:{}", args.host, args.port);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit.saturating_mul(2))
            .finish()
            .ok_or_else(|| anyhow!("Invalid rate limit: {}", args.rate_limit))?,
    );

    let state = AppState {
        timeout_ms: args.timeout_ms,
        max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
    };

    let app = build_router(state).layer(GovernorLayer {
        config: governor_conf,
    });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Processing timeout: {}ms", args.timeout_ms);
    info!("Upload limit: {}MB", args.max_upload_mb);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
