//! API handlers for the PdfMagic server
//!
//! Provides endpoints for:
//! - Merging PDFs
//! - Converting images to a PDF
//! - Merging a mix of PDFs and images
//!
//! Every operation takes a multipart body whose `files` parts are the
//! uploads, in order, and answers with the assembled PDF.

use std::io::Cursor;
use std::time::Duration;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pdfmagic_core::{AssembledDocument, Mode, UploadItem};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::ServerError;
use crate::AppState;

/// Multipart field carrying the uploads.
pub const UPLOAD_FIELD: &str = "files";

const PDF_MEDIA_TYPE: &str = "application/pdf";
static PAGE_COUNT_HEADER: HeaderName = HeaderName::from_static("x-page-count");

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "pdfmagic-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /merge-pdf
pub async fn handle_merge_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    assemble(state, Mode::MergePdfs, multipart).await
}

/// Handler: POST /images-to-pdf
pub async fn handle_images_to_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    assemble(state, Mode::ImagesToPdf, multipart).await
}

/// Handler: POST /merge-files
pub async fn handle_merge_files(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    assemble(state, Mode::MergeFiles, multipart).await
}

/// Collect the uploads and run the pipeline off the async runtime.
async fn assemble(
    state: AppState,
    mode: Mode,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let items = collect_uploads(multipart, state.max_upload_bytes).await?;
    info!("{} request: {} file(s)", mode, items.len());

    let result = tokio::time::timeout(
        Duration::from_millis(state.timeout_ms),
        tokio::task::spawn_blocking(move || pdfmagic_core::run(mode, items)),
    )
    .await;

    let assembled = match result {
        Ok(Ok(outcome)) => outcome?,
        Ok(Err(join_error)) => {
            error!("{} pipeline panicked: {}", mode, join_error);
            return Err(ServerError::Internal(format!(
                "Processing task panicked: {}",
                join_error
            )));
        }
        Err(_) => return Err(ServerError::Timeout(state.timeout_ms)),
    };

    debug!(
        "{} metrics: {}",
        mode,
        serde_json::to_string(&assembled.metrics).unwrap_or_default()
    );

    Ok(pdf_response(assembled))
}

/// Read every `files` part of the body, in arrival order.
async fn collect_uploads(
    mut multipart: Multipart,
    limit: usize,
) -> Result<Vec<UploadItem>, ServerError> {
    let mut items = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        debug!("Received {:?}: {} bytes", filename, data.len());

        items.push(UploadItem::new(filename, Cursor::new(data)));
    }

    Ok(items)
}

fn multipart_error(err: MultipartError, limit: usize) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(limit)
    } else {
        ServerError::InvalidRequest(format!("Failed to read multipart: {}", err))
    }
}

fn pdf_response(document: AssembledDocument) -> Response {
    let disposition = format!("attachment; filename={}", document.filename);
    let headers = [
        (header::CONTENT_TYPE, PDF_MEDIA_TYPE.to_string()),
        (header::CONTENT_DISPOSITION, disposition),
        (
            PAGE_COUNT_HEADER.clone(),
            document.metrics.page_count.to_string(),
        ),
    ];

    (StatusCode::OK, headers, document.bytes).into_response()
}
