//! Error types for the PdfMagic server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfmagic_core::PdfMagicError;
use serde::Serialize;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Pipeline(#[from] PdfMagicError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("Processing timeout after {0}ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::Pipeline(err) => match err {
                PdfMagicError::EmptyInput { .. } => (StatusCode::BAD_REQUEST, "EMPTY_INPUT"),
                PdfMagicError::NonPdfInput { .. } => (StatusCode::BAD_REQUEST, "NON_PDF_INPUT"),
                PdfMagicError::PdfNotAllowed { .. } => {
                    (StatusCode::BAD_REQUEST, "PDF_NOT_ALLOWED")
                }
                PdfMagicError::UnsupportedImage { .. } => {
                    (StatusCode::BAD_REQUEST, "UNSUPPORTED_IMAGE")
                }
                PdfMagicError::NoPages(_) => (StatusCode::BAD_REQUEST, "NO_PAGES"),
                PdfMagicError::CorruptPdf { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "CORRUPT_PDF")
                }
                PdfMagicError::Io { .. } | PdfMagicError::Serialization(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ServerError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            ServerError::Timeout(_) => (StatusCode::REQUEST_TIMEOUT, "TIMEOUT"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!("{}", self);
            "Internal error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
