use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::modules::transcoder::TranscodeError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Transcoding failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::Transcode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Errors are rendered as `<reason phrase>: <detail>` in a plain-text body
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                None
            }
            AppError::Transcode(ref e) => {
                tracing::error!("Error processing video: {}", e);
                Some(e.to_string())
            }
            AppError::ExternalServiceError(ref msg) => {
                tracing::error!("External service error: {}", msg);
                Some(msg.clone())
            }
            AppError::NotFound(ref msg)
            | AppError::BadRequest(ref msg)
            | AppError::ServiceUnavailable(ref msg) => Some(msg.clone()),
        };

        let reason = status.canonical_reason().unwrap_or("Error");
        let body = match detail {
            Some(detail) => format!("{}: {}", reason, detail),
            None => reason.to_string(),
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
