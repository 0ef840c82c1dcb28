use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{error::AppError, utils::pdf_text::PdfTextError};
use intake_pipeline::IntakeError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => Self::NotFound(msg),
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::PdfText(err) => err.into(),
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl From<PdfTextError> for ApiError {
    fn from(err: PdfTextError) -> Self {
        match err {
            PdfTextError::UnsupportedType(_) => Self::UnsupportedMediaType(err.to_string()),
            PdfTextError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            PdfTextError::Extraction(_) | PdfTextError::Empty => {
                Self::ValidationError(err.to_string())
            }
            PdfTextError::Join(_) => {
                tracing::error!("PDF extraction task failed: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::SubmissionFailed(ref source) => {
                tracing::error!("Submission failed: {:?}", source);
                Self::InternalError(err.to_string())
            }
            IntakeError::BatchAborted { .. } => Self::InternalError(err.to_string()),
            IntakeError::Validation(_)
            | IntakeError::NoSubtypeSelected(_)
            | IntakeError::UnknownSubtype { .. }
            | IntakeError::UnknownSection(_)
            | IntakeError::UnknownFile(_)
            | IntakeError::SubmitInFlight => Self::ValidationError(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InternalError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Self::ValidationError(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::UnsupportedMediaType(message) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, message),
            Self::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, message),
        };

        let body = ErrorResponse {
            error: message,
            status: "error".to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}
