use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that can originate inside the preprocessing pipeline.
///
/// Only the loader and the writer touch the outside world; every numeric
/// stage is total over a decoded image.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not decode image from {origin}: {message}")]
    Decode { origin: String, message: String },
}

/// Failures of the recognition collaborator.
#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("Failed to initialize recognizer: {0}")]
    Initialization(String),

    #[error("Unknown recognition engine '{name}' (available: {available})")]
    UnknownEngine { name: String, available: String },

    #[error("Recognition failed: {0}")]
    Inference(String),
}

/// Rejected configuration values.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors surfaced by the HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("No image file provided")]
    MissingFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("Invalid file type. Allowed: {0}")]
    UnsupportedFormat(String),

    #[error("Image too large (max: {max} bytes)")]
    ImageTooLarge { max: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Preprocessing(#[from] PipelineError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile
            | AppError::EmptyFilename
            | AppError::UnsupportedFormat(_)
            | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Preprocessing(_) | AppError::Recognition(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = Json(ErrorResponse {
            success: false,
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
