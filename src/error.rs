use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Failures while building process-wide state at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("could not read class index file {path}: {source}")]
    ClassIndexIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: expected `label: index`, got {content:?}")]
    MalformedLine { line: usize, content: String },
    #[error("line {line}: duplicate label {label:?}")]
    DuplicateLabel { line: usize, label: String },
    #[error("line {line}: duplicate index {index}")]
    DuplicateIndex { line: usize, index: usize },
    #[error("class indices must cover 0..{len} without gaps, index {missing} is missing")]
    NonContiguous { len: usize, missing: usize },
    #[error("class index file contains no entries")]
    EmptyClassIndex,
    #[error("could not load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("class index {index} out of range for {len} classes")]
pub struct LookupError {
    pub index: usize,
    pub len: usize,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model inference failed: {0}")]
    Inference(String),
    #[error("model returned {actual} probabilities, expected {expected}")]
    OutputShape { expected: usize, actual: usize },
    #[error("model returned an invalid probability {value} at index {index}")]
    InvalidProbability { index: usize, value: f32 },
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Coarse classification of a failed `/predict` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    UnsupportedMediaType,
    DecodeError,
    InternalError,
}

/// Every way a `/predict` request can end without a prediction.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no file part in the request")]
    NoFilePart,
    #[error("no selected file")]
    NoSelectedFile,
    #[error("unsupported file type: {0}")]
    UnsupportedMediaType(String),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NoFilePart | ServiceError::NoSelectedFile => ErrorKind::BadRequest,
            ServiceError::UnsupportedMediaType(_) => ErrorKind::UnsupportedMediaType,
            ServiceError::Decode(_) => ErrorKind::DecodeError,
            ServiceError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Text sent back to the client. Internal causes stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ServiceError::NoFilePart => "No file part",
            ServiceError::NoSelectedFile => "No selected file",
            ServiceError::UnsupportedMediaType(_) => "Unsupported file type",
            ServiceError::Decode(_) | ServiceError::Internal(_) => "Internal Server Error",
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::BadRequest | ErrorKind::UnsupportedMediaType => StatusCode::BAD_REQUEST,
            ErrorKind::DecodeError | ErrorKind::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.public_message().to_string(),
        })
    }
}
