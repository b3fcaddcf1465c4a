// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system. The
//! export pipeline mostly turns these into quiet outcomes, while the API
//! layer maps them onto HTTP status codes.

use std::fmt;
use thiserror::Error;

/// Hosted data store error codes as a typed vocabulary.
///
/// The store reports failures with an HTTP status and, usually, a JSON body
/// carrying a `code` and `message`. Classifying them lets the API layer pick
/// between "no record" and "upstream broke" without string matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// The table or row does not exist
    NotFound,
    /// The service key was rejected
    Unauthorized,
    /// Query parameters failed the store's validation
    BadQuery,
    /// Store-side failure or unavailability
    Unavailable,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
}

impl StoreErrorCode {
    /// Classifies an HTTP status returned by the store.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            404 | 406 => Self::NotFound,
            401 | 403 => Self::Unauthorized,
            400 => Self::BadQuery,
            500..=599 => Self::Unavailable,
            other => Self::HttpStatus(other),
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::BadQuery => write!(f, "bad_query"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Data store returned an error ({code}): {message}")]
    StoreService {
        code: StoreErrorCode,
        message: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error interacting with clipboard: {0}")]
    Clipboard(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl AppError {
    /// HTTP status the API layer answers with for this error.
    ///
    /// Everything that isn't a caller mistake or a missing record is a 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidRequest(_) | Self::ValidationError(_) => 400,
            _ => 500,
        }
    }
}

impl From<arboard::Error> for AppError {
    fn from(err: arboard::Error) -> Self {
        AppError::Clipboard(format!("Clipboard error: {}", err))
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Image(err.to_string())
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::Image(format!("Invalid data URI payload: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError {
            message: "Background task failed".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
