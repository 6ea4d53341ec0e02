//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, info};

/// Errors raised while generating, rendering or serving word images.
#[derive(Debug)]
pub enum WordImageError {
    /// A required form or CLI field was absent or blank, carries the message
    MissingField(&'static str),
    /// A field was present but not usable, eg an unknown quality tier
    InvalidField(String),
    /// The language model answered with something we couldn't use
    Validation(String),
    /// Network or API failure talking to the text model
    Transport(String),
    /// The image model call or its payload decoding failed
    Generation(String),
    /// Reading or writing a local file failed
    FileIo(String),
    /// An HTML template failed to render
    Template(String),
    /// When a requested file is not found, carries the plain-text body
    NotFound(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl WordImageError {
    /// Stable label for the error class, used in per-word results.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidField(_) => "invalid_field",
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::Generation(_) => "generation",
            Self::FileIo(_) => "file_io",
            Self::Template(_) => "template",
            Self::NotFound(_) => "not_found",
            Self::InternalServerError(_) => "internal",
        }
    }
}

impl std::fmt::Display for WordImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(message) => write!(f, "{message}"),
            Self::InvalidField(message) => write!(f, "Invalid input: {message}"),
            Self::Validation(message) => write!(f, "Invalid scene data: {message}"),
            Self::Transport(message) => write!(f, "Request failed: {message}"),
            Self::Generation(message) => write!(f, "Image generation failed: {message}"),
            Self::FileIo(message) => write!(f, "File error: {message}"),
            Self::Template(message) => write!(f, "Template error: {message}"),
            Self::NotFound(message) => write!(f, "{message}"),
            Self::InternalServerError(message) => write!(f, "Internal server error: {message}"),
        }
    }
}

impl std::error::Error for WordImageError {}

impl From<std::io::Error> for WordImageError {
    fn from(err: std::io::Error) -> Self {
        WordImageError::FileIo(err.to_string())
    }
}

impl From<reqwest::Error> for WordImageError {
    fn from(err: reqwest::Error) -> Self {
        WordImageError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for WordImageError {
    fn from(err: serde_json::Error) -> Self {
        WordImageError::Validation(err.to_string())
    }
}

impl From<askama::Error> for WordImageError {
    fn from(err: askama::Error) -> Self {
        WordImageError::Template(err.to_string())
    }
}

impl From<base64::DecodeError> for WordImageError {
    fn from(err: base64::DecodeError) -> Self {
        WordImageError::Generation(format!("invalid base64 image payload: {err}"))
    }
}

impl From<image::ImageError> for WordImageError {
    fn from(err: image::ImageError) -> Self {
        WordImageError::FileIo(err.to_string())
    }
}

impl IntoResponse for WordImageError {
    fn into_response(self) -> axum::response::Response {
        match self {
            WordImageError::MissingField(_) | WordImageError::InvalidField(_) => {
                info!("Bad request: {}", self);
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": self.to_string() })),
                )
                    .into_response()
            }
            WordImageError::NotFound(body) => {
                info!("404 {body}");
                (StatusCode::NOT_FOUND, body).into_response()
            }
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": other.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
