//! API error type mapping the error taxonomy onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::dto::ErrorResponse;
use crate::application::{RelayError, TitleError};
use crate::ports::{GenerationError, StoreError};

/// Errors surfaced by the HTTP handlers.
///
/// Mapping: validation → 400, not-found → 404, everything else → 500.
/// Bodies are always the `{"error": ...}` shape.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed required input.
    Validation(String),
    /// A required credential or endpoint is not configured.
    Config(String),
    /// The generation provider failed before streaming began.
    Provider(GenerationError),
    /// A row-store call failed.
    Store(StoreError),
}

impl ApiError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The configuration error for a missing row store.
    pub fn store_not_configured() -> Self {
        Self::Config("row store is not configured".to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        Self::Provider(err)
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::EmptyMessage => Self::validation(err.to_string()),
            RelayError::MissingCredential => Self::Config(err.to_string()),
            RelayError::Provider(inner) => Self::Provider(inner),
        }
    }
}

impl From<TitleError> for ApiError {
    fn from(err: TitleError) -> Self {
        match err {
            TitleError::MissingCredential => Self::Config(err.to_string()),
            TitleError::Provider(inner) => Self::Provider(inner),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Config(message) => {
                tracing::error!(%message, "configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            ApiError::Provider(error) => {
                tracing::error!(%error, "generation provider error");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
            ApiError::Store(error) if error.is_not_found() => {
                (StatusCode::NOT_FOUND, error.to_string())
            }
            ApiError::Store(error) => {
                tracing::error!(%error, "row store error");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
