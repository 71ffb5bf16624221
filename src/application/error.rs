use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{domain::error::DomainError, infra::error::InfraError};

use super::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("resource not found")]
    NotFound,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::Domain(DomainError::Validation { .. }) => StatusCode::BAD_REQUEST,
            AppError::Domain(DomainError::Invariant { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Infra(InfraError::Configuration { .. })
            | AppError::Infra(InfraError::Telemetry(_))
            | AppError::Infra(InfraError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_code(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => "not_found",
            AppError::Domain(DomainError::Validation { .. }) => "bad_request",
            AppError::Store(_) => "store_unavailable",
            _ => "internal_error",
        }
    }

    fn presentation_message(&self) -> String {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => {
                "Resource not found".to_string()
            }
            AppError::Domain(DomainError::Validation { message }) => message.clone(),
            AppError::Store(_) => "Quote store temporarily unavailable".to_string(),
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured".to_string(),
            AppError::Infra(InfraError::Telemetry(_)) => {
                "Logging subsystem could not start".to_string()
            }
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request".to_string(),
            AppError::Domain(DomainError::Invariant { .. }) | AppError::Unexpected(_) => {
                "Unexpected error occurred".to_string()
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: ErrorMessage {
                code: self.public_code().to_string(),
                message: self.presentation_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = AppError::from(DomainError::validation("'hour' must be between 0 and 23"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.presentation_message(), "'hour' must be between 0 and 23");
    }

    #[test]
    fn store_failure_maps_to_service_unavailable() {
        let err = AppError::from(StoreError::transport("connection refused"));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.public_code(), "store_unavailable");
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
    }
}
