use crate::provider::ProviderError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// JSON error payload: `{"error": "..."}`.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler failures mapped to HTTP.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body, failed validation, or provider rejection.
    #[error("{0}")]
    BadRequest(String),
    /// Deployment misconfiguration; details are logged, not returned.
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        if err.is_configuration() {
            error!("identity provider configuration error: {err}");
            Self::Internal
        } else {
            Self::BadRequest(err.to_string())
        }
    }
}
