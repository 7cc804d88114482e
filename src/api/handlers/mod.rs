//! Route handlers and the request validation they share.
//!
//! Each handler parses its body exactly once into a locally defined request
//! model, validates it, then makes a single call to the identity provider.

pub mod forgot_password;
pub mod login;
pub mod ping;
pub mod signup;

use super::error::ApiError;
use axum::{Json, extract::rejection::JsonRejection};
use regex::Regex;
use std::sync::LazyLock;
use tracing::error;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Lightweight email sanity check run before anything is sent upstream.
pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

/// Unwrap the JSON extractor, turning any rejection into a `400`.
pub(crate) fn parse_body<T>(
    route: &str,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            error!("error binding {route} request: {}", rejection.body_text());
            Err(ApiError::from(rejection))
        }
    }
}

pub(crate) fn require_email(email: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() {
        return Err(ApiError::BadRequest("email is required".to_string()));
    }
    if !valid_email(email) {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }
    Ok(())
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}
