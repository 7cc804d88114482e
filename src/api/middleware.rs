//! Bearer-token authorization middleware.
//!
//! Flow Overview: `START -> EXTRACT_TOKEN -> VALIDATE -> {ALLOW, DENY}`.
//! Local mode short-circuits straight to ALLOW. Every denial produces the same
//! `401 "unauthorized"`; the [`DenyReason`] only reaches the logs.

use super::RuntimeMode;
use crate::provider::{IdentityProvider, TokenType, ValidationResult};
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

/// Internal cause of an authorization failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The provider client cannot be used with its configuration.
    ProviderConfiguration,
    /// Missing header, single segment, or empty token.
    MalformedHeader,
    /// The validation call itself failed (network, timeout, provider error).
    ValidationFailed,
    /// The provider answered and said the token is not valid.
    InvalidToken,
}

impl DenyReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProviderConfiguration => "provider_configuration",
            Self::MalformedHeader => "malformed_header",
            Self::ValidationFailed => "validation_failed",
            Self::InvalidToken => "invalid_token",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims of the validated token, stored in the request extensions on ALLOW.
#[derive(Debug, Clone)]
pub struct IdentityClaims(pub Value);

/// Extract the token from `Authorization: <scheme> <token>`.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut segments = value.split_whitespace();
    let _scheme = segments.next()?;
    segments.next().filter(|token| !token.is_empty())
}

/// Shared state of the authorization middleware.
#[derive(Clone)]
pub struct AuthGuard {
    provider: Arc<dyn IdentityProvider>,
    mode: RuntimeMode,
}

impl AuthGuard {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, mode: RuntimeMode) -> Self {
        Self { provider, mode }
    }

    /// Run the state machine for one request.
    ///
    /// Returns `Ok(None)` when local mode skipped validation.
    ///
    /// # Errors
    /// Returns the [`DenyReason`] when the request must be rejected.
    pub async fn check(&self, headers: &HeaderMap) -> Result<Option<ValidationResult>, DenyReason> {
        if self.mode.bypasses_auth() {
            debug!("authorization bypassed in {} mode", self.mode);
            return Ok(None);
        }

        let Some(token) = bearer_token(headers) else {
            warn!(reason = %DenyReason::MalformedHeader, "unauthorized: missing or malformed authorization header");
            return Err(DenyReason::MalformedHeader);
        };

        let result = match self.provider.validate_token(token, TokenType::IdToken).await {
            Ok(result) => result,
            Err(err) if err.is_configuration() => {
                warn!(reason = %DenyReason::ProviderConfiguration, "unauthorized: identity provider client unusable: {err}");
                return Err(DenyReason::ProviderConfiguration);
            }
            Err(err) => {
                warn!(reason = %DenyReason::ValidationFailed, "unauthorized: token validation failed: {err}");
                return Err(DenyReason::ValidationFailed);
            }
        };

        if !result.is_valid {
            warn!(reason = %DenyReason::InvalidToken, "unauthorized: provider reported token as invalid");
            return Err(DenyReason::InvalidToken);
        }

        Ok(Some(result))
    }
}

impl fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGuard")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// The one response every denial gets.
#[must_use]
pub fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json("unauthorized")).into_response()
}

/// Middleware: gate the wrapped routes on a valid bearer token.
pub async fn authorize(State(guard): State<AuthGuard>, mut request: Request, next: Next) -> Response {
    match guard.check(request.headers()).await {
        Ok(Some(result)) => {
            request
                .extensions_mut()
                .insert(IdentityClaims(result.claims));
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(_) => unauthorized(),
    }
}
