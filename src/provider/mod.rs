//! Identity provider abstraction.
//!
//! The gateway never stores credentials or tokens. Every decision is delegated
//! to an [`IdentityProvider`]; the production implementation is
//! [`AuthorizerClient`], which speaks the Authorizer GraphQL API.

pub mod authorizer;
pub use self::authorizer::{AuthorizerClient, AuthorizerConfig};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Token kinds understood by the provider's validation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    AccessToken,
    IdToken,
    RefreshToken,
}

/// Outcome of a token validation call.
///
/// A successful call does not imply a valid token, always check `is_valid`.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub claims: Value,
}

/// Token bundle returned by login and signup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    pub message: Option<String>,
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Plain acknowledgement returned by forgot-password.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The client cannot talk to the provider with the configuration it was given.
    #[error("identity provider misconfigured: {0}")]
    Configuration(String),
    /// Network failure or timeout reaching the provider.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// The provider answered but refused the request. The message is passed through verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("invalid identity provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Configuration failures are deployment problems, not client errors.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Operations the gateway needs from an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validate `token` as a token of kind `token_type`.
    async fn validate_token(
        &self,
        token: &str,
        token_type: TokenType,
    ) -> Result<ValidationResult, ProviderError>;

    async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthResponse, ProviderError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        confirm_password: &SecretString,
    ) -> Result<AuthResponse, ProviderError>;

    async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ProviderError>;
}
