//! Authorizer GraphQL client.
//!
//! Every operation is a single `POST {authorizer_url}/graphql`. The client id
//! and provider URL travel as `x-authorizer-client-id` / `x-authorizer-url`
//! headers. GraphQL errors are surfaced as [`ProviderError::Rejected`] with the
//! first error message untouched.

use super::{
    AuthResponse, IdentityProvider, MessageResponse, ProviderError, TokenType, ValidationResult,
};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

const AUTH_TOKEN_FIELDS: &str = "message access_token id_token refresh_token expires_in";

const VALIDATE_JWT_TOKEN: &str = "query validateJWTToken($data: ValidateJWTTokenInput!) { validate_jwt_token(params: $data) { is_valid claims } }";

/// Provider connection settings, validated on construction.
#[derive(Debug, Clone)]
pub struct AuthorizerConfig {
    client_id: String,
    url: Url,
    redirect_url: String,
    timeout: Duration,
}

impl AuthorizerConfig {
    /// # Errors
    /// Returns [`ProviderError::Configuration`] if the client id is blank or the URL is not an
    /// absolute `http(s)` URL.
    pub fn new(client_id: &str, url: &str, redirect_url: &str) -> Result<Self, ProviderError> {
        let client_id = client_id.trim();
        if client_id.is_empty() {
            return Err(ProviderError::Configuration(
                "client id is missing".to_string(),
            ));
        }

        let url = Url::parse(url.trim())
            .map_err(|e| ProviderError::Configuration(format!("invalid URL {url:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProviderError::Configuration(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        Ok(Self {
            client_id: client_id.to_string(),
            url,
            redirect_url: redirect_url.trim().to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn graphql_url(&self) -> Result<Url, ProviderError> {
        let endpoint = format!("{}/graphql", self.url.as_str().trim_end_matches('/'));
        Url::parse(&endpoint)
            .map_err(|e| ProviderError::Configuration(format!("invalid GraphQL endpoint: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Clone)]
pub struct AuthorizerClient {
    http: Client,
    endpoint: Url,
    redirect_url: String,
}

impl AuthorizerClient {
    /// Build the HTTP client once; it is shared by every request.
    ///
    /// # Errors
    /// Returns [`ProviderError::Configuration`] if the headers or HTTP client cannot be built.
    pub fn new(config: &AuthorizerConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-authorizer-client-id"),
            HeaderValue::from_str(config.client_id())
                .map_err(|e| ProviderError::Configuration(format!("invalid client id: {e}")))?,
        );
        headers.insert(
            HeaderName::from_static("x-authorizer-url"),
            HeaderValue::from_str(config.url().as_str().trim_end_matches('/'))
                .map_err(|e| ProviderError::Configuration(format!("invalid URL header: {e}")))?,
        );

        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.graphql_url()?,
            redirect_url: config.redirect_url().to_string(),
        })
    }

    /// Run one GraphQL operation and decode `data.<field>`.
    async fn execute<T: DeserializeOwned>(
        &self,
        field: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let body: GraphQlResponse = response.json().await?;

        if let Some(error) = body.errors.into_iter().next() {
            debug!("{field} rejected by provider: {}", error.message);
            return Err(ProviderError::Rejected(error.message));
        }

        if !status.is_success() {
            return Err(ProviderError::InvalidResponse(format!("HTTP status {status}")));
        }

        let payload = body
            .data
            .and_then(|mut data| data.get_mut(field).map(Value::take))
            .filter(|value| !value.is_null())
            .ok_or_else(|| ProviderError::InvalidResponse(format!("missing {field} in data")))?;

        serde_json::from_value(payload).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    fn redirect_uri(&self) -> Option<&str> {
        if self.redirect_url.is_empty() {
            None
        } else {
            Some(&self.redirect_url)
        }
    }
}

#[async_trait]
impl IdentityProvider for AuthorizerClient {
    #[instrument(skip(self, token))]
    async fn validate_token(
        &self,
        token: &str,
        token_type: TokenType,
    ) -> Result<ValidationResult, ProviderError> {
        self.execute(
            "validate_jwt_token",
            VALIDATE_JWT_TOKEN,
            json!({ "data": { "token_type": token_type, "token": token } }),
        )
        .await
    }

    #[instrument(skip(self, password))]
    async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthResponse, ProviderError> {
        let query = format!(
            "mutation login($data: LoginInput!) {{ login(params: $data) {{ {AUTH_TOKEN_FIELDS} }} }}"
        );
        self.execute(
            "login",
            &query,
            json!({ "data": { "email": email, "password": password.expose_secret() } }),
        )
        .await
    }

    #[instrument(skip(self, password, confirm_password))]
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        confirm_password: &SecretString,
    ) -> Result<AuthResponse, ProviderError> {
        let query = format!(
            "mutation signup($data: SignUpInput!) {{ signup(params: $data) {{ {AUTH_TOKEN_FIELDS} }} }}"
        );
        let mut data = json!({
            "email": email,
            "password": password.expose_secret(),
            "confirm_password": confirm_password.expose_secret(),
        });
        if let Some(uri) = self.redirect_uri() {
            data["redirect_uri"] = Value::String(uri.to_string());
        }

        self.execute("signup", &query, json!({ "data": data })).await
    }

    #[instrument(skip(self))]
    async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ProviderError> {
        let query = "mutation forgotPassword($data: ForgotPasswordInput!) { forgot_password(params: $data) { message } }";
        let mut data = json!({ "email": email });
        if let Some(uri) = self.redirect_uri() {
            data["redirect_uri"] = Value::String(uri.to_string());
        }

        self.execute("forgot_password", query, json!({ "data": data }))
            .await
    }
}
