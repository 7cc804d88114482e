//! End-to-end tests of the request pipeline.
//!
//! The router is driven with `tower::ServiceExt::oneshot` against an in-memory
//! identity provider, so no network or provider instance is required.

use anyhow::Result;
use async_trait::async_trait;
use authgate::{
    api::{AppState, CorsPolicy, OriginAllowList, RuntimeMode, app},
    provider::{
        AuthResponse, IdentityProvider, MessageResponse, ProviderError, TokenType,
        ValidationResult,
    },
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Method, Request, StatusCode,
        HeaderMap,
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_EXPOSE_HEADERS, AUTHORIZATION, CONTENT_TYPE, ORIGIN, VARY,
        },
    },
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tower::ServiceExt;

const GOOD_TOKEN: &str = "good-token";
const GOOD_PASSWORD: &str = "s3cret";
const FRONTEND: &str = "http://localhost:3000";

#[derive(Default)]
struct FakeProvider {
    misconfigured: bool,
    validations: AtomicUsize,
    resets: AtomicUsize,
}

impl FakeProvider {
    fn misconfigured() -> Self {
        Self {
            misconfigured: true,
            ..Self::default()
        }
    }

    fn check_config(&self) -> Result<(), ProviderError> {
        if self.misconfigured {
            return Err(ProviderError::Configuration("client id missing".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn validate_token(
        &self,
        token: &str,
        _token_type: TokenType,
    ) -> Result<ValidationResult, ProviderError> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        self.check_config()?;
        Ok(ValidationResult {
            is_valid: token == GOOD_TOKEN,
            claims: json!({"sub": "user-1"}),
        })
    }

    async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthResponse, ProviderError> {
        self.check_config()?;
        if email != "user@example.com" || password.expose_secret() != GOOD_PASSWORD {
            return Err(ProviderError::Rejected("bad user credentials".to_string()));
        }
        Ok(AuthResponse {
            message: Some("Logged in successfully".to_string()),
            access_token: Some(GOOD_TOKEN.to_string()),
            ..AuthResponse::default()
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &SecretString,
        _confirm_password: &SecretString,
    ) -> Result<AuthResponse, ProviderError> {
        self.check_config()?;
        if email == "taken@example.com" {
            return Err(ProviderError::Rejected(
                "email is already signed up".to_string(),
            ));
        }
        Ok(AuthResponse {
            message: Some("Verification email has been sent".to_string()),
            ..AuthResponse::default()
        })
    }

    async fn forgot_password(&self, _email: &str) -> Result<MessageResponse, ProviderError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.check_config()?;
        Ok(MessageResponse {
            message: "Please check your inbox".to_string(),
        })
    }
}

/// Fails the test if any request gets past the middleware to a handler.
struct UnreachableProvider;

#[async_trait]
impl IdentityProvider for UnreachableProvider {
    async fn validate_token(
        &self,
        _token: &str,
        _token_type: TokenType,
    ) -> Result<ValidationResult, ProviderError> {
        panic!("validate_token called during preflight")
    }

    async fn login(
        &self,
        _email: &str,
        _password: &SecretString,
    ) -> Result<AuthResponse, ProviderError> {
        panic!("login handler reached during preflight")
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &SecretString,
        _confirm_password: &SecretString,
    ) -> Result<AuthResponse, ProviderError> {
        panic!("signup handler reached during preflight")
    }

    async fn forgot_password(&self, _email: &str) -> Result<MessageResponse, ProviderError> {
        panic!("forgot-password handler reached during preflight")
    }
}

fn router_with(provider: Arc<dyn IdentityProvider>, mode: RuntimeMode) -> Router {
    let cors = CorsPolicy::new(OriginAllowList::new([FRONTEND, "https://hanglive.com"]));
    app(AppState::new(provider, mode, cors))
}

fn router(provider: Arc<FakeProvider>, mode: RuntimeMode) -> Router {
    router_with(provider, mode)
}

fn has_cors_headers(headers: &HeaderMap) -> [bool; 5] {
    [
        ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        ACCESS_CONTROL_EXPOSE_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_HEADERS,
    ]
    .map(|name| headers.contains_key(name))
}

fn varies_on_origin(headers: &HeaderMap) -> bool {
    headers
        .get_all(VARY)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.eq_ignore_ascii_case("origin"))
}

fn ping(authorization: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(Method::GET).uri("/ping");
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    Ok(builder.body(Body::empty())?)
}

fn post_json(uri: &str, origin: Option<&str>, body: &str) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(origin) = origin {
        builder = builder.header(ORIGIN, origin);
    }
    Ok(builder.body(Body::from(body.to_string()))?)
}

async fn json_body(response: axum::response::Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn ping_without_authorization_is_unauthorized() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let response = router(provider.clone(), RuntimeMode::Production)
        .oneshot(ping(None)?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await?, json!("unauthorized"));
    assert_eq!(provider.validations.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn ping_with_scheme_only_is_unauthorized() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let response = router(provider.clone(), RuntimeMode::Production)
        .oneshot(ping(Some("Bearer"))?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(provider.validations.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn ping_with_invalid_token_is_unauthorized() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let response = router(provider.clone(), RuntimeMode::Production)
        .oneshot(ping(Some("Bearer forged"))?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await?, json!("unauthorized"));
    assert_eq!(provider.validations.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn ping_with_misconfigured_provider_is_unauthorized() -> Result<()> {
    let provider = Arc::new(FakeProvider::misconfigured());
    let response = router(provider, RuntimeMode::Production)
        .oneshot(ping(Some(&format!("Bearer {GOOD_TOKEN}")))?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn ping_with_valid_token_returns_pong() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let response = router(provider, RuntimeMode::Production)
        .oneshot(ping(Some(&format!("Bearer {GOOD_TOKEN}")))?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await?, json!({"message": "pong"}));
    Ok(())
}

#[tokio::test]
async fn local_mode_skips_validation_every_time() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let app = router(provider.clone(), RuntimeMode::Local);

    for _ in 0..3 {
        let response = app.clone().oneshot(ping(None)?).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(provider.validations.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn allowed_origin_is_echoed() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let body = json!({"email": "user@example.com", "password": GOOD_PASSWORD}).to_string();
    let response = router(provider, RuntimeMode::Production)
        .oneshot(post_json("/login", Some(FRONTEND), &body)?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some(FRONTEND)
    );
    assert_eq!(
        response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|value| value.to_str().ok()),
        Some("true")
    );
    Ok(())
}

#[tokio::test]
async fn unknown_or_empty_origin_gets_no_cors_headers() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let app = router(provider, RuntimeMode::Production);
    let body = json!({"email": "user@example.com", "password": GOOD_PASSWORD}).to_string();

    for origin in [Some("https://evil.example"), Some(""), None] {
        let response = app
            .clone()
            .oneshot(post_json("/login", origin, &body)?)
            .await?;
        // the request is still served, only the browser rejects it
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            !response
                .headers()
                .contains_key(ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
    Ok(())
}

#[tokio::test]
async fn preflight_is_answered_without_reaching_handler() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let app = router(provider.clone(), RuntimeMode::Production);

    for uri in ["/login", "/signup", "/forgot-password"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(uri)
            .header(ORIGIN, FRONTEND)
            .header("access-control-request-method", "POST")
            .body(Body::empty())?;
        let response = app.clone().oneshot(request).await?;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get(ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some(FRONTEND)
        );
        assert!(
            response
                .headers()
                .contains_key(ACCESS_CONTROL_ALLOW_METHODS)
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        assert!(bytes.is_empty());
    }

    assert_eq!(provider.resets.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn preflight_ignores_body_and_origin_never_reaches_handler() -> Result<()> {
    let app = router_with(Arc::new(UnreachableProvider), RuntimeMode::Production);

    let cases = [
        (
            Some("https://evil.example"),
            json!({"email": "user@example.com", "password": GOOD_PASSWORD}).to_string(),
            false,
        ),
        (None, "\u{0}garbage\u{7f}".to_string(), false),
        (Some(FRONTEND), "{not json".to_string(), true),
    ];

    for (origin, body, allowed) in cases {
        let mut builder = Request::builder()
            .method(Method::OPTIONS)
            .uri("/login")
            .header(CONTENT_TYPE, "application/json");
        if let Some(origin) = origin {
            builder = builder.header(ORIGIN, origin);
        }
        let response = app.clone().oneshot(builder.body(Body::from(body))?).await?;

        assert_eq!(response.status(), StatusCode::NO_CONTENT, "{origin:?}");
        assert_eq!(has_cors_headers(response.headers()), [allowed; 5], "{origin:?}");
        assert!(varies_on_origin(response.headers()), "{origin:?}");
        if allowed {
            assert_eq!(
                response
                    .headers()
                    .get(ACCESS_CONTROL_ALLOW_ORIGIN)
                    .and_then(|value| value.to_str().ok()),
                origin
            );
        }

        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        assert!(bytes.is_empty(), "{origin:?}");
    }
    Ok(())
}

#[tokio::test]
async fn vary_origin_is_set_for_every_origin() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let app = router(provider, RuntimeMode::Production);
    let body = json!({"email": "user@example.com", "password": GOOD_PASSWORD}).to_string();

    for origin in [Some(FRONTEND), Some("https://evil.example"), None] {
        let response = app
            .clone()
            .oneshot(post_json("/login", origin, &body)?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(varies_on_origin(response.headers()), "{origin:?}");
        assert_eq!(
            response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN),
            origin == Some(FRONTEND)
        );
    }
    Ok(())
}

#[tokio::test]
async fn login_returns_message_and_token() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let body = json!({"email": "user@example.com", "password": GOOD_PASSWORD}).to_string();
    let response = router(provider, RuntimeMode::Production)
        .oneshot(post_json("/login", None, &body)?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await?,
        json!({"message": "Logged in successfully", "token": GOOD_TOKEN})
    );
    Ok(())
}

#[tokio::test]
async fn login_rejection_is_passed_through() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let body = json!({"email": "user@example.com", "password": "wrong"}).to_string();
    let response = router(provider, RuntimeMode::Production)
        .oneshot(post_json("/login", None, &body)?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await?,
        json!({"error": "bad user credentials"})
    );
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_bad_request() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let app = router(provider, RuntimeMode::Production);

    for uri in ["/login", "/signup", "/forgot-password"] {
        let response = app
            .clone()
            .oneshot(post_json(uri, None, "{not json")?)
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = json_body(response).await?;
        assert!(body.get("error").is_some(), "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn signup_with_mismatched_passwords_is_bad_request() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let body = json!({
        "email": "new@example.com",
        "password": "one",
        "confirmPassword": "two"
    })
    .to_string();
    let response = router(provider, RuntimeMode::Production)
        .oneshot(post_json("/signup", Some(FRONTEND), &body)?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some(FRONTEND)
    );
    assert_eq!(
        json_body(response).await?,
        json!({"error": "password and confirmPassword do not match"})
    );
    Ok(())
}

#[tokio::test]
async fn signup_returns_provider_message() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let app = router(provider, RuntimeMode::Production);

    let body = json!({
        "email": "new@example.com",
        "password": GOOD_PASSWORD,
        "confirmPassword": GOOD_PASSWORD
    })
    .to_string();
    let response = app.clone().oneshot(post_json("/signup", None, &body)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await?,
        json!({"message": "Verification email has been sent"})
    );

    let body = json!({
        "email": "taken@example.com",
        "password": GOOD_PASSWORD,
        "confirmPassword": GOOD_PASSWORD
    })
    .to_string();
    let response = app.oneshot(post_json("/signup", None, &body)?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await?,
        json!({"error": "email is already signed up"})
    );
    Ok(())
}

#[tokio::test]
async fn forgot_password_with_invalid_email_skips_provider() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let body = json!({"email": "not-an-email"}).to_string();
    let response = router(provider.clone(), RuntimeMode::Production)
        .oneshot(post_json("/forgot-password", None, &body)?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.resets.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn forgot_password_returns_provider_message() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let body = json!({"email": "user@example.com"}).to_string();
    let response = router(provider.clone(), RuntimeMode::Production)
        .oneshot(post_json("/forgot-password", None, &body)?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await?,
        json!({"message": "Please check your inbox"})
    );
    assert_eq!(provider.resets.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn misconfigured_provider_is_internal_error() -> Result<()> {
    let provider = Arc::new(FakeProvider::misconfigured());
    let app = router(provider, RuntimeMode::Production);

    let requests = [
        ("/forgot-password", json!({"email": "user@example.com"})),
        (
            "/login",
            json!({"email": "user@example.com", "password": GOOD_PASSWORD}),
        ),
    ];

    for (uri, body) in requests {
        let response = app
            .clone()
            .oneshot(post_json(uri, None, &body.to_string())?)
            .await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(
            json_body(response).await?,
            json!({"error": "Internal server error"})
        );
    }
    Ok(())
}

#[tokio::test]
async fn login_token_unlocks_ping() -> Result<()> {
    let provider = Arc::new(FakeProvider::default());
    let app = router(provider, RuntimeMode::Production);

    let body = json!({"email": "user@example.com", "password": GOOD_PASSWORD}).to_string();
    let response = app.clone().oneshot(post_json("/login", None, &body)?).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let login = json_body(response).await?;
    let token = login
        .get("token")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    assert!(!token.is_empty());

    let response = app.oneshot(ping(Some(&format!("Bearer {token}")))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
