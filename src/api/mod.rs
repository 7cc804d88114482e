use crate::provider::IdentityProvider;
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn_with_state,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;

pub mod cors;
pub mod error;
pub(crate) mod handlers;
pub mod middleware;
mod mode;
// Route groups and the OpenAPI document live in openapi.rs.
mod openapi;

pub use cors::{CorsPolicy, OriginAllowList};
pub use middleware::{AuthGuard, DenyReason, IdentityClaims};
pub use mode::RuntimeMode;
pub use openapi::openapi;

/// Immutable per-process state, built once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn IdentityProvider>,
    mode: RuntimeMode,
    cors: Arc<CorsPolicy>,
}

impl AppState {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, mode: RuntimeMode, cors: CorsPolicy) -> Self {
        Self {
            provider,
            mode,
            cors: Arc::new(cors),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> RuntimeMode {
        self.mode
    }
}

/// Compose the request pipeline.
///
/// `/ping` goes through the authorization middleware; the credential routes go
/// through the origin policy, which answers preflight before any handler runs.
pub fn app(state: AppState) -> Router {
    let guard = AuthGuard::new(state.provider.clone(), state.mode);

    let (protected, _) = openapi::protected_routes().split_for_parts();
    let (public, _) = openapi::cors_routes().split_for_parts();

    Router::new()
        .merge(protected.layer(from_fn_with_state(guard, middleware::authorize)))
        .merge(public.layer(from_fn_with_state(state.cors.clone(), cors::origin_policy)))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state.provider)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, state: AppState) -> Result<()> {
    let mode = state.mode();
    let app = app(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{} ({} mode)", port, mode);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}
