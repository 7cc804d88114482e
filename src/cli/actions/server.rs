use crate::{
    api::{self, AppState, CorsPolicy, OriginAllowList, RuntimeMode},
    provider::{AuthorizerClient, AuthorizerConfig},
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub mode: RuntimeMode,
    pub allowed_origins: Vec<String>,
    pub authorizer_client_id: String,
    pub authorizer_url: String,
    pub authorizer_redirect_url: String,
    pub provider_timeout_seconds: u64,
}

/// Build the provider client and origin policy, then serve.
///
/// Everything is validated before the listener is bound.
///
/// # Errors
/// Returns an error if the provider configuration or an allowed origin is invalid, or the server
/// fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let provider_config = AuthorizerConfig::new(
        &args.authorizer_client_id,
        &args.authorizer_url,
        &args.authorizer_redirect_url,
    )
    .context("Invalid identity provider configuration")?
    .with_timeout(Duration::from_secs(args.provider_timeout_seconds));

    let provider = AuthorizerClient::new(&provider_config)
        .context("Failed to build identity provider client")?;

    debug!("identity provider: {:?}", provider_config);

    let allow_list =
        OriginAllowList::parse(&args.allowed_origins).context("Invalid allowed origin")?;
    if allow_list.is_empty() {
        warn!("No allowed origins configured, CORS headers will never be sent");
    } else {
        info!("CORS enabled for {} origin(s)", allow_list.len());
    }

    if args.mode.bypasses_auth() {
        warn!("Running in {} mode: bearer tokens are NOT validated", args.mode);
    }

    let state = AppState::new(Arc::new(provider), args.mode, CorsPolicy::new(allow_list));

    api::new(args.port, state).await
}
