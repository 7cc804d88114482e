//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary executes.

use crate::api::RuntimeMode;
use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_ENV, ARG_PORT, cors, provider};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000);
    let mode = matches
        .get_one::<RuntimeMode>(ARG_ENV)
        .copied()
        .unwrap_or_default();

    let provider_opts = provider::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        mode,
        allowed_origins: cors::allowed_origins(matches),
        authorizer_client_id: provider_opts.client_id,
        authorizer_url: provider_opts.url,
        authorizer_redirect_url: provider_opts.redirect_url,
        provider_timeout_seconds: provider_opts.timeout_seconds,
    }))
}
