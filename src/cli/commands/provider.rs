use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_CLIENT_ID: &str = "authorizer-client-id";
pub const ARG_URL: &str = "authorizer-url";
pub const ARG_REDIRECT_URL: &str = "authorizer-redirect-url";
pub const ARG_TIMEOUT: &str = "provider-timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CLIENT_ID)
                .long(ARG_CLIENT_ID)
                .help("Authorizer client id")
                .env("AUTHORIZER_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_URL)
                .long(ARG_URL)
                .help("Authorizer base URL, example: https://auth.example.com")
                .env("AUTHORIZER_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_REDIRECT_URL)
                .long(ARG_REDIRECT_URL)
                .help("Redirect URL sent with signup and password reset requests")
                .env("AUTHORIZER_REDIRECT_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Timeout in seconds for each identity provider call")
                .env("AUTHGATE_PROVIDER_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..=300)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub client_id: String,
    pub url: String,
    pub redirect_url: String,
    pub timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required provider argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let required = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .with_context(|| format!("missing required argument: --{id}"))
        };

        Ok(Self {
            client_id: required(ARG_CLIENT_ID)?,
            url: required(ARG_URL)?,
            redirect_url: required(ARG_REDIRECT_URL)?,
            timeout_seconds: matches.get_one::<u64>(ARG_TIMEOUT).copied().unwrap_or(10),
        })
    }
}
