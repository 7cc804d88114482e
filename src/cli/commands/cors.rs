use clap::{Arg, ArgAction, Command};

pub const ARG_ALLOWED_ORIGINS: &str = "allowed-origins";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_ALLOWED_ORIGINS)
            .long(ARG_ALLOWED_ORIGINS)
            .help("Comma separated origins allowed to call the credential routes, example: https://app.example.com")
            .env("AUTHGATE_ALLOWED_ORIGINS")
            .value_delimiter(',')
            .action(ArgAction::Append)
            .default_value("http://localhost:3000"),
    )
}

/// Configured origins, unvalidated.
#[must_use]
pub fn allowed_origins(matches: &clap::ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>(ARG_ALLOWED_ORIGINS)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}
