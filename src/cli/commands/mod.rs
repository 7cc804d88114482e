pub mod cors;
pub mod logging;
pub mod provider;

use crate::api::RuntimeMode;
use clap::{
    Arg, ColorChoice, Command,
    builder::{
        ValueParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

pub const ARG_PORT: &str = "port";
pub const ARG_ENV: &str = "env";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("authgate")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("3000")
                .env("AUTHGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_ENV)
                .short('e')
                .long("env")
                .help("Runtime environment: production or local (local skips bearer token validation)")
                .env("AUTHGATE_ENV")
                .default_value("production")
                .value_parser(ValueParser::from(|mode: &str| mode.parse::<RuntimeMode>())),
        );

    let command = provider::with_args(command);
    let command = cors::with_args(command);
    logging::with_args(command)
}
