//! # Authgate (Authentication Gateway)
//!
//! `authgate` sits in front of an Authorizer identity provider and mediates
//! every credential operation. It keeps no state of its own: no sessions, no
//! tokens, no passwords.
//!
//! ## Routes
//!
//! - `GET /ping` is protected by the bearer-token middleware.
//! - `POST /login`, `POST /signup` and `POST /forgot-password` are public and
//!   cross-origin enabled for the configured frontend origins.
//!
//! ## Authorization
//!
//! Protected routes require `Authorization: <scheme> <token>`. The token is
//! validated as an ID token by the provider on every request. All denials share
//! a single `401 "unauthorized"` response; the reason is only logged.
//!
//! ## Local mode
//!
//! Running with `--env local` disables token validation for local testing. The
//! default mode is `production`.

pub mod api;
pub mod cli;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
