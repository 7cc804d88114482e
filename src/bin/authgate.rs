use anyhow::{Result, anyhow};
use authgate::cli;
use rustls::crypto::ring;

/// reqwest talks TLS to the identity provider and tonic to the OTLP collector;
/// both need a process-wide rustls provider before the first handshake.
fn install_crypto_provider() -> Result<()> {
    ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("TLS crypto provider initialization failed"))
}

#[tokio::main]
async fn main() -> Result<()> {
    install_crypto_provider()?;

    cli::start()?.execute().await
}
