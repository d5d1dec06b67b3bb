//! Miscellaneous helper utilities.

use crate::config::AppConfig;
use crate::errors::Result;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Shared HTTP client for the directory and pricing requests.
pub fn build_http_client(config: &AppConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(config.request_timeout)
        .build()?;
    Ok(client)
}
