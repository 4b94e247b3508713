//! HTTP client construction for lookups.
//!
//! Timeouts, user agent and compression are set in one place so every lookup
//! client behaves the same.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use super::LookupError;

/// Default whole-request timeout for a lookup.
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 30;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/iTaxoTools/refstyle";

/// User-Agent sent with every lookup request.
#[must_use]
pub(crate) fn lookup_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("refstyle/{version} (reference-formatter; +{PROJECT_UA_URL})")
}

/// Builds the shared lookup client.
///
/// # Errors
///
/// Returns [`LookupError::Client`] when client construction fails.
pub(crate) fn build_lookup_client(timeout: Duration) -> Result<Client, LookupError> {
    match try_build_client(timeout, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Querying system proxy settings panics in some sandboxes.
            warn!("lookup client hit system proxy panic; using env-proxy fallback builder");
            try_build_client(timeout, true).map_err(|failure| match failure {
                BuildClientFailure::Panic => LookupError::Client {
                    message: "construction panicked while initializing networking".to_string(),
                },
                BuildClientFailure::Build(error) => LookupError::Client {
                    message: error.to_string(),
                },
            })
        }
        Err(BuildClientFailure::Build(error)) => Err(LookupError::Client {
            message: error.to_string(),
        }),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    timeout: Duration,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(timeout);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
        .timeout(timeout)
        .user_agent(lookup_user_agent())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = first_env_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = first_env_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn first_env_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_user_agent_identifies_tool() {
        let user_agent = lookup_user_agent();
        assert!(user_agent.starts_with(&format!("refstyle/{}", env!("CARGO_PKG_VERSION"))));
        assert!(user_agent.contains(PROJECT_UA_URL));
    }

    #[test]
    fn test_build_lookup_client_succeeds() {
        assert!(build_lookup_client(Duration::from_secs(5)).is_ok());
    }
}
