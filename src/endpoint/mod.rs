//! Remote query endpoint: the primary responder for write requests.

pub mod client;
pub mod error;

pub use client::{QueryEndpoint, QueryGenerator};
pub use error::{EndpointError, FailureKind};

use crate::config::EndpointConfig;
use std::time::Duration;

/// Build the endpoint client from `[endpoint]` config.
pub fn create_endpoint(config: &EndpointConfig) -> anyhow::Result<QueryEndpoint> {
    let endpoint = QueryEndpoint::new(
        config.url.as_deref(),
        config.api_key.as_deref(),
        Duration::from_secs(config.timeout_secs),
    )?;
    match endpoint.url() {
        Some(url) => tracing::debug!(
            url,
            timeout_secs = config.timeout_secs,
            "remote endpoint configured"
        ),
        None => tracing::info!("no remote endpoint configured; writes use the hosted model"),
    }
    Ok(endpoint)
}
