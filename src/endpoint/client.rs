//! HTTP client for the remote query-generation endpoint.
//!
//! Wire contract: `POST <url>` with `Authorization: Bearer <key>` and body
//! `{"input_text": "..."}`; success is exactly HTTP 200 with
//! `{"sql_query": "..."}`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::EndpointError;
use crate::providers::sanitize_api_error;

/// Turns a natural-language write request into a query string.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate_query(&self, input_text: &str) -> Result<String, EndpointError>;
    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ScoringRequest<'a> {
    input_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScoringResponse {
    sql_query: String,
}

/// Bearer-authenticated JSON client with a fixed request timeout.
pub struct QueryEndpoint {
    url: Option<String>,
    api_key: Option<String>,
    client: Client,
}

impl QueryEndpoint {
    pub fn new(
        url: Option<&str>,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let url = url.map(str::trim).filter(|u| !u.is_empty()).map(str::to_string);
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        if url.is_some() && api_key.is_none() {
            tracing::warn!(
                "remote endpoint configured without an API key; sending unauthenticated requests"
            );
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build remote endpoint HTTP client: {e}"))?;
        Ok(Self {
            url,
            api_key,
            client,
        })
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

#[async_trait]
impl QueryGenerator for QueryEndpoint {
    async fn generate_query(&self, input_text: &str) -> Result<String, EndpointError> {
        let url = self.url.as_deref().ok_or(EndpointError::NotConfigured)?;

        let mut request = self
            .client
            .post(url)
            .json(&ScoringRequest { input_text });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(EndpointError::Status {
                status: status.as_u16(),
                body: sanitize_api_error(&body),
            });
        }

        let body = response.text().await?;
        let parsed: ScoringResponse = serde_json::from_str(&body)
            .map_err(|e| EndpointError::Malformed(e.to_string()))?;
        Ok(parsed.sql_query)
    }

    fn name(&self) -> &str {
        "query-endpoint"
    }
}
