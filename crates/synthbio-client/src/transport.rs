//! HTTP transport to the query service.

use std::time::Duration;

use serde_json::json;
use synthbio_core::Answer;
use tracing::debug;

use crate::error::ClientError;

/// Environment variable holding the service base URL.
pub const API_URL_ENV: &str = "SYNTHBIO_API_URL";

/// Where the service listens by default.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Client for `POST /query`.
#[derive(Debug, Clone)]
pub struct QueryClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl QueryClient {
    /// Create a client for the service at `base_url`.
    ///
    /// No request timeout is set: the service enforces its own.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("synthbio-client/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ClientError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(QueryClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Create client from `SYNTHBIO_API_URL`, falling back to the local default.
    pub fn from_env() -> Result<Self, ClientError> {
        let url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one question. The question is passed through untouched.
    pub async fn query(&self, question: &str) -> Result<Answer, ClientError> {
        let url = format!("{}/query", self.base_url);
        debug!(%url, question_len = question.len(), "sending query");

        let response = self
            .http_client
            .post(&url)
            .json(&json!({ "question": question }))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Service {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Whether `GET /health` answers 2xx.
    pub async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.http_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
