//! HTTP client for the agent backend's streaming chat endpoint

use std::time::Duration;

use futures::StreamExt;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    frame::ByteStream,
};

/// Default streaming endpoint of a locally running backend
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/chat/stream";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Status reported by the backend's root endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Streaming chat client
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSource {
    /// Create a client for the given streaming endpoint
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Create a client with a connect timeout. No overall timeout is set, so
    /// long agent runs are never cut off mid-stream.
    pub fn with_connect_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Self::with_client(client, endpoint)
    }

    /// Create from an existing reqwest client
    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        Ok(Self { client, endpoint })
    }

    /// The streaming endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Post a message and return the raw response body as a byte stream.
    pub async fn stream(&self, message: &str) -> Result<ByteStream> {
        tracing::debug!("POST {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("accept", "application/x-ndjson, text/plain")
            .json(&ChatRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::Transport(e.to_string())));
        Ok(Box::pin(body))
    }

    /// Query the backend's root endpoint.
    pub async fn health(&self) -> Result<HealthStatus> {
        let mut url = self.endpoint.clone();
        url.set_path("/");
        url.set_query(None);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
