//! JSON-over-HTTP client shared by the adapters.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::endpoint::Endpoint;

/// Error type for fetch operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FetchError {
    #[error("HTTP error: {status} for {url}")]
    Http {
        status: u16,
        url: String,
        /// Message from an `{"error": {"message": ...}}` body, if any.
        message: Option<String>,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_connect() {
            FetchError::Connection(e.to_string())
        } else if e.is_decode() {
            FetchError::Deserialization(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

/// `{"error": {"message": "..."}}`, or `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Object { message: String },
    Text(String),
}

/// Pull the human-readable message out of an error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let message = match parsed.error {
        ErrorDetail::Object { message } => message,
        ErrorDetail::Text(message) => message,
    };
    (!message.trim().is_empty()).then_some(message)
}

/// POSTs JSON to one endpoint with its timeouts applied.
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl JsonClient {
    /// Build a client for an endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(endpoint: Endpoint) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(endpoint.timeouts.connect)
            .timeout(endpoint.timeouts.total)
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// POST to the endpoint itself.
    pub async fn post<B, T>(&self, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.send(self.endpoint.url.clone(), body).await
    }

    /// POST to a path below the endpoint.
    pub async fn post_to<B, T>(&self, path: &str, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.send(self.endpoint.join(path)?, body).await
    }

    async fn send<B, T>(&self, url: Url, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let started = std::time::Instant::now();
        let response = self.client.post(url.clone()).json(body).send().await?;
        let status = response.status();
        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collaborator responded"
        );

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| FetchError::Deserialization(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        Err(FetchError::Http {
            status: status.as_u16(),
            url: url.to_string(),
            message: error_message(&text),
        })
    }
}
