//! HTTP capability shared by the image engine and the episode source

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;
use tracing::debug;

use crate::config::HttpSettings;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },

    #[error("Failed to read body: {0}")]
    Body(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// One GET, no retries; callers own the retry policy.
///
/// Implementations apply their header set and timeout to every request and
/// map any non-success status to [`FetchError::Status`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_bytes(&self, url: &str) -> Result<Bytes>;

    async fn get_text(&self, url: &str) -> Result<String>;
}

/// [`HttpClient`] backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &settings.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::InvalidConfig(format!("header '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::InvalidConfig(format!("header '{name}': {e}")))?;
            headers.insert(header, value);
        }

        let client = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .user_agent(&settings.user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::InvalidConfig(e.to_string()))?;

        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        debug!(url, "GET");

        let response = self.client.get(url).send().await.map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        let bytes = self
            .send(url)
            .await?
            .bytes()
            .await
            .map_err(map_body)?;

        debug!(url, size = bytes.len(), "Body received");
        Ok(bytes)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        self.send(url).await?.text().await.map_err(map_body)
    }
}

fn map_reqwest(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Request(e.to_string())
    }
}

// A timeout can also fire while the body is streaming
fn map_body(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Body(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_client_builds_from_defaults() {
        assert!(ReqwestClient::new(&HttpSettings::default()).is_ok());
    }

    #[test]
    fn test_client_rejects_bad_header() {
        let settings = HttpSettings {
            headers: BTreeMap::from([("bad header".to_string(), "v".to_string())]),
            ..HttpSettings::default()
        };
        assert!(matches!(
            ReqwestClient::new(&settings),
            Err(FetchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_status_error_display() {
        let err = FetchError::Status {
            code: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
    }
}
