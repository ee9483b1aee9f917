use super::models::Config;
use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("download.batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("download.max_retries must be at least 1")]
    ZeroRetries,

    #[error("http.{field} must be positive")]
    ZeroTimeout { field: &'static str },

    #[error("http.user_agent must not be empty")]
    EmptyUserAgent,

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("source.base_url '{url}' is not a valid URL: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_download(config)?;
    validate_http(config)?;
    validate_source(config)?;
    Ok(())
}

fn validate_download(config: &Config) -> Result<(), ValidationError> {
    if config.download.batch_size == 0 {
        return Err(ValidationError::ZeroBatchSize);
    }
    if config.download.max_retries == 0 {
        return Err(ValidationError::ZeroRetries);
    }
    Ok(())
}

/// Timeouts must be finite and non-zero; headers must be sendable as-is
fn validate_http(config: &Config) -> Result<(), ValidationError> {
    let http = &config.http;

    if http.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "request_timeout_secs",
        });
    }
    if http.connect_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "connect_timeout_secs",
        });
    }
    if http.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }

    for (name, value) in &http.headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| ValidationError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        HeaderValue::from_str(value).map_err(|e| ValidationError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
    }

    Ok(())
}

fn validate_source(config: &Config) -> Result<(), ValidationError> {
    let base = &config.source.base_url;
    let parsed = url::Url::parse(base).map_err(|e| ValidationError::InvalidBaseUrl {
        url: base.clone(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidBaseUrl {
            url: base.clone(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(())
}
