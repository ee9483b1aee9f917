use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub download: DownloadSettings,
    #[serde(default)]
    pub source: SourceSettings,
}

/// Request identity and timeouts shared by page fetches and image downloads
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl HttpSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            headers: BTreeMap::new(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Batch engine tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadSettings {
    /// Items run concurrently per group; groups run one after another
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Attempts per item, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff after attempt `n` is `2^n` of these
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
    /// Files at or below this size are treated as missing or broken
    #[serde(default = "default_min_content_bytes")]
    pub min_content_bytes: ByteSize,
}

impl DownloadSettings {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            backoff_unit_ms: default_backoff_unit_ms(),
            min_content_bytes: default_min_content_bytes(),
        }
    }
}

fn default_batch_size() -> usize {
    20
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_min_content_bytes() -> ByteSize {
    ByteSize(1024)
}

/// Where episode pages and title metadata are fetched from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "https://comic.naver.com".to_string()
}
