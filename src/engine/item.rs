use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One image to materialize on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    source_url: String,
    destination: PathBuf,
}

impl WorkItem {
    pub fn new(source_url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination: destination.into(),
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Final path component, used to label console events
    pub fn file_name(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.destination.display().to_string())
    }
}

/// Terminal result for a single [`WorkItem`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Destination already held valid content; nothing was fetched
    Skipped { existing_bytes: u64 },
    Downloaded { bytes: u64, attempts: u32 },
    Failed(ItemFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemFailure {
    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("interrupted")]
    Interrupted,

    #[error("task aborted: {0}")]
    Aborted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_destination() {
        let item = WorkItem::new("https://img.example/a.jpg", "/out/Title/3/7.jpg");
        assert_eq!(item.file_name(), "7.jpg");
        assert_eq!(item.source_url(), "https://img.example/a.jpg");
        assert_eq!(item.destination(), Path::new("/out/Title/3/7.jpg"));
    }

    #[test]
    fn test_failure_reason_mentions_retries() {
        let failure = ItemFailure::RetriesExhausted {
            attempts: 5,
            last_error: "HTTP 503: Service Unavailable".to_string(),
        };
        assert!(failure.to_string().starts_with("max retries exceeded"));
    }
}
