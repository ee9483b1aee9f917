use std::path::Path;

/// Result of checking a destination before any network work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    AlreadySatisfied { existing_bytes: u64 },
    NeedsFetch,
}

/// Skips items whose destination already holds more than `min_bytes`.
///
/// Smaller files are likely saved error pages or truncated bodies and are
/// fetched again.
#[derive(Debug, Clone, Copy)]
pub struct DedupGate {
    min_bytes: u64,
}

impl DedupGate {
    pub fn new(min_bytes: u64) -> Self {
        Self { min_bytes }
    }

    pub async fn check(&self, destination: &Path) -> GateDecision {
        match tokio::fs::metadata(destination).await {
            Ok(meta) if meta.is_file() && meta.len() > self.min_bytes => {
                GateDecision::AlreadySatisfied {
                    existing_bytes: meta.len(),
                }
            }
            _ => GateDecision::NeedsFetch,
        }
    }
}
