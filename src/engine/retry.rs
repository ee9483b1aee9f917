//! Bounded retry with exponential backoff for a single work item.
//!
//! Each item walks `Attempting -> {Done | BackingOff -> Attempting | Exhausted}`.
//! Any failure inside an attempt (transport error, timeout, non-2xx status,
//! rejected body) is retryable; the only ways out early are success and
//! cancellation.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::item::{ItemFailure, ItemOutcome, WorkItem};
use super::writer::AtomicWriter;
use crate::http::HttpClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per item, including the first
    pub max_attempts: u32,
    /// Backoff after attempt `n` (1-based) is `2^n` units
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_unit.saturating_mul(factor)
    }
}

/// Result of one fetch-and-store attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Success { bytes: u64 },
    RetryableFailure(String),
}

#[derive(Debug)]
enum RetryState {
    Attempting { attempt: u32 },
    BackingOff { attempt: u32 },
    Exhausted { attempts: u32 },
}

pub struct RetryExecutor {
    client: Arc<dyn HttpClient>,
    writer: AtomicWriter,
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(client: Arc<dyn HttpClient>, writer: AtomicWriter, policy: RetryPolicy) -> Self {
        Self {
            client,
            writer,
            policy,
        }
    }

    /// Drive `item` to a terminal outcome.
    ///
    /// Cancellation is observed before each attempt and during backoff; an
    /// attempt already in flight runs to completion.
    pub async fn execute(&self, item: &WorkItem, cancel: &CancellationToken) -> ItemOutcome {
        let file = item.file_name();
        let mut last_error = String::new();
        let mut state = RetryState::Attempting { attempt: 1 };

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    if cancel.is_cancelled() {
                        return ItemOutcome::Failed(ItemFailure::Interrupted);
                    }
                    match self.attempt(item).await {
                        AttemptResult::Success { bytes } => {
                            info!(file = %file, bytes, attempts = attempt, "Downloaded");
                            return ItemOutcome::Downloaded {
                                bytes,
                                attempts: attempt,
                            };
                        }
                        AttemptResult::RetryableFailure(reason) => {
                            warn!(
                                file = %file,
                                url = item.source_url(),
                                attempt,
                                error = %reason,
                                "Download attempt failed"
                            );
                            last_error = reason;
                            RetryState::BackingOff { attempt }
                        }
                    }
                }
                RetryState::BackingOff { attempt } => {
                    let last = attempt >= self.policy.max_attempts;
                    let delay = self.policy.backoff(attempt);
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            // The final wait ends in exhaustion either way
                            if !last {
                                warn!(file = %file, attempt, "Interrupted during backoff");
                                return ItemOutcome::Failed(ItemFailure::Interrupted);
                            }
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    if last {
                        RetryState::Exhausted { attempts: attempt }
                    } else {
                        RetryState::Attempting {
                            attempt: attempt + 1,
                        }
                    }
                }
                RetryState::Exhausted { attempts } => {
                    error!(
                        file = %file,
                        url = item.source_url(),
                        attempts,
                        error = %last_error,
                        "Failed to download after {} attempts",
                        attempts
                    );
                    return ItemOutcome::Failed(ItemFailure::RetriesExhausted {
                        attempts,
                        last_error,
                    });
                }
            };
        }
    }

    /// One GET plus atomic store; every failure is reported as retryable
    pub async fn attempt(&self, item: &WorkItem) -> AttemptResult {
        let body = match self.client.get_bytes(item.source_url()).await {
            Ok(body) => body,
            Err(e) => return AttemptResult::RetryableFailure(e.to_string()),
        };

        match self.writer.write(&body, item.destination()).await {
            Ok(bytes) => AttemptResult::Success { bytes },
            Err(e) => AttemptResult::RetryableFailure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{FetchError, Result as FetchResult};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::time::Instant;

    /// Replays a fixed script of responses and records when each call happened
    struct ScriptedClient {
        script: Mutex<Vec<FetchResult<Bytes>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedClient {
        fn new(mut script: Vec<FetchResult<Bytes>>) -> Arc<Self> {
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn always_failing() -> Arc<Self> {
            Self::new(Vec::new())
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn get_bytes(&self, _url: &str) -> FetchResult<Bytes> {
            self.calls.lock().unwrap().push(Instant::now());
            self.script.lock().unwrap().pop().unwrap_or(Err(FetchError::Status {
                code: 503,
                reason: "Service Unavailable".to_string(),
            }))
        }

        async fn get_text(&self, _url: &str) -> FetchResult<String> {
            Err(FetchError::Request("not used".to_string()))
        }
    }

    fn executor(client: Arc<ScriptedClient>, unit: Duration) -> RetryExecutor {
        RetryExecutor::new(
            client,
            AtomicWriter::new(1024),
            RetryPolicy {
                max_attempts: 5,
                backoff_unit: unit,
            },
        )
    }

    #[test]
    fn test_backoff_doubles_from_two_units() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=5).map(|a| policy.backoff(a).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32]);
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(40), Duration::from_secs(u32::MAX as u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_endpoint_exhausts_with_exponential_delays() {
        let dir = TempDir::new().unwrap();
        let client = ScriptedClient::always_failing();
        let exec = executor(Arc::clone(&client), Duration::from_secs(1));
        let item = WorkItem::new("http://img/0.jpg", dir.path().join("0.jpg"));

        let started = Instant::now();
        let outcome = exec.execute(&item, &CancellationToken::new()).await;

        assert!(matches!(
            outcome,
            ItemOutcome::Failed(ItemFailure::RetriesExhausted { attempts: 5, .. })
        ));

        let calls = client.call_times();
        assert_eq!(calls.len(), 5);
        let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
        let expected = [2u64, 4, 8, 16];
        for (gap, secs) in gaps.iter().zip(expected) {
            let want = Duration::from_secs(secs);
            assert!(
                *gap >= want && *gap < want + Duration::from_millis(100),
                "gap {gap:?}, expected about {want:?}"
            );
        }
        // The final 32-unit backoff runs before the item is declared failed
        assert!(started.elapsed() >= Duration::from_secs(62));
        assert!(!item.destination().exists());
    }

    #[tokio::test]
    async fn test_recovers_after_two_failures() {
        let dir = TempDir::new().unwrap();
        let client = ScriptedClient::new(vec![
            Err(FetchError::Timeout),
            Err(FetchError::Status {
                code: 500,
                reason: "Internal Server Error".to_string(),
            }),
            Ok(Bytes::from(vec![1u8; 4096])),
        ]);
        let exec = executor(Arc::clone(&client), Duration::from_millis(1));
        let item = WorkItem::new("http://img/0.jpg", dir.path().join("ep").join("0.jpg"));

        let outcome = exec.execute(&item, &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            ItemOutcome::Downloaded {
                bytes: 4096,
                attempts: 3
            }
        );
        assert_eq!(client.call_times().len(), 3);
        assert_eq!(std::fs::metadata(item.destination()).unwrap().len(), 4096);
        let leftovers = std::fs::read_dir(dir.path().join("ep")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_undersized_body_is_retried_not_promoted() {
        let dir = TempDir::new().unwrap();
        let client = ScriptedClient::new(vec![
            Ok(Bytes::from_static(b"")),
            Ok(Bytes::from_static(b"<html>blocked</html>")),
            Ok(Bytes::from(vec![5u8; 2048])),
        ]);
        let exec = executor(Arc::clone(&client), Duration::from_millis(1));
        let item = WorkItem::new("http://img/1.jpg", dir.path().join("1.jpg"));

        let outcome = exec.execute(&item, &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            ItemOutcome::Downloaded {
                bytes: 2048,
                attempts: 3
            }
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_last_error_is_reported() {
        let dir = TempDir::new().unwrap();
        let client = ScriptedClient::new((0..5).map(|_| Ok(Bytes::from_static(b"tiny"))).collect());
        let exec = executor(client, Duration::from_millis(1));
        let item = WorkItem::new("http://img/2.jpg", dir.path().join("2.jpg"));

        match exec.execute(&item, &CancellationToken::new()).await {
            ItemOutcome::Failed(ItemFailure::RetriesExhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 5);
                assert!(last_error.contains("body too small"), "{last_error}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_request() {
        let dir = TempDir::new().unwrap();
        let client = ScriptedClient::always_failing();
        let exec = executor(Arc::clone(&client), Duration::from_millis(1));
        let item = WorkItem::new("http://img/3.jpg", dir.path().join("3.jpg"));

        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(
            exec.execute(&item, &cancel).await,
            ItemOutcome::Failed(ItemFailure::Interrupted)
        );
        assert!(client.call_times().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_retrying() {
        let dir = TempDir::new().unwrap();
        let client = ScriptedClient::always_failing();
        let exec = executor(Arc::clone(&client), Duration::from_secs(1));
        let item = WorkItem::new("http://img/4.jpg", dir.path().join("4.jpg"));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let outcome = exec.execute(&item, &cancel).await;

        assert_eq!(outcome, ItemOutcome::Failed(ItemFailure::Interrupted));
        // First attempt at t=0, second at t=2, cancelled while waiting 4 units
        assert_eq!(client.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_final_wait_still_reports_exhaustion() {
        let dir = TempDir::new().unwrap();
        let client = ScriptedClient::always_failing();
        let exec = executor(Arc::clone(&client), Duration::from_secs(1));
        let item = WorkItem::new("http://img/5.jpg", dir.path().join("5.jpg"));

        // Attempts run at t=0, 2, 6, 14 and 30; the final wait lasts until t=62
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(40)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let outcome = exec.execute(&item, &cancel).await;

        assert!(matches!(
            outcome,
            ItemOutcome::Failed(ItemFailure::RetriesExhausted { attempts: 5, .. })
        ));
        assert_eq!(client.call_times().len(), 5);
        assert!(started.elapsed() < Duration::from_secs(62));
    }
}
