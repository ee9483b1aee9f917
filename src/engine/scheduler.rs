//! Group-at-a-time scheduling of work items.
//!
//! The work list is cut into contiguous groups of at most `batch_size`.
//! Every item of a group runs as its own task; the next group starts only
//! after all tasks of the current one have produced an outcome, so peak
//! concurrency never exceeds `batch_size`.

use std::slice::Chunks;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dedup::{DedupGate, GateDecision};
use super::item::{ItemFailure, ItemOutcome, WorkItem};
use super::retry::{RetryExecutor, RetryPolicy};
use super::stats::{SessionStats, StatsReport};
use super::writer::AtomicWriter;
use crate::config::DownloadSettings;
use crate::http::HttpClient;

/// Contiguous groups of at most `batch_size` items, in submission order
pub fn groups(items: &[WorkItem], batch_size: usize) -> Chunks<'_, WorkItem> {
    items.chunks(batch_size.max(1))
}

pub struct BatchScheduler {
    executor: Arc<RetryExecutor>,
    gate: DedupGate,
    batch_size: usize,
}

impl BatchScheduler {
    pub fn new(executor: RetryExecutor, gate: DedupGate, batch_size: usize) -> Self {
        Self {
            executor: Arc::new(executor),
            gate,
            batch_size: batch_size.max(1),
        }
    }

    /// Wire gate, writer and retry policy from `[download]` settings
    pub fn from_settings(client: Arc<dyn HttpClient>, settings: &DownloadSettings) -> Self {
        let min_bytes = settings.min_content_bytes.as_u64();
        let policy = RetryPolicy {
            max_attempts: settings.max_retries,
            backoff_unit: settings.backoff_unit(),
        };
        let executor = RetryExecutor::new(client, AtomicWriter::new(min_bytes), policy);
        Self::new(executor, DedupGate::new(min_bytes), settings.batch_size)
    }

    /// Run every item to an outcome, one group at a time.
    ///
    /// Once `cancel` fires no further group is started; the report then
    /// counts the untouched items as pending.
    pub async fn run(&self, items: Vec<WorkItem>, cancel: &CancellationToken) -> StatsReport {
        let stats = Arc::new(SessionStats::start(items.len()));
        let group_count = items.len().div_ceil(self.batch_size);

        info!(
            items = items.len(),
            groups = group_count,
            batch_size = self.batch_size,
            "Starting downloads"
        );

        for (index, group) in groups(&items, self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    skipped_groups = group_count - index,
                    "Interrupted, not starting remaining groups"
                );
                break;
            }
            debug!(group = index + 1, size = group.len(), "Dispatching group");
            self.run_group(group, &stats, cancel).await;
            debug!(group = index + 1, "Group complete");
        }

        stats.report(cancel.is_cancelled())
    }

    async fn run_group(
        &self,
        group: &[WorkItem],
        stats: &Arc<SessionStats>,
        cancel: &CancellationToken,
    ) {
        let mut tasks = JoinSet::new();

        for item in group {
            let item = item.clone();
            let executor = Arc::clone(&self.executor);
            let stats = Arc::clone(stats);
            let gate = self.gate;
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let outcome = process_item(&item, gate, &executor, &cancel).await;
                stats.record(&outcome);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            // A task that panicked never recorded its outcome
            if let Err(e) = joined {
                error!(error = %e, "Download task aborted");
                stats.record(&ItemOutcome::Failed(ItemFailure::Aborted(e.to_string())));
            }
        }
    }
}

/// Dedup check, then fetch only if the destination is not already valid
pub async fn process_item(
    item: &WorkItem,
    gate: DedupGate,
    executor: &RetryExecutor,
    cancel: &CancellationToken,
) -> ItemOutcome {
    match gate.check(item.destination()).await {
        GateDecision::AlreadySatisfied { existing_bytes } => {
            info!(file = %item.file_name(), existing_bytes, "Skipped (exists)");
            ItemOutcome::Skipped { existing_bytes }
        }
        GateDecision::NeedsFetch => executor.execute(item, cancel).await,
    }
}
