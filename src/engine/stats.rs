//! Session counters and the end-of-run report

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::item::ItemOutcome;

/// Counters for one batch run, updated concurrently by every item task
#[derive(Debug)]
pub struct SessionStats {
    downloaded: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    submitted: u64,
    started: Instant,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl StatsSnapshot {
    pub fn processed(&self) -> u64 {
        self.downloaded + self.skipped + self.failed
    }
}

impl SessionStats {
    /// Start the clock for a run over `submitted` items
    pub fn start(submitted: usize) -> Self {
        Self {
            downloaded: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            submitted: submitted as u64,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn record(&self, outcome: &ItemOutcome) {
        let counter = match outcome {
            ItemOutcome::Skipped { .. } => &self.skipped,
            ItemOutcome::Downloaded { .. } => &self.downloaded,
            ItemOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            downloaded: self.downloaded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Only meaningful once every scheduled item has finished
    pub fn report(&self, interrupted: bool) -> StatsReport {
        let snapshot = self.snapshot();
        let elapsed = self.started.elapsed();
        let processed = snapshot.processed();

        StatsReport {
            started_at: self.started_at,
            downloaded: snapshot.downloaded,
            skipped: snapshot.skipped,
            failed: snapshot.failed,
            pending: self.submitted.saturating_sub(processed),
            total: self.submitted,
            processed,
            elapsed_secs: elapsed.as_secs_f64(),
            throughput: throughput(snapshot.downloaded, elapsed),
            interrupted,
        }
    }
}

/// Images per second, or `None` when either side is zero
pub fn throughput(downloaded: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    (downloaded > 0 && secs > 0.0).then(|| downloaded as f64 / secs)
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub started_at: DateTime<Utc>,
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Items never started because the run was interrupted
    pub pending: u64,
    pub total: u64,
    pub processed: u64,
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<f64>,
    pub interrupted: bool,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.interrupted {
            writeln!(f, "Download interrupted by user")?;
        }
        writeln!(f, "Download statistics:")?;
        writeln!(f, "  downloaded:      {}", self.downloaded)?;
        writeln!(f, "  failed:          {}", self.failed)?;
        writeln!(f, "  skipped:         {}", self.skipped)?;
        writeln!(f, "  total processed: {} of {}", self.processed, self.total)?;
        if self.pending > 0 {
            writeln!(f, "  not started:     {}", self.pending)?;
        }
        write!(f, "  total time:      {:.2} sec", self.elapsed_secs)?;
        if let Some(rate) = self.throughput {
            write!(f, "\n  speed:           {rate:.2} images/sec")?;
        }
        Ok(())
    }
}
