//! Concurrent batched image acquisition.
//!
//! ## Key Components
//!
//! - [`WorkItem`] / [`ItemOutcome`] - one URL-to-path unit and its terminal result
//! - [`DedupGate`] - skips destinations that already hold valid content
//! - [`RetryExecutor`] - fetch-and-store with exponential backoff
//! - [`AtomicWriter`] - temp file plus rename, never a partial file at the final path
//! - [`BatchScheduler`] - sequential groups of concurrent items
//! - [`SessionStats`] - lock-free counters and the final [`StatsReport`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use nava::engine::{BatchScheduler, WorkItem};
//!
//! let scheduler = BatchScheduler::from_settings(client, &config.download);
//! let items = vec![WorkItem::new("https://host/0.jpg", "out/1/0.jpg")];
//! let report = scheduler.run(items, &cancel).await;
//! println!("{report}");
//! ```

mod dedup;
mod item;
mod retry;
mod scheduler;
mod stats;
mod writer;

pub use dedup::{DedupGate, GateDecision};
pub use item::{ItemFailure, ItemOutcome, WorkItem};
pub use retry::{AttemptResult, RetryExecutor, RetryPolicy};
pub use scheduler::{BatchScheduler, groups, process_item};
pub use stats::{SessionStats, StatsReport, StatsSnapshot, throughput};
pub use writer::{AtomicWriter, WriteError};
