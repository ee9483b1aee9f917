//! One download session: resolve the title, assemble work, run the engine.

use std::io;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, DownloadSettings};
use crate::engine::{BatchScheduler, StatsReport};
use crate::http::{FetchError, HttpClient, ReqwestClient};
use crate::source::{
    EpisodeSource, NaverWebtoon, SourceError, collect_work_items, title_or_fallback,
};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid episode range: start {start} is after end {end}")]
    InvalidRange { start: u32, end: u32 },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] FetchError),

    #[error("failed to set up episode source: {0}")]
    Source(#[from] SourceError),

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What to download and where
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub comic_id: u64,
    pub episodes: RangeInclusive<u32>,
    pub outpath: PathBuf,
}

impl DownloadRequest {
    pub fn new(comic_id: u64, start: u32, end: u32, outpath: impl Into<PathBuf>) -> Self {
        Self {
            comic_id,
            episodes: start..=end,
            outpath: outpath.into(),
        }
    }
}

/// Run a session against the configured source, stopping early on Ctrl+C
pub async fn run(request: &DownloadRequest, config: &Config) -> Result<StatsReport, RunError> {
    let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(&config.http)?);
    let source = NaverWebtoon::new(Arc::clone(&client), &config.source.base_url)?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    let result = run_with(request, &source, client, &config.download, &cancel).await;
    watcher.abort();
    result
}

/// Session body with injectable collaborators
pub async fn run_with(
    request: &DownloadRequest,
    source: &dyn EpisodeSource,
    client: Arc<dyn HttpClient>,
    settings: &DownloadSettings,
    cancel: &CancellationToken,
) -> Result<StatsReport, RunError> {
    let (start, end) = (*request.episodes.start(), *request.episodes.end());
    if start > end {
        return Err(RunError::InvalidRange { start, end });
    }

    let title = title_or_fallback(source, request.comic_id).await;
    let root = request.outpath.join(&title);
    tokio::fs::create_dir_all(&root)
        .await
        .map_err(|source| RunError::OutputDir {
            path: root.clone(),
            source,
        })?;

    info!(
        comic_id = request.comic_id,
        title = %title,
        start,
        end,
        root = %root.display(),
        "Collecting episodes"
    );

    let items = collect_work_items(
        source,
        request.comic_id,
        request.episodes.clone(),
        &root,
        cancel,
    )
    .await;
    if items.is_empty() && !cancel.is_cancelled() {
        warn!(comic_id = request.comic_id, "No images to download");
    }

    let scheduler = BatchScheduler::from_settings(client, settings);
    Ok(scheduler.run(items, cancel).await)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Interrupt received, finishing current group");
}
