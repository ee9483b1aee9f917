//! Episode sources: turn a comic id and episode range into work items.
//!
//! The engine never looks at HTML; a source hands it a flat, ordered list of
//! (image URL, destination) pairs.

mod naver;

pub use naver::NaverWebtoon;

use async_trait::async_trait;
use std::ops::RangeInclusive;
use std::path::Path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::WorkItem;
use crate::http::FetchError;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("no image viewer on episode {episode}")]
    NoViewer { episode: u32 },

    #[error("no title metadata for comic {comic_id}")]
    NoTitle { comic_id: u64 },
}

#[async_trait]
pub trait EpisodeSource: Send + Sync {
    /// Display title, already safe to use as a directory name
    async fn title(&self, comic_id: u64) -> Result<String, SourceError>;

    /// Absolute image URLs of one episode, in reading order
    async fn episode_images(&self, comic_id: u64, episode: u32)
    -> Result<Vec<String>, SourceError>;
}

/// Title for the output directory, or `comic_<id>` when lookup fails or the
/// title would not name a directory below the output path
pub async fn title_or_fallback(source: &dyn EpisodeSource, comic_id: u64) -> String {
    let fallback = || format!("comic_{comic_id}");

    match source.title(comic_id).await.map(|raw| sanitize_title(&raw)) {
        Ok(title) if is_plain_dir_name(&title) => title,
        Ok(title) => {
            warn!(comic_id, title = %title, "Unusable title, using fallback name");
            fallback()
        }
        Err(e) => {
            warn!(comic_id, error = %e, "Title lookup failed, using fallback name");
            fallback()
        }
    }
}

/// Empty names and `.`/`..` style names would resolve outside the comic folder
fn is_plain_dir_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().all(|c| c == '.')
}

/// Replace characters that are not allowed in file names
pub fn sanitize_title(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '-',
            other => other,
        })
        .collect()
}

/// Build the work list for `episodes`, stored as `<root>/<episode>/<index>.jpg`.
///
/// Episodes that cannot be fetched or have no images are logged and skipped.
/// Once `cancel` fires no further page is requested and the items collected
/// so far are returned.
pub async fn collect_work_items(
    source: &dyn EpisodeSource,
    comic_id: u64,
    episodes: RangeInclusive<u32>,
    root: &Path,
    cancel: &CancellationToken,
) -> Vec<WorkItem> {
    let mut items = Vec::new();

    for episode in episodes {
        if cancel.is_cancelled() {
            warn!(episode, "Interrupted, not collecting remaining episodes");
            break;
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                warn!(episode, "Interrupted while fetching episode page");
                break;
            }
            result = source.episode_images(comic_id, episode) => result,
        };

        match result {
            Ok(links) if links.is_empty() => {
                warn!(episode, "No images found in episode");
            }
            Ok(links) => {
                info!(episode, images = links.len(), "Episode images found");
                let dir = root.join(episode.to_string());
                items.extend(
                    links
                        .into_iter()
                        .enumerate()
                        .map(|(index, url)| WorkItem::new(url, dir.join(format!("{index}.jpg")))),
                );
            }
            Err(SourceError::NoViewer { .. }) => {
                warn!(episode, "No images found in episode");
            }
            Err(e) => {
                warn!(episode, error = %e, "Failed to fetch episode");
            }
        }
    }

    items
}
