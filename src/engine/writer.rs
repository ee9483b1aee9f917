//! Write-to-temp-then-rename storage for fetched bodies.
//!
//! A destination path only ever holds nothing, its previous content, or a
//! complete body larger than the minimum size. Temporary files live next to
//! the destination so the final rename never crosses filesystems.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("body too small: {size} bytes, must exceed {min}")]
    Undersized { size: u64, min: u64 },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Removes the temporary file when dropped unless it was promoted.
///
/// Covers early returns and a cancelled write future alike.
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn beside(destination: &Path) -> Self {
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = destination.with_file_name(format!("{name}.{}.tmp", Uuid::new_v4().simple()));
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AtomicWriter {
    min_bytes: u64,
}

impl AtomicWriter {
    pub fn new(min_bytes: u64) -> Self {
        Self { min_bytes }
    }

    /// Persist `body` at `destination`, returning the number of bytes stored
    pub async fn write(&self, body: &[u8], destination: &Path) -> Result<u64, WriteError> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| WriteError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut temp = TempFile::beside(destination);

        let mut file = tokio::fs::File::create(temp.path()).await?;
        file.write_all(body).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let size = tokio::fs::metadata(temp.path()).await?.len();
        if size <= self.min_bytes {
            return Err(WriteError::Undersized {
                size,
                min: self.min_bytes,
            });
        }

        tokio::fs::rename(temp.path(), destination).await?;
        temp.disarm();

        Ok(size)
    }
}
