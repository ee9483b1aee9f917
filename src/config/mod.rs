//! Configuration management for nava
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use nava::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Batch size: {}", config.download.batch_size);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `NAVA__<section>__<key>`:
//! - `NAVA__DOWNLOAD__BATCH_SIZE=10`
//! - `NAVA__DOWNLOAD__MIN_CONTENT_BYTES=2KB`
//! - `NAVA__HTTP__REQUEST_TIMEOUT_SECS=30`
//!
//! # Configuration File
//!
//! Read from `config/nava.toml` unless `NAVA_CONFIG` points elsewhere.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, DownloadSettings, HttpSettings, SourceSettings};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

/// Values from the command line, applied on top of file and environment
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub batch_size: Option<usize>,
    pub max_retries: Option<u32>,
}

impl Config {
    /// Load configuration from the default file location and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None, &Overrides::default())
    }

    /// Load configuration from a specific path plus environment overrides
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        Self::load_with(Some(path), &Overrides::default())
    }

    /// Load, apply `overrides`, then validate the merged result
    pub fn load_with(path: Option<PathBuf>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = sources::load(path, None)?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(batch_size) = overrides.batch_size {
            self.download.batch_size = batch_size;
        }
        if let Some(max_retries) = overrides.max_retries {
            self.download.max_retries = max_retries;
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}
