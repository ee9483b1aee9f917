use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "NAVA_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/nava.toml";
const ENV_PREFIX: &str = "NAVA";
const ENV_SEPARATOR: &str = "__";

/// Path of the TOML file: `NAVA_CONFIG` if set, else `config/nava.toml`
pub fn default_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration with priority (lowest first):
/// 1. Defaults (embedded in structs)
/// 2. TOML file at `config_path`, else [`default_path`] (if it exists)
/// 3. Variables from `env_file`, else `.env` found from the working directory
/// 4. Process environment
pub fn load(config_path: Option<PathBuf>, env_file: Option<&Path>) -> Result<Config, ConfigError> {
    read_env_file(env_file);

    load_from_sources(config_path.unwrap_or_else(default_path))
}

/// Export `.env` entries not already set in the process environment
fn read_env_file(env_file: Option<&Path>) {
    let result = match env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };

    // A missing .env is fine
    if let Err(e) = result {
        if !e.not_found() {
            tracing::warn!("Ignoring unreadable .env file: {}", e);
        }
    }
}

/// Load from an explicit TOML path plus environment overrides
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "No configuration file at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // NAVA__DOWNLOAD__BATCH_SIZE -> download.batch_size
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
