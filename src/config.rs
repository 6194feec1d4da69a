//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::storage::PoolConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database and connection pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_ms: u64,

    /// 0 disables the per-query timeout
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("reelcount").join("videos.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./reelcount_data/videos.db".to_string())
}

fn default_pool_size() -> usize {
    10
}

fn default_acquire_timeout() -> u64 {
    5000 // 5 seconds
}

fn default_query_timeout() -> u64 {
    30_000 // 30 seconds
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_size: default_pool_size(),
            acquire_timeout_ms: default_acquire_timeout(),
            query_timeout_ms: default_query_timeout(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Pool settings for [`ConnectionPool::open`](crate::storage::ConnectionPool::open)
    pub fn to_pool_config(&self) -> PoolConfig {
        PoolConfig::new(&self.path)
            .max_size(self.pool_size)
            .acquire_timeout(Duration::from_millis(self.acquire_timeout_ms))
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_ms > 0).then(|| Duration::from_millis(self.query_timeout_ms))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Standard config file locations, in search order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("reelcount").join("config.toml")),
            Some(PathBuf::from("/etc/reelcount/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let load = Self::load_first(&Self::default_paths());
        load.report();
        load.config
    }

    /// Load the first candidate that exists and parses, else env-only defaults
    ///
    /// Nothing is logged here: the subscriber is usually not installed yet.
    /// Call [`ConfigLoad::report`] once it is.
    pub fn load_first(candidates: &[PathBuf]) -> ConfigLoad {
        let mut errors = Vec::new();

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    return ConfigLoad {
                        config,
                        path: Some(path.clone()),
                        errors,
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        ConfigLoad {
            config: Self::from_env(),
            path: None,
            errors,
        }
    }

    /// Apply `REELCOUNT_*` overrides; unparsable numbers are ignored
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Database overrides
        if let Some(path) = lookup("REELCOUNT_DB_PATH") {
            self.database.path = path;
        }
        if let Some(size) = lookup("REELCOUNT_POOL_SIZE").and_then(|v| v.parse().ok()) {
            self.database.pool_size = size;
        }
        if let Some(ms) = lookup("REELCOUNT_ACQUIRE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.database.acquire_timeout_ms = ms;
        }
        if let Some(ms) = lookup("REELCOUNT_QUERY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.database.query_timeout_ms = ms;
        }

        // Logging overrides
        if let Some(level) = lookup("REELCOUNT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("REELCOUNT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Outcome of searching for a config file
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    /// File the config came from; `None` means defaults plus environment
    pub path: Option<PathBuf>,
    /// Candidates that existed but could not be loaded
    pub errors: Vec<ConfigError>,
}

impl ConfigLoad {
    /// A config given explicitly on the command line
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            config: Config::load_with_env(path)?,
            path: Some(path.to_path_buf()),
            errors: Vec::new(),
        })
    }

    /// Log where the config came from and every candidate that was skipped
    pub fn report(&self) {
        for e in &self.errors {
            tracing::warn!("Skipping config file: {}", e);
        }
        match &self.path {
            Some(path) => tracing::info!("Loaded config from {:?}", path),
            None => tracing::info!("Using default config with environment overrides"),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Reelcount Configuration
#
# Environment variables override these settings:
# - REELCOUNT_DB_PATH
# - REELCOUNT_POOL_SIZE
# - REELCOUNT_ACQUIRE_TIMEOUT_MS
# - REELCOUNT_QUERY_TIMEOUT_MS
# - REELCOUNT_LOG_LEVEL
# - REELCOUNT_LOG_FORMAT

[database]
# SQLite database file (default: <local data dir>/reelcount/videos.db)
# path = "/var/lib/reelcount/videos.db"

# Maximum number of open connections
pool_size = 10

# How long a question waits for a free connection (ms)
acquire_timeout_ms = 5000

# Upper bound on a single aggregation (ms), 0 disables
query_timeout_ms = 30000

# How long SQLite waits on a locked database (ms)
busy_timeout_ms = 5000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
