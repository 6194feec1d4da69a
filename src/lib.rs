//! # Reelcount
//!
//! Video catalog analytics: answers Russian natural-language questions
//! about videos, creators and view growth with a single number.
//!
//! ## Modules
//!
//! - [`query`]: Rule-based interpreter and aggregation executor
//! - [`storage`]: SQLite store with a bounded connection pool
//! - [`answer`]: Question in, one-line reply out
//! - [`import`]: JSON export loader
//! - [`config`]: TOML configuration with environment overrides
//! - [`logging`]: Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reelcount::answer::Assistant;
//! use reelcount::query::QueryExecutor;
//! use reelcount::storage::{ConnectionPool, PoolConfig, SqliteStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = ConnectionPool::open(PoolConfig::new("videos.db"))?;
//!     let store = SqliteStore::new(pool.clone());
//!     store.init_schema().await?;
//!
//!     let assistant = Assistant::new(QueryExecutor::new(Arc::new(store)));
//!     let reply = assistant.reply("Сколько всего видео есть в системе?").await;
//!     println!("{}", reply);
//!
//!     pool.close();
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod config;
pub mod import;
pub mod logging;
pub mod query;
pub mod storage;

// Re-export top-level types for convenience
pub use answer::{Assistant, Reply};

pub use config::{Config, ConfigError, ConfigLoad, DatabaseConfig, LoggingConfig};

pub use import::{ImportError, ImportReport};

pub use query::{interpret, QueryDescriptor, QueryError, QueryExecutor, QueryKind, QueryResult};

pub use storage::{
    Aggregation, ConnectionPool, PoolConfig, SqliteStore, StorageError, StorageResult, VideoStore,
};
