//! Reelcount Storage
//!
//! This module provides the read-side aggregation store for the video
//! catalog plus the write handle used by the importer:
//!
//! - **types**: Records (`Video`, `Snapshot`) and aggregation requests
//! - **pool**: Bounded SQLite connection pool with cancellation
//! - **sqlite**: `SqliteStore`, the SQL implementation of [`VideoStore`]
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Read Path:
//!   Aggregation → VideoStore::aggregate → pooled connection → one SQL statement → i64
//!
//! Write Path (import):
//!   Video/Snapshot → SqliteStore::write → transaction → INSERT ... ON CONFLICT DO NOTHING
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use reelcount::storage::{Aggregation, ConnectionPool, PoolConfig, SqliteStore, VideoFilter, VideoStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = ConnectionPool::open(PoolConfig::new("./videos.db"))?;
//!     let store = SqliteStore::new(pool);
//!     store.init_schema().await?;
//!
//!     let total = store.aggregate(&Aggregation::CountVideos(VideoFilter::new())).await?;
//!     println!("{} videos", total);
//!
//!     store.pool().close();
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod pool;
pub mod sqlite;
pub mod types;

use async_trait::async_trait;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use sqlite::{Importer, SqliteStore, StoreCounts};
pub use types::{end_of_day, start_of_day, Aggregation, Snapshot, TimeRange, Video, VideoFilter};

/// Read-only aggregation source for the query executor
///
/// One call is one round-trip. Implementations must be safe to share
/// between concurrent requests.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Run a single aggregation and return its scalar result
    async fn aggregate(&self, request: &Aggregation) -> StorageResult<i64>;
}
