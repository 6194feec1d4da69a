//! SQLite Connection Pool
//!
//! A small bounded pool of `rusqlite` connections with an explicit
//! lifecycle: construct with [`ConnectionPool::open`], acquire, release by
//! dropping the guard, and [`ConnectionPool::close`].
//!
//! # Concurrency
//!
//! ```text
//! caller ──► semaphore (max_size permits, bounded wait) ──► idle Vec<Connection>
//!                                                             │
//!                                  spawn_blocking(statement) ◄┘
//! ```
//!
//! Callers beyond `max_size` queue on the semaphore for at most
//! `acquire_timeout`. Statements run on tokio's blocking pool. If the
//! future awaiting [`ConnectionPool::run`] is dropped, the running
//! statement is interrupted through SQLite's interrupt handle and the
//! connection goes back to the pool.

use crate::storage::{StorageError, StorageResult};
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// SQLite database file
    pub path: PathBuf,
    /// Maximum concurrently open connections
    pub max_size: usize,
    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,
    /// SQLite busy handler timeout for lock contention
    pub busy_timeout: Duration,
}

impl PoolConfig {
    /// Create a config with default limits for a database file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_size: 10,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

struct PoolInner {
    config: PoolConfig,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
}

impl PoolInner {
    fn connect(&self) -> StorageResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.config.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.busy_timeout(self.config.busy_timeout)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        tracing::debug!(path = ?self.config.path, "Opened database connection");
        Ok(conn)
    }

    fn take_idle(&self) -> Option<Connection> {
        self.idle.lock().ok().and_then(|mut idle| idle.pop())
    }

    fn release(&self, conn: Connection) {
        if self.permits.is_closed() {
            return;
        }
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(conn);
        }
    }
}

/// Bounded pool of SQLite connections
///
/// Cheap to clone; clones share the same connections and limits.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Create the pool and verify the database can be opened
    ///
    /// One connection is opened eagerly so that a bad path or a locked
    /// file is reported at startup rather than on the first query.
    pub fn open(config: PoolConfig) -> StorageResult<Self> {
        if config.max_size == 0 {
            return Err(StorageError::Config(
                "pool max_size must be at least 1".to_string(),
            ));
        }

        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let inner = Arc::new(PoolInner {
            permits: Arc::new(Semaphore::new(config.max_size)),
            idle: Mutex::new(Vec::with_capacity(config.max_size)),
            config,
        });

        let first = inner.connect()?;
        inner.release(first);

        tracing::info!(
            path = ?inner.config.path,
            max_size = inner.config.max_size,
            "Connection pool ready"
        );

        Ok(Self { inner })
    }

    /// Wait for a free connection, at most `acquire_timeout`
    pub async fn acquire(&self) -> StorageResult<PooledConnection> {
        let timeout = self.inner.config.acquire_timeout;
        let permit = match tokio::time::timeout(
            timeout,
            Arc::clone(&self.inner.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(StorageError::PoolClosed),
            Err(_) => {
                tracing::warn!(?timeout, "Timed out waiting for a pooled connection");
                return Err(StorageError::PoolTimeout(timeout));
            }
        };

        let conn = match self.inner.take_idle() {
            Some(conn) => conn,
            None => self.inner.connect()?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Run a blocking closure against a pooled connection
    ///
    /// The closure runs on the blocking thread pool. Dropping the returned
    /// future before it completes interrupts the statement in flight.
    pub async fn run<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.acquire().await?;
        let slot: InterruptSlot = Arc::new(Mutex::new(Some(conn.get_interrupt_handle())));
        let mut interrupt = InterruptOnDrop {
            slot: Arc::clone(&slot),
            armed: true,
        };

        let result = tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            // Declared after `conn`, so the slot is emptied before the connection is released
            let _release = ReleaseInterrupt(slot);
            f(&mut conn)
        })
        .await;

        interrupt.disarm();
        result?
    }

    /// Close the pool
    ///
    /// Waiting and future acquires fail with [`StorageError::PoolClosed`].
    /// Connections currently checked out are closed when released.
    pub fn close(&self) {
        self.inner.permits.close();
        if let Ok(mut idle) = self.inner.idle.lock() {
            idle.clear();
        }
        tracing::info!("Connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }

    /// Number of connections that can be acquired right now without waiting
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("path", &self.inner.config.path)
            .field("max_size", &self.inner.config.max_size)
            .field("available", &self.available())
            .finish()
    }
}

/// A checked-out connection; returns to the pool on drop
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

/// Interrupt handle of a checked-out connection, present only while the
/// worker still owns that connection
type InterruptSlot = Arc<Mutex<Option<InterruptHandle>>>;

/// Interrupts the caller's statement unless disarmed
struct InterruptOnDrop {
    slot: InterruptSlot,
    armed: bool,
}

impl InterruptOnDrop {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Holding the lock keeps the worker from releasing the connection mid-interrupt
        if let Ok(slot) = self.slot.lock() {
            if let Some(handle) = slot.as_ref() {
                tracing::debug!("Request abandoned, interrupting statement");
                handle.interrupt();
            }
        }
    }
}

/// Empties the slot when the worker is done with the connection
struct ReleaseInterrupt(InterruptSlot);

impl Drop for ReleaseInterrupt {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.0.lock() {
            slot.take();
        }
    }
}
