//! SQLite-backed video store
//!
//! Holds the `videos` and `video_snapshots` tables. Every [`Aggregation`]
//! is answered with exactly one SQL statement on one pooled connection.
//!
//! # Schema
//!
//! ```text
//! videos(id PK, creator_id, video_created_at, views_count, ...)
//! video_snapshots(id PK, video_id, ..., delta_views_count, created_at, ...)
//! ```
//!
//! Timestamps are stored as UTC Unix milliseconds, so every range
//! predicate is a plain integer comparison.

use crate::storage::{
    Aggregation, ConnectionPool, Snapshot, StorageResult, TimeRange, Video, VideoFilter,
    VideoStore,
};
use async_trait::async_trait;
use rusqlite::{params, types::Value, Connection, Transaction};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        creator_id TEXT NOT NULL,
        video_created_at INTEGER NOT NULL,
        views_count INTEGER NOT NULL,
        likes_count INTEGER NOT NULL,
        reports_count INTEGER NOT NULL,
        comments_count INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_videos_creator ON videos(creator_id, video_created_at);
    CREATE INDEX IF NOT EXISTS idx_videos_views ON videos(views_count);

    CREATE TABLE IF NOT EXISTS video_snapshots (
        id TEXT PRIMARY KEY,
        video_id TEXT NOT NULL,
        views_count INTEGER NOT NULL,
        likes_count INTEGER NOT NULL,
        reports_count INTEGER NOT NULL,
        comments_count INTEGER NOT NULL,
        delta_views_count INTEGER NOT NULL,
        delta_likes_count INTEGER NOT NULL,
        delta_reports_count INTEGER NOT NULL,
        delta_comments_count INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_snapshots_created ON video_snapshots(created_at);
    CREATE INDEX IF NOT EXISTS idx_snapshots_video ON video_snapshots(video_id);
";

/// Row counts of both tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub videos: i64,
    pub snapshots: i64,
}

impl std::fmt::Display for StoreCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "videos={}, snapshots={}", self.videos, self.snapshots)
    }
}

/// Video store on top of a [`ConnectionPool`]
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl SqliteStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist
    pub async fn init_schema(&self) -> StorageResult<()> {
        self.pool
            .run(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        tracing::debug!("Schema ready");
        Ok(())
    }

    /// Insert records inside one write transaction
    ///
    /// The closure receives an [`Importer`]; rows already present (same
    /// `id`) are left untouched, so re-running an import is harmless.
    pub async fn write<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Importer<'_>) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.pool
            .run(move |conn| {
                let tx = conn.transaction()?;
                let result = f(&Importer { tx: &tx })?;
                tx.commit()?;
                Ok(result)
            })
            .await
    }

    /// Current row counts
    pub async fn counts(&self) -> StorageResult<StoreCounts> {
        self.pool
            .run(|conn| {
                let videos = conn.query_row("SELECT COUNT(*) FROM videos", [], |r| r.get(0))?;
                let snapshots =
                    conn.query_row("SELECT COUNT(*) FROM video_snapshots", [], |r| r.get(0))?;
                Ok(StoreCounts { videos, snapshots })
            })
            .await
    }
}

#[async_trait]
impl VideoStore for SqliteStore {
    async fn aggregate(&self, request: &Aggregation) -> StorageResult<i64> {
        let request = request.clone();
        self.pool.run(move |conn| run_aggregation(conn, &request)).await
    }
}

fn run_aggregation(conn: &Connection, request: &Aggregation) -> StorageResult<i64> {
    match request {
        Aggregation::CountVideos(filter) => count_videos(conn, filter),
        Aggregation::SumViewGrowth(range) => sum_view_growth(conn, range),
        Aggregation::CountVideosWithNewViews(range) => count_videos_with_new_views(conn, range),
    }
}

fn count_videos(conn: &Connection, filter: &VideoFilter) -> StorageResult<i64> {
    let mut sql = String::from("SELECT COUNT(*) FROM videos");
    let mut conditions = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(creator) = &filter.creator_id {
        conditions.push("creator_id = ?");
        args.push(Value::Text(creator.clone()));
    }
    if let Some(from) = filter.created_from {
        conditions.push("video_created_at >= ?");
        args.push(Value::Integer(from));
    }
    if let Some(until) = filter.created_until {
        conditions.push("video_created_at <= ?");
        args.push(Value::Integer(until));
    }
    if let Some(threshold) = filter.min_views {
        conditions.push("views_count > ?");
        args.push(Value::Integer(threshold));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    let mut stmt = conn.prepare_cached(&sql)?;
    let count = stmt.query_row(rusqlite::params_from_iter(args), |row| row.get(0))?;
    Ok(count)
}

fn sum_view_growth(conn: &Connection, range: &TimeRange) -> StorageResult<i64> {
    let mut stmt = conn.prepare_cached(
        "SELECT COALESCE(SUM(delta_views_count), 0)
         FROM video_snapshots
         WHERE created_at >= ?1 AND created_at < ?2",
    )?;
    let total = stmt.query_row(params![range.start, range.end], |row| row.get(0))?;
    Ok(total)
}

fn count_videos_with_new_views(conn: &Connection, range: &TimeRange) -> StorageResult<i64> {
    let mut stmt = conn.prepare_cached(
        "SELECT COUNT(DISTINCT video_id)
         FROM video_snapshots
         WHERE created_at >= ?1 AND created_at < ?2 AND delta_views_count > 0",
    )?;
    let count = stmt.query_row(params![range.start, range.end], |row| row.get(0))?;
    Ok(count)
}

/// Write handle used inside [`SqliteStore::write`]
pub struct Importer<'a> {
    tx: &'a Transaction<'a>,
}

impl Importer<'_> {
    /// Insert a video; returns false if a video with this id already exists
    pub fn upsert_video(&self, video: &Video) -> StorageResult<bool> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO videos (
                id, creator_id, video_created_at, views_count, likes_count,
                reports_count, comments_count, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO NOTHING",
        )?;
        let inserted = stmt.execute(params![
            video.id,
            video.creator_id,
            video.video_created_at,
            video.views_count,
            video.likes_count,
            video.reports_count,
            video.comments_count,
            video.created_at,
            video.updated_at,
        ])?;
        Ok(inserted > 0)
    }

    /// Insert a snapshot; returns false if a snapshot with this id already exists
    pub fn upsert_snapshot(&self, snapshot: &Snapshot) -> StorageResult<bool> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO video_snapshots (
                id, video_id, views_count, likes_count, reports_count, comments_count,
                delta_views_count, delta_likes_count, delta_reports_count,
                delta_comments_count, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO NOTHING",
        )?;
        let inserted = stmt.execute(params![
            snapshot.id,
            snapshot.video_id,
            snapshot.views_count,
            snapshot.likes_count,
            snapshot.reports_count,
            snapshot.comments_count,
            snapshot.delta_views_count,
            snapshot.delta_likes_count,
            snapshot.delta_reports_count,
            snapshot.delta_comments_count,
            snapshot.created_at,
            snapshot.updated_at,
        ])?;
        Ok(inserted > 0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::{start_of_day, PoolConfig};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    pub(crate) const CREATOR: &str = "aca1061a-9d32-4ecf-8c3f-a2bb32d7be63";
    const OTHER_CREATOR: &str = "11111111-2222-3333-4444-555555555555";

    pub(crate) fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
            .and_utc()
            .timestamp_millis()
    }

    pub(crate) fn video(id: &str, creator: &str, created_at: i64, views: i64) -> Video {
        Video {
            id: id.to_string(),
            video_created_at: created_at,
            creator_id: creator.to_string(),
            views_count: views,
            likes_count: 0,
            reports_count: 0,
            comments_count: 0,
            created_at,
            updated_at: created_at,
        }
    }

    pub(crate) fn snapshot(id: &str, video_id: &str, delta_views: i64, created_at: i64) -> Snapshot {
        Snapshot {
            id: id.to_string(),
            video_id: video_id.to_string(),
            views_count: 0,
            likes_count: 0,
            reports_count: 0,
            comments_count: 0,
            delta_views_count: delta_views,
            delta_likes_count: 0,
            delta_reports_count: 0,
            delta_comments_count: 0,
            created_at,
            updated_at: created_at,
        }
    }

    pub(crate) async fn create_test_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = ConnectionPool::open(PoolConfig::new(dir.path().join("videos.db"))).unwrap();
        let store = SqliteStore::new(pool);
        store.init_schema().await.unwrap();
        (store, dir)
    }

    /// Catalog used by store and executor tests
    pub(crate) async fn seed_catalog(store: &SqliteStore) {
        store
            .write(|w| {
                w.upsert_video(&video("v1", CREATOR, ts(2025, 11, 1, 0, 0, 0), 500))?;
                w.upsert_video(&video("v2", CREATOR, ts(2025, 11, 5, 23, 59, 59), 1500))?;
                w.upsert_video(&video("v3", CREATOR, ts(2025, 11, 6, 0, 0, 0), 1001))?;
                w.upsert_video(&video("v4", OTHER_CREATOR, ts(2025, 11, 3, 12, 0, 0), 1000))?;

                w.upsert_snapshot(&snapshot("s1", "v1", 10, ts(2025, 11, 28, 0, 0, 0)))?;
                w.upsert_snapshot(&snapshot("s2", "v1", 5, ts(2025, 11, 28, 10, 0, 0)))?;
                w.upsert_snapshot(&snapshot("s3", "v2", 0, ts(2025, 11, 28, 11, 0, 0)))?;
                w.upsert_snapshot(&snapshot("s4", "v3", 7, ts(2025, 11, 28, 23, 59, 59)))?;
                w.upsert_snapshot(&snapshot("s5", "v4", 100, ts(2025, 11, 29, 0, 0, 0)))?;
                w.upsert_snapshot(&snapshot("s6", "v4", -3, ts(2025, 11, 27, 23, 59, 59)))?;
                Ok(())
            })
            .await
            .unwrap();
    }

    fn day(y: i32, m: u32, d: u32) -> TimeRange {
        TimeRange::day(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_count_all_videos() {
        let (store, _dir) = create_test_store().await;
        seed_catalog(&store).await;

        let count = store
            .aggregate(&Aggregation::CountVideos(VideoFilter::new()))
            .await
            .unwrap();

        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_count_by_creator_with_closed_bounds() {
        let (store, _dir) = create_test_store().await;
        seed_catalog(&store).await;

        let nov1 = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let filter = VideoFilter::new()
            .creator(CREATOR)
            .created_from(start_of_day(nov1))
            .created_until(ts(2025, 11, 5, 23, 59, 59));

        let count = store
            .aggregate(&Aggregation::CountVideos(filter))
            .await
            .unwrap();

        // v1 at 00:00:00 and v2 at 23:59:59 are both inside; v3 is a day later
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_count_more_views_is_strict() {
        let (store, _dir) = create_test_store().await;
        seed_catalog(&store).await;

        let count = store
            .aggregate(&Aggregation::CountVideos(VideoFilter::new().more_views_than(1000)))
            .await
            .unwrap();

        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_sum_growth_uses_half_open_day() {
        let (store, _dir) = create_test_store().await;
        seed_catalog(&store).await;

        let total = store
            .aggregate(&Aggregation::SumViewGrowth(day(2025, 11, 28)))
            .await
            .unwrap();

        assert_eq!(total, 10 + 5 + 7);
    }

    #[tokio::test]
    async fn test_sum_growth_empty_is_zero() {
        let (store, _dir) = create_test_store().await;

        let total = store
            .aggregate(&Aggregation::SumViewGrowth(day(2025, 11, 28)))
            .await
            .unwrap();

        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_count_distinct_videos_with_new_views() {
        let (store, _dir) = create_test_store().await;
        seed_catalog(&store).await;

        let count = store
            .aggregate(&Aggregation::CountVideosWithNewViews(day(2025, 11, 28)))
            .await
            .unwrap();

        // v1 twice, v3 once, v2 had zero growth
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let (store, _dir) = create_test_store().await;
        seed_catalog(&store).await;

        let inserted = store
            .write(|w| w.upsert_video(&video("v1", CREATOR, 0, 999_999)))
            .await
            .unwrap();
        seed_catalog(&store).await;

        assert!(!inserted);
        let counts = store.counts().await.unwrap();
        assert_eq!(counts, StoreCounts { videos: 4, snapshots: 6 });
    }

    #[tokio::test]
    async fn test_closed_pool_surfaces_error() {
        let (store, _dir) = create_test_store().await;
        store.pool().close();

        let result = store
            .aggregate(&Aggregation::CountVideos(VideoFilter::new()))
            .await;

        assert!(matches!(result, Err(crate::storage::StorageError::PoolClosed)));
    }
}
