//! Query Executor
//!
//! Executes a [`QueryDescriptor`] against a [`VideoStore`]:
//! 1. Plan: validate arguments and build one [`Aggregation`]
//! 2. Run: a single store round-trip, optionally bounded by a timeout
//!
//! # Execution Pipeline
//!
//! ```text
//! QueryDescriptor → plan → Aggregation → VideoStore::aggregate → i64
//! ```
//!
//! # Date windows
//!
//! Creator counts use closed calendar days, `[start 00:00:00, end 23:59:59]`.
//! Snapshot aggregations use the half-open day `[date 00:00:00, date + 1 day)`.
//! Both are UTC.

use crate::query::descriptor::*;
use crate::query::error::{QueryError, QueryResult};
use crate::storage::{end_of_day, start_of_day, Aggregation, StorageError, TimeRange, VideoFilter, VideoStore};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Query executor
#[derive(Clone)]
pub struct QueryExecutor {
    /// Aggregation source
    store: Arc<dyn VideoStore>,
    /// Upper bound on one store round-trip
    timeout: Option<Duration>,
}

impl QueryExecutor {
    /// Create a new query executor
    pub fn new(store: Arc<dyn VideoStore>) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Abandon the round-trip after `timeout`
    ///
    /// Abandoning drops the store future, which interrupts the statement
    /// when the store is a [`SqliteStore`](crate::storage::SqliteStore).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Execute a descriptor, consuming it
    pub async fn execute(&self, descriptor: QueryDescriptor) -> QueryResult<i64> {
        let start = Instant::now();
        let aggregation = plan(&descriptor)?;

        tracing::debug!(
            kind = %descriptor.kind(),
            aggregation = ?aggregation,
            "Executing query"
        );

        let request = self.store.aggregate(&aggregation);
        let value = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| StorageError::Timeout(limit))??,
            None => request.await?,
        };

        tracing::info!(
            kind = %descriptor.kind(),
            op = aggregation.name(),
            value,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );

        Ok(value)
    }
}

/// Translate a descriptor into the aggregation that answers it
pub fn plan(descriptor: &QueryDescriptor) -> QueryResult<Aggregation> {
    match descriptor.kind() {
        QueryKind::TotalCount => Ok(Aggregation::CountVideos(VideoFilter::new())),

        QueryKind::CreatorCount => {
            let creator = required(descriptor, CREATOR_ID)?;
            let mut filter = VideoFilter::new().creator(creator);

            if let Some(start) = descriptor.arg(START_DATE) {
                filter = filter.created_from(start_of_day(parse_date(START_DATE, start)?));
            }
            if let Some(end) = descriptor.arg(END_DATE) {
                filter = filter.created_until(end_of_day(parse_date(END_DATE, end)?));
            }

            Ok(Aggregation::CountVideos(filter))
        }

        QueryKind::MinViewsCount => {
            let raw = required(descriptor, MIN_VIEWS)?;
            let threshold: i64 = raw
                .parse()
                .map_err(|_| QueryError::invalid(MIN_VIEWS, raw))?;
            Ok(Aggregation::CountVideos(
                VideoFilter::new().more_views_than(threshold),
            ))
        }

        QueryKind::TotalGrowthCount => Ok(Aggregation::SumViewGrowth(day_window(descriptor)?)),

        QueryKind::NewDistinctVideosCount => Ok(Aggregation::CountVideosWithNewViews(
            day_window(descriptor)?,
        )),
    }
}

fn required<'a>(descriptor: &'a QueryDescriptor, key: &'static str) -> QueryResult<&'a str> {
    descriptor.arg(key).ok_or_else(|| {
        tracing::error!(
            kind = %descriptor.kind(),
            missing = key,
            "Descriptor is missing a required argument"
        );
        QueryError::MissingParameter(key)
    })
}

fn parse_date(key: &'static str, value: &str) -> QueryResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| QueryError::invalid(key, value))
}

fn day_window(descriptor: &QueryDescriptor) -> QueryResult<TimeRange> {
    let date = parse_date(DATE, required(descriptor, DATE)?)?;
    Ok(TimeRange::for_date(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::interpret;
    use crate::storage::sqlite::tests::{create_test_store, seed_catalog, ts, CREATOR};
    use crate::storage::{StorageResult, VideoStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records requests and answers with a fixed value
    struct FakeStore {
        value: i64,
        seen: Mutex<Vec<Aggregation>>,
    }

    impl FakeStore {
        fn new(value: i64) -> Arc<Self> {
            Arc::new(Self {
                value,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<Aggregation> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VideoStore for FakeStore {
        async fn aggregate(&self, request: &Aggregation) -> StorageResult<i64> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.value)
        }
    }

    /// Never answers
    struct StalledStore;

    #[async_trait]
    impl VideoStore for StalledStore {
        async fn aggregate(&self, _request: &Aggregation) -> StorageResult<i64> {
            std::future::pending().await
        }
    }

    fn descriptor(kind: &str, items: &[(&str, &str)]) -> QueryDescriptor {
        QueryDescriptor::from_parts(
            kind,
            items.iter().map(|(k, v)| (k.to_string(), v.to_string())),
            "test",
        )
        .unwrap()
    }

    #[test]
    fn test_plan_total() {
        let plan = plan(&descriptor("total_count", &[])).unwrap();
        assert_eq!(plan, Aggregation::CountVideos(VideoFilter::new()));
    }

    #[test]
    fn test_plan_creator_closed_range() {
        let plan = plan(&descriptor(
            "creator_count",
            &[
                (CREATOR_ID, CREATOR),
                (START_DATE, "2025-11-01"),
                (END_DATE, "2025-11-05"),
            ],
        ))
        .unwrap();

        let expected = VideoFilter::new()
            .creator(CREATOR)
            .created_from(ts(2025, 11, 1, 0, 0, 0))
            .created_until(ts(2025, 11, 5, 23, 59, 59));
        assert_eq!(plan, Aggregation::CountVideos(expected));
    }

    #[test]
    fn test_plan_creator_unbounded() {
        let plan = plan(&descriptor("creator_count", &[(CREATOR_ID, CREATOR)])).unwrap();
        assert_eq!(plan, Aggregation::CountVideos(VideoFilter::new().creator(CREATOR)));
    }

    #[test]
    fn test_plan_growth_half_open() {
        let plan = plan(&descriptor("total_growth_count", &[(DATE, "2025-11-28")])).unwrap();
        let window = TimeRange::try_new(ts(2025, 11, 28, 0, 0, 0), ts(2025, 11, 29, 0, 0, 0)).unwrap();
        assert_eq!(plan, Aggregation::SumViewGrowth(window));
    }

    #[test]
    fn test_plan_missing_parameter() {
        for kind in ["min_views_count", "total_growth_count", "new_distinct_videos_count"] {
            let result = plan(&descriptor(kind, &[]));
            assert!(matches!(result, Err(QueryError::MissingParameter(_))), "{}", kind);
        }
    }

    #[test]
    fn test_plan_invalid_parameters() {
        let result = plan(&descriptor(
            "min_views_count",
            &[(MIN_VIEWS, "99999999999999999999999")],
        ));
        assert!(matches!(result, Err(QueryError::InvalidParameter { name: MIN_VIEWS, .. })));

        let result = plan(&descriptor("total_growth_count", &[(DATE, "2025-02-31")]));
        assert!(matches!(result, Err(QueryError::InvalidParameter { name: DATE, .. })));

        let result = plan(&descriptor(
            "creator_count",
            &[(CREATOR_ID, CREATOR), (END_DATE, "2025-13-01")],
        ));
        assert!(matches!(result, Err(QueryError::InvalidParameter { name: END_DATE, .. })));
    }

    #[tokio::test]
    async fn test_execute_issues_one_round_trip() {
        let store = FakeStore::new(42);
        let executor = QueryExecutor::new(store.clone());

        let descriptor = interpret("Сколько всего видео есть в системе?").unwrap();
        let value = executor.execute(descriptor).await.unwrap();

        assert_eq!(value, 42);
        assert_eq!(
            store.requests(),
            vec![Aggregation::CountVideos(VideoFilter::new())]
        );
    }

    #[tokio::test]
    async fn test_invalid_descriptor_never_reaches_store() {
        let store = FakeStore::new(1);
        let executor = QueryExecutor::new(store.clone());

        let result = executor
            .execute(descriptor("total_growth_count", &[(DATE, "2025-11-99")]))
            .await;

        assert!(result.is_err());
        assert!(store.requests().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_storage_failure() {
        let executor =
            QueryExecutor::new(Arc::new(StalledStore)).with_timeout(Duration::from_millis(20));

        let result = executor.execute(descriptor("total_count", &[])).await;

        assert!(matches!(
            result,
            Err(QueryError::StorageUnavailable(StorageError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn test_questions_against_sqlite() {
        let (store, _dir) = create_test_store().await;
        seed_catalog(&store).await;
        let executor = QueryExecutor::new(Arc::new(store));

        let cases = [
            ("Сколько всего видео есть в системе?", 4),
            (
                "Сколько видео у креатора aca1061a9d324ecf8c3fa2bb32d7be63 вышло с 1 по 5 ноября 2025?",
                2,
            ),
            ("Сколько видео у креатора aca1061a9d324ecf8c3fa2bb32d7be63?", 3),
            ("Сколько видео набрало больше 1000 просмотров?", 2),
            ("На сколько просмотров в сумме выросли все видео 28 ноября 2025?", 22),
            ("Сколько разных видео получали новые просмотры 28 ноября 2025?", 2),
        ];

        for (text, expected) in cases {
            let descriptor = interpret(text).unwrap();
            assert_eq!(executor.execute(descriptor).await.unwrap(), expected, "{}", text);
        }
    }

    #[tokio::test]
    async fn test_growth_without_rows_is_zero() {
        let (store, _dir) = create_test_store().await;
        let executor = QueryExecutor::new(Arc::new(store));

        let value = executor
            .execute(descriptor("total_growth_count", &[(DATE, "2025-11-28")]))
            .await
            .unwrap();

        assert_eq!(value, 0);
    }

    #[tokio::test]
    async fn test_closed_pool_is_storage_unavailable() {
        let (store, _dir) = create_test_store().await;
        store.pool().close();
        let executor = QueryExecutor::new(Arc::new(store));

        let result = executor.execute(descriptor("total_count", &[])).await;

        assert!(matches!(
            result,
            Err(QueryError::StorageUnavailable(StorageError::PoolClosed))
        ));
    }
}
