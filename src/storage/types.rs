//! Core data types for the video store
//!
//! This module defines the records persisted by the importer and the
//! aggregation requests the query executor sends to a [`VideoStore`]:
//! - `Video` / `Snapshot`: catalog records
//! - `TimeRange`: a half-open time interval
//! - `VideoFilter`: predicates over the `videos` table
//! - `Aggregation`: the single request issued per query
//!
//! All timestamps are UTC Unix milliseconds.
//!
//! [`VideoStore`]: crate::storage::VideoStore

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A video in the catalog with its latest cumulative counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    pub id: String,
    /// When the video was published
    pub video_created_at: i64,
    /// Hyphenated lowercase UUID of the creator
    pub creator_id: String,
    pub views_count: i64,
    pub likes_count: i64,
    pub reports_count: i64,
    pub comments_count: i64,
    /// Audit timestamps of the export row
    pub created_at: i64,
    pub updated_at: i64,
}

/// A periodic capture of a video's counters
///
/// `delta_*` fields hold the change since the previous snapshot of the
/// same video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub id: String,
    pub video_id: String,
    pub views_count: i64,
    pub likes_count: i64,
    pub reports_count: i64,
    pub comments_count: i64,
    pub delta_views_count: i64,
    pub delta_likes_count: i64,
    pub delta_reports_count: i64,
    pub delta_comments_count: i64,
    /// Capture time
    pub created_at: i64,
    pub updated_at: i64,
}

/// A time range for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start timestamp (inclusive), in milliseconds
    pub start: i64,
    /// End timestamp (exclusive), in milliseconds
    pub end: i64,
}

impl TimeRange {
    /// Create a time range, returning None if invalid
    pub fn try_new(start: i64, end: i64) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Create a range for a specific day (UTC)
    pub fn day(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::for_date)
    }

    /// `[date 00:00:00, date + 1 day)` in UTC
    pub fn for_date(date: NaiveDate) -> Self {
        let start = start_of_day(date);
        Self {
            start,
            end: start + MILLIS_PER_DAY,
        }
    }

    /// Check if a timestamp falls within this range
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Millisecond timestamp of `date 00:00:00` UTC
pub fn start_of_day(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Millisecond timestamp of `date 23:59:59` UTC (whole seconds, no fraction)
pub fn end_of_day(date: NaiveDate) -> i64 {
    start_of_day(date) + MILLIS_PER_DAY - 1000
}

/// Predicates over the `videos` table; `None` means unbounded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFilter {
    /// Exact creator id
    pub creator_id: Option<String>,
    /// `video_created_at >= created_from`
    pub created_from: Option<i64>,
    /// `video_created_at <= created_until`
    pub created_until: Option<i64>,
    /// `views_count > min_views`
    pub min_views: Option<i64>,
}

impl VideoFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn creator(mut self, creator_id: impl Into<String>) -> Self {
        self.creator_id = Some(creator_id.into());
        self
    }

    pub fn created_from(mut self, timestamp: i64) -> Self {
        self.created_from = Some(timestamp);
        self
    }

    pub fn created_until(mut self, timestamp: i64) -> Self {
        self.created_until = Some(timestamp);
        self
    }

    pub fn more_views_than(mut self, threshold: i64) -> Self {
        self.min_views = Some(threshold);
        self
    }

    /// Check if a video matches this filter
    pub fn matches(&self, video: &Video) -> bool {
        if let Some(creator) = &self.creator_id {
            if &video.creator_id != creator {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if video.video_created_at < from {
                return false;
            }
        }
        if let Some(until) = self.created_until {
            if video.video_created_at > until {
                return false;
            }
        }
        if let Some(threshold) = self.min_views {
            if video.views_count <= threshold {
                return false;
            }
        }
        true
    }
}

/// One aggregation against the store, producing a single integer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Aggregation {
    /// `COUNT(*)` over videos matching the filter
    CountVideos(VideoFilter),
    /// Sum of `delta_views_count` over snapshots captured in the range; 0 when empty
    SumViewGrowth(TimeRange),
    /// Distinct `video_id` among snapshots in the range with `delta_views_count > 0`
    CountVideosWithNewViews(TimeRange),
}

impl Aggregation {
    /// Short operation name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::CountVideos(_) => "count_videos",
            Aggregation::SumViewGrowth(_) => "sum_view_growth",
            Aggregation::CountVideosWithNewViews(_) => "count_videos_with_new_views",
        }
    }
}
