//! Query Descriptor
//!
//! The typed result of interpreting one question: a kind, the string
//! arguments relevant to that kind, and the original text for logging.
//!
//! # Kinds and arguments
//!
//! ```text
//! total_count                 (none)
//! creator_count               creator_id, [start_date], [end_date]
//! min_views_count             min_views
//! new_distinct_videos_count   date
//! total_growth_count          date
//! ```
//!
//! Dates are literal `YYYY-MM-DD` strings. An absent key means unbounded.

use crate::query::error::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

/// Argument key: hyphenated creator UUID
pub const CREATOR_ID: &str = "creator_id";
/// Argument key: first day of a creator date range
pub const START_DATE: &str = "start_date";
/// Argument key: last day of a creator date range
pub const END_DATE: &str = "end_date";
/// Argument key: exclusive view-count threshold
pub const MIN_VIEWS: &str = "min_views";
/// Argument key: the single day of a snapshot aggregation
pub const DATE: &str = "date";

/// The five supported question shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// How many videos are in the catalog
    TotalCount,
    /// How many videos a creator published, optionally within dates
    CreatorCount,
    /// How many videos have more than N views
    MinViewsCount,
    /// How many distinct videos gained views on a day
    NewDistinctVideosCount,
    /// By how much views grew in total on a day
    TotalGrowthCount,
}

impl QueryKind {
    /// All kinds, in no particular order
    pub fn all() -> &'static [QueryKind] {
        &[
            QueryKind::TotalCount,
            QueryKind::CreatorCount,
            QueryKind::MinViewsCount,
            QueryKind::NewDistinctVideosCount,
            QueryKind::TotalGrowthCount,
        ]
    }

    /// Stable wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::TotalCount => "total_count",
            QueryKind::CreatorCount => "creator_count",
            QueryKind::MinViewsCount => "min_views_count",
            QueryKind::NewDistinctVideosCount => "new_distinct_videos_count",
            QueryKind::TotalGrowthCount => "total_growth_count",
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        QueryKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| QueryError::UnknownQueryKind(name.to_string()))
    }
}

/// A parsed question ready for execution
///
/// Fields are private: a descriptor is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    kind: QueryKind,
    args: BTreeMap<String, String>,
    source_text: String,
}

impl QueryDescriptor {
    pub(crate) fn new(
        kind: QueryKind,
        args: BTreeMap<String, String>,
        source_text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            args,
            source_text: source_text.into(),
        }
    }

    /// Build a descriptor from loosely typed input (CLI, tests)
    ///
    /// Validates the kind name and, for `creator_count`, normalizes the
    /// creator identifier so the descriptor invariants hold. Other
    /// arguments are checked when the descriptor is executed.
    pub fn from_parts(
        kind: &str,
        args: impl IntoIterator<Item = (String, String)>,
        source_text: impl Into<String>,
    ) -> QueryResult<Self> {
        let kind: QueryKind = kind.parse()?;
        let mut args: BTreeMap<String, String> = args.into_iter().collect();

        if kind == QueryKind::CreatorCount {
            let raw = args
                .get(CREATOR_ID)
                .ok_or(QueryError::MissingParameter(CREATOR_ID))?;
            let normalized =
                normalize_creator_id(raw).ok_or_else(|| QueryError::invalid(CREATOR_ID, raw.as_str()))?;
            args.insert(CREATOR_ID.to_string(), normalized);
        }

        Ok(Self::new(kind, args, source_text))
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn args(&self) -> &BTreeMap<String, String> {
        &self.args
    }

    /// Get an argument by key
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// The question exactly as received
    pub fn source_text(&self) -> &str {
        &self.source_text
    }
}

/// Normalize a creator identifier to hyphenated lowercase 8-4-4-4-12 form
///
/// Accepts 32 hex digits or the hyphenated layout; anything else is `None`.
pub fn normalize_creator_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() != 32 && raw.len() != 36 {
        return None;
    }
    Uuid::try_parse(raw)
        .ok()
        .map(|id| id.hyphenated().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in QueryKind::all() {
            assert_eq!(kind.as_str().parse::<QueryKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let result = "average_views".parse::<QueryKind>();
        assert!(matches!(result, Err(QueryError::UnknownQueryKind(name)) if name == "average_views"));
    }

    #[test]
    fn test_normalize_creator_id() {
        assert_eq!(
            normalize_creator_id("aca1061a9d324ecf8c3fa2bb32d7be63").as_deref(),
            Some("aca1061a-9d32-4ecf-8c3f-a2bb32d7be63")
        );
        assert_eq!(
            normalize_creator_id("ACA1061A-9D32-4ECF-8C3F-A2BB32D7BE63").as_deref(),
            Some("aca1061a-9d32-4ecf-8c3f-a2bb32d7be63")
        );
        assert!(normalize_creator_id("aca1061a9d324ecf").is_none());
        assert!(normalize_creator_id("zzz1061a9d324ecf8c3fa2bb32d7be63").is_none());
        assert!(normalize_creator_id("{aca1061a-9d32-4ecf-8c3f-a2bb32d7be6}").is_none());
    }

    #[test]
    fn test_from_parts_normalizes_creator() {
        let descriptor = QueryDescriptor::from_parts(
            "creator_count",
            pairs(&[(CREATOR_ID, "aca1061a9d324ecf8c3fa2bb32d7be63")]),
            "cli",
        )
        .unwrap();

        assert_eq!(descriptor.kind(), QueryKind::CreatorCount);
        assert_eq!(
            descriptor.arg(CREATOR_ID),
            Some("aca1061a-9d32-4ecf-8c3f-a2bb32d7be63")
        );
        assert_eq!(descriptor.source_text(), "cli");
    }

    #[test]
    fn test_from_parts_rejects_bad_creator() {
        let result = QueryDescriptor::from_parts(
            "creator_count",
            pairs(&[(CREATOR_ID, "not-a-uuid")]),
            "cli",
        );
        assert!(matches!(result, Err(QueryError::InvalidParameter { name: CREATOR_ID, .. })));

        let result = QueryDescriptor::from_parts("creator_count", pairs(&[]), "cli");
        assert!(matches!(result, Err(QueryError::MissingParameter(CREATOR_ID))));
    }

    #[test]
    fn test_from_parts_unknown_kind() {
        let result = QueryDescriptor::from_parts("median_views", pairs(&[]), "cli");
        assert!(matches!(result, Err(QueryError::UnknownQueryKind(_))));
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let descriptor = QueryDescriptor::from_parts(
            "total_growth_count",
            pairs(&[(DATE, "2025-11-28")]),
            "text",
        )
        .unwrap();

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["kind"], "total_growth_count");
        assert_eq!(json["args"]["date"], "2025-11-28");
    }
}
