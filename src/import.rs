//! JSON Import
//!
//! Loads a catalog export into the store:
//!
//! ```text
//! { "videos": [ { "id": ..., "creator_id": ..., ..., "snapshots": [ { ... } ] } ] }
//! ```
//!
//! Keys are cleaned (surrounding whitespace trimmed, no-break spaces
//! replaced) before lookup. `*_at` fields are RFC 3339 timestamps and are
//! stored as UTC milliseconds. Records with missing or malformed fields are
//! skipped and counted; the rest are written in a single transaction.

use crate::query::normalize_creator_id;
use crate::storage::{Snapshot, SqliteStore, StorageError, Video};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Failures logged in detail; the rest are only counted
const LOGGED_FAILURES: usize = 5;

const VIDEO_FIELDS: &[&str] = &[
    "id",
    "video_created_at",
    "views_count",
    "likes_count",
    "reports_count",
    "comments_count",
    "creator_id",
    "created_at",
    "updated_at",
];

const SNAPSHOT_FIELDS: &[&str] = &[
    "id",
    "video_id",
    "views_count",
    "likes_count",
    "reports_count",
    "comments_count",
    "delta_views_count",
    "delta_likes_count",
    "delta_reports_count",
    "delta_comments_count",
    "created_at",
    "updated_at",
];

/// Import errors
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to read {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected export layout: {0}")]
    Layout(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Videos inserted (already present ids are not counted)
    pub videos: usize,
    /// Snapshots inserted
    pub snapshots: usize,
    /// Records skipped as invalid
    pub failed: usize,
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "videos={}, snapshots={}, failed={}",
            self.videos, self.snapshots, self.failed
        )
    }
}

/// Records that passed validation
#[derive(Debug, Default)]
pub struct ParsedExport {
    pub videos: Vec<Video>,
    pub snapshots: Vec<Snapshot>,
    pub failed: usize,
}

impl ParsedExport {
    fn reject(&mut self, kind: &str, id: Option<&str>, error: ImportError) {
        self.failed += 1;
        if self.failed <= LOGGED_FAILURES {
            tracing::warn!(
                record = kind,
                id = id.unwrap_or("N/A"),
                error = %error,
                "Skipping invalid record"
            );
        }
    }
}

/// Read, validate and store an export file
pub async fn import_file(store: &SqliteStore, path: &Path) -> Result<ImportReport, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|e| ImportError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    tracing::info!(path = ?path, bytes = content.len(), "Importing export");
    import_str(store, &content).await
}

/// Validate and store an export held in memory
pub async fn import_str(store: &SqliteStore, content: &str) -> Result<ImportReport, ImportError> {
    let parsed = parse_export(content)?;
    let failed = parsed.failed;
    let ParsedExport {
        videos, snapshots, ..
    } = parsed;

    let (videos, snapshots) = store
        .write(move |w| {
            let mut inserted = (0, 0);
            for video in &videos {
                if w.upsert_video(video)? {
                    inserted.0 += 1;
                }
            }
            for snapshot in &snapshots {
                if w.upsert_snapshot(snapshot)? {
                    inserted.1 += 1;
                }
            }
            Ok(inserted)
        })
        .await?;

    let report = ImportReport {
        videos,
        snapshots,
        failed,
    };

    if report.failed > 0 {
        tracing::warn!(%report, "Import finished with skipped records");
    } else {
        tracing::info!(%report, "Import finished");
    }

    Ok(report)
}

/// Parse an export into validated records without touching the store
pub fn parse_export(content: &str) -> Result<ParsedExport, ImportError> {
    let root = clean_keys(serde_json::from_str(content)?);

    let videos = root
        .get("videos")
        .and_then(Value::as_array)
        .ok_or_else(|| ImportError::Layout("expected a top-level \"videos\" array".to_string()))?;

    let mut parsed = ParsedExport::default();

    for record in videos {
        let Some(object) = record.as_object() else {
            parsed.reject("video", None, ImportError::InvalidRecord("not an object".to_string()));
            continue;
        };

        match parse_video(object) {
            Ok(video) => parsed.videos.push(video),
            Err(e) => {
                parsed.reject("video", object.get("id").and_then(Value::as_str), e);
                continue;
            }
        }

        let snapshots = object
            .get("snapshots")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for record in snapshots {
            let Some(object) = record.as_object() else {
                parsed.reject("snapshot", None, ImportError::InvalidRecord("not an object".to_string()));
                continue;
            };
            match parse_snapshot(object) {
                Ok(snapshot) => parsed.snapshots.push(snapshot),
                Err(e) => parsed.reject("snapshot", object.get("id").and_then(Value::as_str), e),
            }
        }
    }

    tracing::debug!(
        videos = parsed.videos.len(),
        snapshots = parsed.snapshots.len(),
        failed = parsed.failed,
        "Export parsed"
    );

    Ok(parsed)
}

/// Trim keys and replace no-break spaces, recursively
fn clean_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (clean_key(&k), clean_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(clean_keys).collect()),
        other => other,
    }
}

fn clean_key(key: &str) -> String {
    key.replace('\u{00a0}', " ").trim().to_string()
}

fn parse_video(record: &Map<String, Value>) -> Result<Video, ImportError> {
    require(record, VIDEO_FIELDS)?;

    let raw_creator = text(record, "creator_id")?;
    let creator_id = normalize_creator_id(&raw_creator).ok_or_else(|| {
        ImportError::InvalidRecord(format!("creator_id is not a UUID: {}", raw_creator))
    })?;

    Ok(Video {
        id: text(record, "id")?,
        video_created_at: timestamp(record, "video_created_at")?,
        creator_id,
        views_count: integer(record, "views_count")?,
        likes_count: integer(record, "likes_count")?,
        reports_count: integer(record, "reports_count")?,
        comments_count: integer(record, "comments_count")?,
        created_at: timestamp(record, "created_at")?,
        updated_at: timestamp(record, "updated_at")?,
    })
}

fn parse_snapshot(record: &Map<String, Value>) -> Result<Snapshot, ImportError> {
    require(record, SNAPSHOT_FIELDS)?;

    Ok(Snapshot {
        id: text(record, "id")?,
        video_id: text(record, "video_id")?,
        views_count: integer(record, "views_count")?,
        likes_count: integer(record, "likes_count")?,
        reports_count: integer(record, "reports_count")?,
        comments_count: integer(record, "comments_count")?,
        delta_views_count: integer(record, "delta_views_count")?,
        delta_likes_count: integer(record, "delta_likes_count")?,
        delta_reports_count: integer(record, "delta_reports_count")?,
        delta_comments_count: integer(record, "delta_comments_count")?,
        created_at: timestamp(record, "created_at")?,
        updated_at: timestamp(record, "updated_at")?,
    })
}

fn require(record: &Map<String, Value>, fields: &[&str]) -> Result<(), ImportError> {
    match fields.iter().find(|field| !record.contains_key(**field)) {
        Some(field) => Err(ImportError::InvalidRecord(format!("missing field {}", field))),
        None => Ok(()),
    }
}

fn text(record: &Map<String, Value>, field: &str) -> Result<String, ImportError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ImportError::InvalidRecord(format!("{} must be a non-empty string", field)))
}

fn integer(record: &Map<String, Value>, field: &str) -> Result<i64, ImportError> {
    record
        .get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| ImportError::InvalidRecord(format!("{} must be an integer", field)))
}

fn timestamp(record: &Map<String, Value>, field: &str) -> Result<i64, ImportError> {
    let raw = record
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ImportError::InvalidRecord(format!("{} must be a timestamp string", field)))?;

    parse_timestamp(raw)
        .ok_or_else(|| ImportError::InvalidRecord(format!("{}: cannot parse '{}'", field, raw)))
}

/// RFC 3339 with `Z` or an offset; timestamps without an offset are taken as UTC
fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.and_utc().timestamp_millis())
}
