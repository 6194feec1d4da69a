//! Query Interpreter
//!
//! Rule-based translation of a Russian question into a [`QueryDescriptor`].
//!
//! # Pipeline
//!
//! ```text
//! text → normalize (collapse whitespace, trim, lowercase) → rules in RULE_ORDER → descriptor
//! ```
//!
//! The first rule that produces a descriptor wins. Text that no rule
//! understands yields `None`; the interpreter never fails on input.
//!
//! # Examples
//!
//! ```rust
//! use reelcount::query::{interpret, QueryKind};
//!
//! let descriptor = interpret("Сколько видео набрало больше 1 000 просмотров?").unwrap();
//! assert_eq!(descriptor.kind(), QueryKind::MinViewsCount);
//! assert_eq!(descriptor.arg("min_views"), Some("1000"));
//!
//! assert!(interpret("Какая погода?").is_none());
//! ```

use crate::query::dates::DateExtractor;
use crate::query::descriptor::*;
use crate::query::vocabulary::*;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static INTERPRETER: Lazy<Interpreter> =
    Lazy::new(|| Interpreter::new().expect("built-in query patterns compile"));

/// Interpret a question with the shared, lazily compiled interpreter
pub fn interpret(text: &str) -> Option<QueryDescriptor> {
    INTERPRETER.interpret(text)
}

/// Collapse whitespace runs to one space, trim, lowercase
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Compiled rule set
///
/// Immutable after construction; share it freely between threads.
#[derive(Debug, Clone)]
pub struct Interpreter {
    creator_id: Regex,
    min_views: Regex,
    new_views: Regex,
    new_distinct_videos: Regex,
    total_growth: Regex,
    dates: DateExtractor,
}

impl Interpreter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            creator_id: Regex::new(CREATOR_ID_PATTERN)?,
            min_views: Regex::new(MIN_VIEWS_PATTERN)?,
            new_views: Regex::new(NEW_VIEWS_PATTERN)?,
            new_distinct_videos: Regex::new(NEW_DISTINCT_VIDEOS_PATTERN)?,
            total_growth: Regex::new(TOTAL_GROWTH_PATTERN)?,
            dates: DateExtractor::new()?,
        })
    }

    /// Translate one question, or `None` if no rule matches
    pub fn interpret(&self, text: &str) -> Option<QueryDescriptor> {
        let normalized = normalize(text);

        let matched = RULE_ORDER.iter().find_map(|&kind| {
            self.apply_rule(kind, &normalized)
                .map(|args| QueryDescriptor::new(kind, args, text))
        });

        match &matched {
            Some(descriptor) => tracing::debug!(
                kind = %descriptor.kind(),
                args = ?descriptor.args(),
                "Question interpreted"
            ),
            None => tracing::debug!(text = %normalized, "No rule matched"),
        }

        matched
    }

    fn apply_rule(&self, kind: QueryKind, text: &str) -> Option<BTreeMap<String, String>> {
        match kind {
            QueryKind::TotalCount => self.match_total_count(text),
            QueryKind::CreatorCount => self.match_creator_count(text),
            QueryKind::MinViewsCount => self.match_min_views(text),
            QueryKind::NewDistinctVideosCount => {
                self.match_dated(text, &self.new_distinct_videos)
            }
            QueryKind::TotalGrowthCount => self.match_dated(text, &self.total_growth),
        }
    }

    fn match_total_count(&self, text: &str) -> Option<BTreeMap<String, String>> {
        TOTAL_COUNT_PHRASES
            .iter()
            .any(|phrase| text.contains(phrase))
            .then(BTreeMap::new)
    }

    fn match_creator_count(&self, text: &str) -> Option<BTreeMap<String, String>> {
        let raw = self.creator_id.captures(text)?.get(1)?.as_str();

        let mut args = BTreeMap::new();
        args.insert(CREATOR_ID.to_string(), hyphenate(raw));

        if let Some((start, end)) = self.dates.extract_bounds(text) {
            args.insert(START_DATE.to_string(), start);
            args.insert(END_DATE.to_string(), end);
        }

        Some(args)
    }

    fn match_min_views(&self, text: &str) -> Option<BTreeMap<String, String>> {
        if self.new_views.is_match(text) {
            return None;
        }

        let digits: String = self
            .min_views
            .captures(text)?
            .get(1)?
            .as_str()
            .chars()
            .filter(|c| !DIGIT_SEPARATORS.contains(c))
            .collect();

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let mut args = BTreeMap::new();
        args.insert(MIN_VIEWS.to_string(), digits);
        Some(args)
    }

    /// Trigger pattern plus a mandatory `day month year`
    fn match_dated(&self, text: &str, trigger: &Regex) -> Option<BTreeMap<String, String>> {
        if !trigger.is_match(text) {
            return None;
        }

        let date = self.dates.extract_date(text)?;
        let mut args = BTreeMap::new();
        args.insert(DATE.to_string(), date);
        Some(args)
    }
}

/// 32 hex digits → 8-4-4-4-12; already hyphenated ids pass through
fn hyphenate(id: &str) -> String {
    if id.contains('-') {
        return id.to_string();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &id[..8],
        &id[8..12],
        &id[12..16],
        &id[16..20],
        &id[20..]
    )
}
