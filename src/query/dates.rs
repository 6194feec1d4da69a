//! Date extraction
//!
//! Turns Russian calendar phrases into literal `YYYY-MM-DD` strings:
//!
//! ```text
//! "28 ноября 2025"        → 2025-11-28
//! "с 1 по 5 ноября 2025"  → 2025-11-01 .. 2025-11-05
//! ```
//!
//! Days and months are zero-padded. Impossible dates such as
//! `31 февраля` are passed through as written; they are rejected when the
//! descriptor is executed.

use crate::query::vocabulary::{month_number, MONTH_ALTERNATION};
use regex::Regex;

/// Compiled date patterns
#[derive(Debug, Clone)]
pub struct DateExtractor {
    single: Regex,
    range: Regex,
}

impl DateExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        let single = Regex::new(&format!(
            r"([0-9]{{1,2}})\s+({})\s+([0-9]{{4}})",
            MONTH_ALTERNATION
        ))?;
        let range = Regex::new(&format!(
            r"с\s+([0-9]{{1,2}})\s+(?:по|до)\s+([0-9]{{1,2}})\s+({})\s+([0-9]{{4}})",
            MONTH_ALTERNATION
        ))?;
        Ok(Self { single, range })
    }

    /// First `day month year` phrase in the text
    pub fn extract_date(&self, text: &str) -> Option<String> {
        let caps = self.single.captures(text)?;
        Some(format_date(&caps[3], &caps[2], &caps[1]))
    }

    /// First `с D1 по|до D2 month year` phrase in the text, as (start, end)
    pub fn extract_range(&self, text: &str) -> Option<(String, String)> {
        let caps = self.range.captures(text)?;
        let (month, year) = (&caps[3], &caps[4]);
        Some((
            format_date(year, month, &caps[1]),
            format_date(year, month, &caps[2]),
        ))
    }

    /// Range if present, otherwise a single day as a one-day range
    pub fn extract_bounds(&self, text: &str) -> Option<(String, String)> {
        self.extract_range(text)
            .or_else(|| self.extract_date(text).map(|date| (date.clone(), date)))
    }
}

fn format_date(year: &str, month: &str, day: &str) -> String {
    let year: u32 = parse_digits(year);
    let day: u32 = parse_digits(day);
    format!("{:04}-{}-{:02}", year, month_number(month), day)
}

// Captures are ASCII digit runs of bounded length, so parsing cannot fail
fn parse_digits(digits: &str) -> u32 {
    digits.parse().unwrap_or_default()
}
