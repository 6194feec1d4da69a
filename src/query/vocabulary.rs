//! Interpreter Vocabulary
//!
//! Every phrase, pattern and month spelling the interpreter understands,
//! as static data. Patterns are regular expressions applied to the
//! normalized (lowercase, single-spaced) question.

use crate::query::descriptor::QueryKind;

/// Rule evaluation order; the first rule that produces a descriptor wins.
///
/// `new_distinct_videos_count` precedes `total_growth_count` because both
/// talk about views on a day; `min_views_count` guards itself against the
/// "new views" wording.
pub const RULE_ORDER: [QueryKind; 5] = [
    QueryKind::TotalCount,
    QueryKind::CreatorCount,
    QueryKind::MinViewsCount,
    QueryKind::NewDistinctVideosCount,
    QueryKind::TotalGrowthCount,
];

/// Phrases meaning "how many videos in total"
pub const TOTAL_COUNT_PHRASES: &[&str] = &[
    "сколько всего видео",
    "общее количество видео",
    "всего видео",
    "сколько видео в системе",
];

/// Creator identifier: 32 hex digits or the hyphenated 8-4-4-4-12 layout
pub const CREATOR_ID_PATTERN: &str =
    r"([a-f0-9]{32}|[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12})";

/// Every month-name spelling the date patterns accept
pub const MONTH_ALTERNATION: &str = "январ[ья]|феврал[ья]|марта?|апрел[ья]|мая|июн[ья]|июл[ья]|августа?|сентябр[ья]|октябр[ья]|ноябр[ья]|декабр[ья]";

/// "more than N views"; N may contain spaces between digit groups
pub const MIN_VIEWS_PATTERN: &str = r"больше\s+([0-9\s]+)\s+просмотр";

/// "new views"; blocks the min-views rule
pub const NEW_VIEWS_PATTERN: &str = r"новы[её]\s+просмотр";

/// "distinct / unique videos" or "received new views"
pub const NEW_DISTINCT_VIDEOS_PATTERN: &str =
    r"(разн[ыо]х видео|уникальн[ыо]х видео|получали новы[её] просмотры)";

/// "grew", "increase", "in total"
pub const TOTAL_GROWTH_PATTERN: &str = r"(выросл[иао]|прирост|в сумм[еу])";

/// Separators allowed inside a number: regular, no-break and narrow no-break space
pub const DIGIT_SEPARATORS: &[char] = &[' ', '\u{00a0}', '\u{202f}'];

/// Month fallback when a token is not in [`MONTHS`]
pub const FALLBACK_MONTH: &str = "01";

/// A month with its inflected spellings
#[derive(Debug, Clone, Copy)]
pub struct Month {
    /// Two-digit month number
    pub number: &'static str,
    /// Nominative spelling (январь)
    pub nominative: &'static str,
    /// Genitive spelling, as in dates (января)
    pub genitive: &'static str,
}

impl Month {
    pub fn spellings(&self) -> [&'static str; 2] {
        [self.nominative, self.genitive]
    }
}

pub const MONTHS: [Month; 12] = [
    Month { number: "01", nominative: "январь", genitive: "января" },
    Month { number: "02", nominative: "февраль", genitive: "февраля" },
    Month { number: "03", nominative: "март", genitive: "марта" },
    Month { number: "04", nominative: "апрель", genitive: "апреля" },
    Month { number: "05", nominative: "май", genitive: "мая" },
    Month { number: "06", nominative: "июнь", genitive: "июня" },
    Month { number: "07", nominative: "июль", genitive: "июля" },
    Month { number: "08", nominative: "август", genitive: "августа" },
    Month { number: "09", nominative: "сентябрь", genitive: "сентября" },
    Month { number: "10", nominative: "октябрь", genitive: "октября" },
    Month { number: "11", nominative: "ноябрь", genitive: "ноября" },
    Month { number: "12", nominative: "декабрь", genitive: "декабря" },
];

/// Resolve a month token to its two-digit number
///
/// Unknown tokens resolve to [`FALLBACK_MONTH`] rather than failing.
pub fn month_number(token: &str) -> &'static str {
    let token = token.trim().to_lowercase().replace('ё', "е");

    match MONTHS
        .iter()
        .find(|month| month.spellings().contains(&token.as_str()))
    {
        Some(month) => month.number,
        None => {
            tracing::debug!(token = %token, "Unknown month name, using fallback");
            FALLBACK_MONTH
        }
    }
}
