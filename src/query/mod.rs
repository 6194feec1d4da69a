//! Reelcount Query Engine
//!
//! Turns a Russian question about the video catalog into a number:
//!
//! - **Interpreter**: match the question against a fixed rule list
//! - **Descriptor**: the typed query kind plus its string arguments
//! - **Executor**: plan the descriptor and run one store aggregation
//!
//! # Supported questions
//!
//! ```text
//! Сколько всего видео есть в системе?                               total_count
//! Сколько видео у креатора <id> вышло с 1 по 5 ноября 2025?         creator_count
//! Сколько видео набрало больше 100 000 просмотров?                  min_views_count
//! Сколько разных видео получали новые просмотры 27 ноября 2025?     new_distinct_videos_count
//! На сколько просмотров в сумме выросли все видео 28 ноября 2025?   total_growth_count
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use reelcount::query::{interpret, QueryExecutor};
//!
//! let executor = QueryExecutor::new(store);
//! if let Some(descriptor) = interpret("Сколько всего видео есть в системе?") {
//!     let count = executor.execute(descriptor).await?;
//! }
//! ```

mod dates;
mod descriptor;
mod error;
mod executor;
mod interpreter;
mod vocabulary;

pub use dates::DateExtractor;
pub use descriptor::{
    normalize_creator_id, QueryDescriptor, QueryKind, CREATOR_ID, DATE, END_DATE, MIN_VIEWS,
    START_DATE,
};
pub use error::{QueryError, QueryResult};
pub use executor::{plan, QueryExecutor};
pub use interpreter::{interpret, normalize, Interpreter};
pub use vocabulary::{month_number, Month, FALLBACK_MONTH, MONTHS, RULE_ORDER};
