//! Answer layer
//!
//! Wraps interpret → execute for a caller that wants text back. Every
//! reply is a single line: the number itself, or a short message in
//! Russian. Storage error detail stays in the logs.

use crate::query::{interpret, QueryDescriptor, QueryError, QueryExecutor};
use std::fmt;
use tracing::Instrument;
use uuid::Uuid;

/// Questions shown when a message is not understood
pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "Сколько всего видео есть в системе?",
    "Сколько видео у креатора aca1061a9d324ecf8c3fa2bb32d7be63 вышло с 1 по 5 ноября 2025?",
    "Сколько видео набрало больше 1000 просмотров?",
    "На сколько просмотров в сумме выросли все видео 28 ноября 2025?",
    "Сколько разных видео получали новые просмотры 27 ноября 2025?",
];

/// Outcome of one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The computed number
    Answer(i64),
    /// No rule matched the text
    Rephrase,
    /// The question was understood but names an unusable value
    Invalid { parameter: &'static str, value: String },
    /// Internal failure; details are logged under the request id
    Failed { request_id: Uuid },
}

impl Reply {
    pub fn is_answer(&self) -> bool {
        matches!(self, Reply::Answer(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Answer(value) => write!(f, "{}", value),
            Reply::Rephrase => {
                writeln!(f, "Не удалось распознать вопрос. Примеры запросов:")?;
                for (i, example) in EXAMPLE_QUESTIONS.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "• {}", example)?;
                }
                Ok(())
            }
            Reply::Invalid { parameter, value } => {
                write!(f, "Некорректное значение {}: {}", parameter, value)
            }
            Reply::Failed { request_id } => write!(
                f,
                "Не удалось получить ответ, попробуйте позже (запрос {})",
                request_id
            ),
        }
    }
}

/// Answers questions with a shared executor
#[derive(Clone)]
pub struct Assistant {
    executor: QueryExecutor,
}

impl Assistant {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Answer one question
    pub async fn reply(&self, text: &str) -> Reply {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("reply", %request_id);

        async {
            match interpret(text) {
                Some(descriptor) => self.run(descriptor, request_id).await,
                None => {
                    tracing::info!(text, "Question not recognized");
                    Reply::Rephrase
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Answer an already built descriptor
    pub async fn reply_to(&self, descriptor: QueryDescriptor) -> Reply {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("reply", %request_id);
        self.run(descriptor, request_id).instrument(span).await
    }

    /// Answer a descriptor given as a kind name and raw arguments
    ///
    /// Unknown kinds and missing arguments are logged and come back as
    /// [`Reply::Failed`], the same as a broken descriptor from any caller.
    pub async fn reply_to_parts(
        &self,
        kind: &str,
        args: impl IntoIterator<Item = (String, String)>,
        source_text: impl Into<String>,
    ) -> Reply {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("reply", %request_id);

        match QueryDescriptor::from_parts(kind, args, source_text) {
            Ok(descriptor) => self.run(descriptor, request_id).instrument(span).await,
            Err(e) => span.in_scope(|| failure(kind, e, request_id)),
        }
    }

    async fn run(&self, descriptor: QueryDescriptor, request_id: Uuid) -> Reply {
        let kind = descriptor.kind();

        match self.executor.execute(descriptor).await {
            Ok(value) => Reply::Answer(value),
            Err(e) => failure(kind, e, request_id),
        }
    }
}

fn failure(kind: impl fmt::Display, error: QueryError, request_id: Uuid) -> Reply {
    match error {
        QueryError::InvalidParameter { name, value } => {
            tracing::warn!(%kind, parameter = name, value = %value, "Unusable parameter");
            Reply::Invalid {
                parameter: name,
                value,
            }
        }
        e if e.is_contract_violation() => {
            tracing::error!(%kind, error = %e, "Descriptor contract violated");
            Reply::Failed { request_id }
        }
        e => {
            tracing::error!(%kind, error = ?e, "Query failed");
            Reply::Failed { request_id }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Aggregation, StorageError, StorageResult, VideoStore};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedStore(i64);

    #[async_trait]
    impl VideoStore for FixedStore {
        async fn aggregate(&self, _request: &Aggregation) -> StorageResult<i64> {
            Ok(self.0)
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl VideoStore for BrokenStore {
        async fn aggregate(&self, _request: &Aggregation) -> StorageResult<i64> {
            Err(StorageError::PoolTimeout(Duration::from_secs(5)))
        }
    }

    fn assistant(store: impl VideoStore + 'static) -> Assistant {
        Assistant::new(QueryExecutor::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_answer_is_bare_number() {
        let reply = assistant(FixedStore(1234))
            .reply("Сколько всего видео есть в системе?")
            .await;

        assert_eq!(reply, Reply::Answer(1234));
        assert_eq!(reply.to_string(), "1234");
    }

    #[tokio::test]
    async fn test_unrecognized_text() {
        let reply = assistant(FixedStore(0)).reply("Какая сегодня погода?").await;

        assert_eq!(reply, Reply::Rephrase);
        let text = reply.to_string();
        for example in EXAMPLE_QUESTIONS {
            assert!(text.contains(example));
        }
    }

    #[tokio::test]
    async fn test_impossible_date() {
        let reply = assistant(FixedStore(0))
            .reply("На сколько просмотров выросли видео 31 февраля 2025?")
            .await;

        assert_eq!(
            reply,
            Reply::Invalid {
                parameter: "date",
                value: "2025-02-31".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_storage_failure_hides_detail() {
        let reply = assistant(BrokenStore)
            .reply("Сколько всего видео есть в системе?")
            .await;

        assert!(matches!(reply, Reply::Failed { .. }));
        let text = reply.to_string();
        assert!(!text.contains("pool"));
        assert!(!text.contains("timed out"));
    }

    #[tokio::test]
    async fn test_reply_to_descriptor() {
        let descriptor = QueryDescriptor::from_parts(
            "min_views_count",
            [("min_views".to_string(), "oops".to_string())],
            "cli",
        )
        .unwrap();

        let reply = assistant(FixedStore(7)).reply_to(descriptor).await;
        assert!(matches!(reply, Reply::Invalid { parameter: "min_views", .. }));
    }

    #[tokio::test]
    async fn test_unknown_kind_is_generic_failure() {
        let reply = assistant(FixedStore(7))
            .reply_to_parts("bogus", Vec::new(), "run bogus")
            .await;

        assert!(matches!(reply, Reply::Failed { .. }));
        assert!(!reply.to_string().contains("bogus"));
    }

    #[tokio::test]
    async fn test_reply_to_parts() {
        let assistant = assistant(FixedStore(7));

        let reply = assistant
            .reply_to_parts("total_count", Vec::new(), "run total_count")
            .await;
        assert_eq!(reply, Reply::Answer(7));

        let reply = assistant
            .reply_to_parts(
                "creator_count",
                [("creator_id".to_string(), "not-a-uuid".to_string())],
                "run creator_count",
            )
            .await;
        assert!(matches!(reply, Reply::Invalid { parameter: "creator_id", .. }));

        let reply = assistant
            .reply_to_parts("creator_count", Vec::new(), "run creator_count")
            .await;
        assert!(matches!(reply, Reply::Failed { .. }));
    }
}
