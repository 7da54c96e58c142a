//! Completion handoff: persisting a finished (or interrupted) stream.
//!
//! The sink is invoked exactly once per streamed response, after the
//! last token and before the `done` event. Persistence failures are a
//! backend bookkeeping problem, never a chat failure: the user
//! already saw the full streamed text.

use cairn_types::error::RepositoryError;
use cairn_types::llm::Usage;
use uuid::Uuid;

/// Everything the sink needs to persist one streamed response.
#[derive(Debug, Clone)]
pub struct CompletedStream {
    /// Message id generated by the pipeline before persistence, so
    /// the `done` event can carry it even when the write fails.
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub model: String,
    /// Full assistant text with semantic tags intact.
    pub full_text: String,
    pub usage: Usage,
    /// True when the client disconnected or the upstream failed
    /// before the natural end of the stream.
    pub interrupted: bool,
}

/// Persistence boundary for completed streams.
pub trait CompletionSink: Send + Sync {
    /// Write the assistant message. Awaited by the pipeline before it
    /// emits `done`.
    fn persist_message(
        &self,
        record: &CompletedStream,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Write the usage/cost log entry. Best effort; the pipeline runs
    /// this on a supervised detached task and never waits for it.
    fn record_usage(
        &self,
        record: &CompletedStream,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

impl<T: CompletionSink> CompletionSink for std::sync::Arc<T> {
    async fn persist_message(&self, record: &CompletedStream) -> Result<(), RepositoryError> {
        (**self).persist_message(record).await
    }

    async fn record_usage(&self, record: &CompletedStream) -> Result<(), RepositoryError> {
        (**self).record_usage(record).await
    }
}
