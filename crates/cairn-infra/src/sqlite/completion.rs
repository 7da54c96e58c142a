//! SQLite completion sink.
//!
//! Writes the two records a finished stream leaves behind: the
//! assistant message (awaited by the pipeline before `done`) and the
//! usage/cost log entry (detached, best effort).

use chrono::Utc;
use uuid::Uuid;

use cairn_core::completion::{CompletedStream, CompletionSink};
use cairn_types::config::PricingOverride;
use cairn_types::error::RepositoryError;
use cairn_types::llm::MessageRole;

use crate::llm::pricing;

use super::pool::DatabasePool;
use super::{format_datetime, query_err};

/// SQLite-backed implementation of `CompletionSink`.
pub struct SqliteCompletionSink {
    pool: DatabasePool,
    pricing_overrides: Vec<PricingOverride>,
}

impl SqliteCompletionSink {
    pub fn new(pool: DatabasePool, pricing_overrides: Vec<PricingOverride>) -> Self {
        Self {
            pool,
            pricing_overrides,
        }
    }
}

impl CompletionSink for SqliteCompletionSink {
    async fn persist_message(&self, record: &CompletedStream) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO messages
               (id, conversation_id, role, content, token_count, interrupted, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.message_id.to_string())
        .bind(record.conversation_id.to_string())
        .bind(MessageRole::Assistant.to_string())
        .bind(&record.full_text)
        .bind(record.usage.output_tokens as i64)
        .bind(record.interrupted as i64)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(())
    }

    async fn record_usage(&self, record: &CompletedStream) -> Result<(), RepositoryError> {
        let cost = pricing::estimate_cost(
            record.usage.input_tokens,
            record.usage.output_tokens,
            &record.model,
            &self.pricing_overrides,
        );

        sqlx::query(
            r#"INSERT INTO usage_logs
               (id, user_id, conversation_id, message_id, model,
                prompt_tokens, completion_tokens, cost_usd, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(record.user_id.to_string())
        .bind(record.conversation_id.to_string())
        .bind(record.message_id.to_string())
        .bind(&record.model)
        .bind(record.usage.input_tokens as i64)
        .bind(record.usage.output_tokens as i64)
        .bind(cost)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(())
    }
}
