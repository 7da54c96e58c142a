//! SQLite message repository.
//!
//! Messages are append-only. Assistant text is stored with semantic
//! tags intact; stripping happens at render time, never at rest.

use sqlx::Row;
use uuid::Uuid;

use cairn_core::repository::MessageRepository;
use cairn_types::chat::StoredMessage;
use cairn_types::error::RepositoryError;
use cairn_types::llm::MessageRole;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_err};

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<StoredMessage, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let conversation_id: String = row.try_get("conversation_id").map_err(query_err)?;
    let role: String = row.try_get("role").map_err(query_err)?;
    let content: String = row.try_get("content").map_err(query_err)?;
    let token_count: i64 = row.try_get("token_count").map_err(query_err)?;
    let interrupted: i64 = row.try_get("interrupted").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;

    Ok(StoredMessage {
        id: parse_uuid(&id)?,
        conversation_id: parse_uuid(&conversation_id)?,
        role: role.parse::<MessageRole>().map_err(RepositoryError::Query)?,
        content,
        token_count: token_count as u32,
        interrupted: interrupted != 0,
        created_at: parse_datetime(&created_at)?,
    })
}

impl MessageRepository for SqliteMessageRepository {
    async fn save(&self, message: &StoredMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO messages
               (id, conversation_id, role, content, token_count, interrupted, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(message.token_count as i64)
        .bind(message.interrupted as i64)
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(())
    }

    async fn for_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(row_to_message).collect()
    }

    async fn tail(
        &self,
        conversation_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        // Last N by time, returned oldest first.
        let rows = sqlx::query(
            r#"SELECT * FROM (
                   SELECT * FROM messages
                   WHERE conversation_id = ?
                   ORDER BY created_at DESC, id DESC
                   LIMIT ?
               ) ORDER BY created_at ASC, id ASC"#,
        )
        .bind(conversation_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(row_to_message).collect()
    }
}
