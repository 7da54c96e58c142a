//! SQLite conversation repository.

use sqlx::Row;
use uuid::Uuid;

use cairn_core::repository::ConversationRepository;
use cairn_types::chat::{Conversation, ConversationKind};
use cairn_types::error::RepositoryError;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_err};

/// SQLite-backed implementation of `ConversationRepository`.
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Create a conversation row. Used by the chat handler when a
    /// request names a conversation id it has not seen before.
    pub async fn create(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversations (id, user_id, domain, kind, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(conversation.id.to_string())
        .bind(conversation.user_id.to_string())
        .bind(&conversation.domain)
        .bind(conversation.kind.to_string())
        .bind(format_datetime(&conversation.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(())
    }
}

fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let user_id: String = row.try_get("user_id").map_err(query_err)?;
    let domain: Option<String> = row.try_get("domain").map_err(query_err)?;
    let kind: String = row.try_get("kind").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;

    Ok(Conversation {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        domain,
        kind: kind
            .parse::<ConversationKind>()
            .map_err(RepositoryError::Query)?,
        created_at: parse_datetime(&created_at)?,
    })
}

impl ConversationRepository for SqliteConversationRepository {
    async fn get(&self, conversation_id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(conversation_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_conversation).transpose()
    }

    async fn recent_for_user(
        &self,
        user_id: &Uuid,
        exclude: &Uuid,
        limit: u32,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM conversations
               WHERE user_id = ? AND id != ?
               ORDER BY created_at DESC
               LIMIT ?"#,
        )
        .bind(user_id.to_string())
        .bind(exclude.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(row_to_conversation).collect()
    }
}
