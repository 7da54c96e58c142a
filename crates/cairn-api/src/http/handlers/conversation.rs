//! Conversation history retrieval.
//!
//! GET /api/v1/conversations/{id}/messages
//!
//! Assistant messages are stored with their semantic tags intact;
//! this endpoint returns both the raw content and the scan result
//! (clean text plus tag metadata) so clients can re-render history
//! with the same treatment the live stream produced. Scans go
//! through the shared memo since the same messages are requested
//! repeatedly.

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use cairn_core::repository::{ConversationRepository, MessageRepository};
use cairn_types::llm::MessageRole;
use cairn_types::scan::SemanticTag;

use crate::http::error::ApiError;
use crate::http::extractors::auth::CurrentUser;
use crate::state::AppState;

/// One message in the history response.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub role: MessageRole,
    /// Raw stored content, tags intact.
    pub content: String,
    /// Content with tag delimiters stripped.
    pub clean_text: String,
    pub memory_moment: bool,
    pub pattern_insight: bool,
    pub tags: Vec<SemanticTag>,
    pub token_count: u32,
    pub interrupted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub conversation_id: Uuid,
    pub messages: Vec<MessageView>,
}

/// GET /api/v1/conversations/{id}/messages: full history, oldest
/// first.
pub async fn conversation_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let conversation = state
        .conversations
        .get(&conversation_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(ApiError::ConversationNotFound)?;
    if conversation.user_id != user.user_id {
        return Err(ApiError::ConversationNotFound);
    }

    let stored = state
        .messages
        .for_conversation(&conversation_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let messages = stored
        .into_iter()
        .map(|m| {
            // Only assistant output carries tags; user text is
            // returned as-is without a scan.
            if m.role == MessageRole::Assistant {
                let outcome = state.scan_memo.scan(&m.content);
                MessageView {
                    id: m.id,
                    role: m.role,
                    clean_text: outcome.clean_text,
                    memory_moment: outcome.has_memory,
                    pattern_insight: outcome.has_pattern,
                    tags: outcome.tags,
                    content: m.content,
                    token_count: m.token_count,
                    interrupted: m.interrupted,
                    created_at: m.created_at,
                }
            } else {
                MessageView {
                    id: m.id,
                    role: m.role,
                    clean_text: m.content.clone(),
                    memory_moment: false,
                    pattern_insight: false,
                    tags: Vec::new(),
                    content: m.content,
                    token_count: m.token_count,
                    interrupted: m.interrupted,
                    created_at: m.created_at,
                }
            }
        })
        .collect();

    Ok(Json(MessagesResponse {
        conversation_id,
        messages,
    }))
}
