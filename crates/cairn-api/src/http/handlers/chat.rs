//! SSE streaming chat endpoint.
//!
//! POST /api/v1/chat/stream
//!
//! Every SSE `data:` field carries one JSON-encoded [`ChatEvent`]:
//! `token` frames, then exactly one `done` or `error`. Failures
//! before the stream opens are plain HTTP errors instead; quota
//! exhaustion is a 429 with the structured rate-limit body.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use cairn_core::pipeline::ChatRequest;
use cairn_core::repository::ConversationRepository;
use cairn_types::usage::RateLimitBody;

use crate::http::error::ApiError;
use crate::http::extractors::auth::CurrentUser;
use crate::state::AppState;

/// Request body for the streaming chat endpoint. The wire field is
/// camelCase to match the `messageId` in the outbound `done` event.
#[derive(Debug, Deserialize)]
pub struct ChatStreamRequest {
    #[serde(rename = "conversationId")]
    pub conversation_id: Uuid,
    pub message: String,
}

/// POST /api/v1/chat/stream: run one user message through the
/// pipeline and stream the response.
pub async fn stream_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<ChatStreamRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::Validation("message must not be empty".to_string()));
    }

    let conversation = state
        .conversations
        .get(&body.conversation_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(ApiError::ConversationNotFound)?;
    // Another user's conversation is indistinguishable from a missing one.
    if conversation.user_id != user.user_id {
        return Err(ApiError::ConversationNotFound);
    }

    info!(
        user_id = %user.user_id,
        conversation_id = %conversation.id,
        kind = %conversation.kind,
        "opening chat stream"
    );

    let request = ChatRequest {
        user_id: user.user_id,
        tier: user.tier,
        conversation,
        message: body.message,
    };

    let events = match state.pipeline.run(request).await {
        Ok(events) => events,
        Err(rejection) => {
            return Err(ApiError::RateLimited(RateLimitBody::new(
                &rejection.decision,
                &rejection.period,
                Utc::now(),
            )));
        }
    };

    let sse = events.map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(Event::default().data(data))
    });

    Ok(Sse::new(sse).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
