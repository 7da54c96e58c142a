//! Request-level error responses.
//!
//! These cover failures before a stream opens. Mid-stream failures
//! never reach this type; they fold into the single `error` event on
//! the SSE stream itself.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use cairn_types::usage::RateLimitBody;

/// Application error mapped to an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid bearer token.
    Unauthorized(String),
    /// Conversation unknown, or not owned by the caller.
    ConversationNotFound,
    /// Malformed request body.
    Validation(String),
    /// Quota exhausted; carries the structured 429 body.
    RateLimited(RateLimitBody),
    /// Anything else. Detail is logged server-side, not returned.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::RateLimited(body) => {
                (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
            }
            ApiError::Unauthorized(message) => envelope(StatusCode::UNAUTHORIZED, "unauthorized", &message),
            ApiError::ConversationNotFound => envelope(
                StatusCode::NOT_FOUND,
                "conversation_not_found",
                "Conversation not found",
            ),
            ApiError::Validation(message) => {
                envelope(StatusCode::BAD_REQUEST, "validation_error", &message)
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                envelope(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        }
    }
}

fn envelope(status: StatusCode, code: &str, message: &str) -> Response {
    let body = json!({
        "error": code,
        "message": message,
    });
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use cairn_types::usage::{BillingPeriod, QuotaDecision};
    use chrono::Utc;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rate_limited_returns_429_with_structured_body() {
        let body = RateLimitBody::new(
            &QuotaDecision::rejected(100, 100),
            &BillingPeriod::Trial,
            Utc::now(),
        );
        let response = ApiError::RateLimited(body).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let json = body_json(response).await;
        assert_eq!(json["error"], "rate_limited");
        assert_eq!(json["is_trial"], true);
        assert_eq!(json["remaining_until_reset"], serde_json::Value::Null);
        assert_eq!(json["current_count"], 100);
        assert_eq!(json["limit"], 100);
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let response =
            ApiError::Internal("sqlite said something scary".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Internal server error");
    }

    #[tokio::test]
    async fn not_found_shape() {
        let response = ApiError::ConversationNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "conversation_not_found");
    }
}
