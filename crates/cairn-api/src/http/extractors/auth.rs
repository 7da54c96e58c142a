//! Bearer token authentication extractor.
//!
//! The raw token from `Authorization: Bearer <token>` is SHA-256
//! hashed and resolved against the `api_tokens` table. Extraction
//! happens before any other request stage, so an invalid token is a
//! 401 with no quota or context work done.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use cairn_types::usage::SubscriptionTier;

use crate::http::error::ApiError;
use crate::state::AppState;

/// The authenticated caller. Extracting this validates the token.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let owner = state
            .users
            .resolve_token(&token)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .ok_or_else(|| ApiError::Unauthorized("Invalid bearer token".to_string()))?;

        // Best effort; a failed timestamp update never fails the request.
        let _ = state.users.touch_token(&token).await;

        Ok(CurrentUser {
            user_id: owner.user_id,
            tier: owner.tier,
        })
    }
}

fn bearer_token(parts: &Parts) -> Result<String, ApiError> {
    let header = parts
        .headers
        .get("authorization")
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;
    let value = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header encoding".to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected 'Bearer <token>'".to_string()))?;
    Ok(token.trim().to_string())
}
