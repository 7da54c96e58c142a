//! User and API token store.
//!
//! Tokens are stored as SHA-256 hex digests; the raw token exists
//! only in the client's hands and in the Authorization header.

use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::Row;
use uuid::Uuid;

use cairn_types::error::RepositoryError;
use cairn_types::usage::SubscriptionTier;

use super::pool::DatabasePool;
use super::{format_datetime, parse_uuid, query_err};

/// The resolved owner of a presented bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenOwner {
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
}

/// SQLite-backed user and token store.
pub struct SqliteUserStore {
    pool: DatabasePool,
}

/// SHA-256 hex digest of a raw bearer token.
pub fn hash_token(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    format!("{digest:x}")
}

impl SqliteUserStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Create a user with the given tier.
    pub async fn create_user(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
    ) -> Result<(), RepositoryError> {
        let tier_str = match tier {
            SubscriptionTier::Trial => "trial",
            SubscriptionTier::Paid => "paid",
        };
        sqlx::query("INSERT INTO users (id, tier, created_at) VALUES (?, ?, ?)")
            .bind(user_id.to_string())
            .bind(tier_str)
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;
        Ok(())
    }

    /// Issue a bearer token for a user; only the hash is stored.
    pub async fn issue_token(&self, user_id: Uuid, raw_token: &str) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO api_tokens (token_hash, user_id, created_at) VALUES (?, ?, ?)")
            .bind(hash_token(raw_token))
            .bind(user_id.to_string())
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;
        Ok(())
    }

    /// Resolve a raw bearer token to its owner, or `None` when the
    /// token is unknown.
    pub async fn resolve_token(&self, raw_token: &str) -> Result<Option<TokenOwner>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT u.id, u.tier FROM api_tokens t
               JOIN users u ON u.id = t.user_id
               WHERE t.token_hash = ?"#,
        )
        .bind(hash_token(raw_token))
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id").map_err(query_err)?;
        let tier: String = row.try_get("tier").map_err(query_err)?;
        let tier = match tier.as_str() {
            "trial" => SubscriptionTier::Trial,
            "paid" => SubscriptionTier::Paid,
            other => {
                return Err(RepositoryError::Query(format!(
                    "unknown subscription tier: {other}"
                )));
            }
        };

        Ok(Some(TokenOwner {
            user_id: parse_uuid(&id)?,
            tier,
        }))
    }

    /// Record that a token was just used. Best effort.
    pub async fn touch_token(&self, raw_token: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE api_tokens SET last_used_at = ? WHERE token_hash = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(hash_token(raw_token))
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;
        Ok(())
    }

    /// Whether any token has been issued yet.
    pub async fn has_any_token(&self) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT 1 FROM api_tokens LIMIT 1")
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn token_round_trip() {
        let store = SqliteUserStore::new(test_pool().await);
        let user_id = Uuid::now_v7();
        store.create_user(user_id, SubscriptionTier::Paid).await.unwrap();
        store.issue_token(user_id, "tok-secret-123").await.unwrap();

        let owner = store.resolve_token("tok-secret-123").await.unwrap().unwrap();
        assert_eq!(owner.user_id, user_id);
        assert_eq!(owner.tier, SubscriptionTier::Paid);

        store.touch_token("tok-secret-123").await.unwrap();
        assert!(store.has_any_token().await.unwrap());
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let store = SqliteUserStore::new(test_pool().await);
        assert!(store.resolve_token("nope").await.unwrap().is_none());
        assert!(!store.has_any_token().await.unwrap());
    }

    #[test]
    fn hash_is_stable_and_not_the_raw_token() {
        let h = hash_token("tok-abc");
        assert_eq!(h, hash_token("tok-abc"));
        assert_ne!(h, "tok-abc");
        assert_eq!(h.len(), 64);
    }
}
