//! First-run local account bootstrap.
//!
//! A fresh data dir has no users and no tokens. On startup the server
//! creates one trial user and one bearer token, printing the raw
//! token exactly once; only its hash is stored.

use uuid::Uuid;

use cairn_infra::sqlite::{DatabasePool, SqliteUserStore};
use cairn_types::usage::SubscriptionTier;

/// Ensure at least one account and token exist.
///
/// Returns the raw token when one was just created, `None` when an
/// account is already set up.
pub async fn ensure_local_account(pool: &DatabasePool) -> anyhow::Result<Option<String>> {
    let store = SqliteUserStore::new(pool.clone());
    if store.has_any_token().await? {
        return Ok(None);
    }

    let user_id = Uuid::now_v7();
    store.create_user(user_id, SubscriptionTier::Trial).await?;

    let raw_token = format!(
        "cairn_{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );
    store.issue_token(user_id, &raw_token).await?;

    Ok(Some(raw_token))
}
