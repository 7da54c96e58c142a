//! SQLite context repository: profiles, confirmed insights, domains.

use sqlx::Row;
use uuid::Uuid;

use cairn_core::repository::ContextRepository;
use cairn_types::context::{DomainConfig, Insight, UserProfile};
use cairn_types::error::RepositoryError;
use chrono::Utc;

use super::pool::DatabasePool;
use super::{format_datetime, parse_uuid, query_err};

/// SQLite-backed implementation of `ContextRepository`.
pub struct SqliteContextRepository {
    pool: DatabasePool,
}

impl SqliteContextRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a user's profile.
    pub async fn upsert_profile(
        &self,
        user_id: &Uuid,
        profile: &UserProfile,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO user_profiles (user_id, values_goals, situation, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                   values_goals = excluded.values_goals,
                   situation = excluded.situation,
                   updated_at = excluded.updated_at"#,
        )
        .bind(user_id.to_string())
        .bind(&profile.values_goals)
        .bind(&profile.situation)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(())
    }

    /// Record an insight; only confirmed ones surface in prompts.
    pub async fn add_insight(
        &self,
        user_id: &Uuid,
        insight: &Insight,
        confirmed: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO insights (id, user_id, content, confirmed, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(insight.id.to_string())
        .bind(user_id.to_string())
        .bind(&insight.content)
        .bind(confirmed as i64)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(())
    }

    /// Register a coaching domain.
    pub async fn upsert_domain(&self, domain: &DomainConfig) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO domains (id, title, methodology) VALUES (?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   title = excluded.title,
                   methodology = excluded.methodology"#,
        )
        .bind(&domain.id)
        .bind(&domain.title)
        .bind(&domain.methodology)
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(())
    }
}

impl ContextRepository for SqliteContextRepository {
    async fn profile(&self, user_id: &Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query("SELECT values_goals, situation FROM user_profiles WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(UserProfile {
            values_goals: row.try_get("values_goals").map_err(query_err)?,
            situation: row.try_get("situation").map_err(query_err)?,
        }))
    }

    async fn confirmed_insights(&self, user_id: &Uuid) -> Result<Vec<Insight>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, content FROM insights WHERE user_id = ? AND confirmed = 1 ORDER BY created_at ASC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut insights = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id").map_err(query_err)?;
            insights.push(Insight {
                id: parse_uuid(&id)?,
                content: row.try_get("content").map_err(query_err)?,
            });
        }
        Ok(insights)
    }

    async fn domain(&self, domain_id: &str) -> Result<Option<DomainConfig>, RepositoryError> {
        let row = sqlx::query("SELECT id, title, methodology FROM domains WHERE id = ?")
            .bind(domain_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(DomainConfig {
            id: row.try_get("id").map_err(query_err)?,
            title: row.try_get("title").map_err(query_err)?,
            methodology: row.try_get("methodology").map_err(query_err)?,
        }))
    }
}
