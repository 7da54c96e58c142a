//! SQLite usage ledger.
//!
//! The check-and-increment is a single conditional UPDATE on the
//! writer pool. The writer pool has exactly one connection, so two
//! concurrent admissions for the same counter serialize at the
//! database and can never both take the last slot.

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use cairn_core::ledger::UsageLedger;
use cairn_types::error::LedgerError;
use cairn_types::usage::{BillingPeriod, QuotaDecision};

use super::pool::DatabasePool;
use super::format_datetime;

/// SQLite-backed implementation of `UsageLedger`.
pub struct SqliteUsageLedger {
    pool: DatabasePool,
}

impl SqliteUsageLedger {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn stored_count(&self, user_id: Uuid, period_key: &str) -> Result<u32, LedgerError> {
        let row = sqlx::query(
            "SELECT count FROM usage_counters WHERE user_id = ? AND billing_period = ?",
        )
        .bind(user_id.to_string())
        .bind(period_key)
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(storage_err)?;

        match row {
            Some(row) => {
                let count: i64 = row.try_get("count").map_err(storage_err)?;
                Ok(count as u32)
            }
            None => Ok(0),
        }
    }
}

fn storage_err(e: sqlx::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

impl UsageLedger for SqliteUsageLedger {
    async fn check_and_increment(
        &self,
        user_id: Uuid,
        period: &BillingPeriod,
        limit: u32,
    ) -> Result<QuotaDecision, LedgerError> {
        let key = period.key();
        let now = format_datetime(&Utc::now());

        sqlx::query(
            "INSERT OR IGNORE INTO usage_counters (user_id, billing_period, count, updated_at) VALUES (?, ?, 0, ?)",
        )
        .bind(user_id.to_string())
        .bind(key)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(storage_err)?;

        // The guard rides in the WHERE clause: the increment happens
        // only while a slot remains.
        let result = sqlx::query(
            r#"UPDATE usage_counters
               SET count = count + 1, updated_at = ?
               WHERE user_id = ? AND billing_period = ? AND count < ?"#,
        )
        .bind(&now)
        .bind(user_id.to_string())
        .bind(key)
        .bind(limit as i64)
        .execute(&self.pool.writer)
        .await
        .map_err(storage_err)?;

        let count = self.stored_count(user_id, key).await?;
        if result.rows_affected() == 1 {
            Ok(QuotaDecision::allowed(count, limit))
        } else {
            Ok(QuotaDecision::rejected(count, limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn increments_until_the_limit() {
        let ledger = SqliteUsageLedger::new(test_pool().await);
        let user_id = Uuid::now_v7();
        let period = BillingPeriod::Trial;

        for expected in 1..=3 {
            let decision = ledger.check_and_increment(user_id, &period, 3).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.current_count, expected);
        }

        let rejected = ledger.check_and_increment(user_id, &period, 3).await.unwrap();
        assert!(!rejected.allowed);
        // Rejection reports the unincremented stored value.
        assert_eq!(rejected.current_count, 3);

        // And does not consume anything: the counter stays at the limit.
        let again = ledger.check_and_increment(user_id, &period, 3).await.unwrap();
        assert_eq!(again.current_count, 3);
    }

    #[tokio::test]
    async fn periods_are_independent_counters() {
        let ledger = SqliteUsageLedger::new(test_pool().await);
        let user_id = Uuid::now_v7();

        let trial = BillingPeriod::Trial;
        let month = BillingPeriod::Month("2026-08".to_string());

        for _ in 0..2 {
            ledger.check_and_increment(user_id, &trial, 10).await.unwrap();
        }
        let decision = ledger.check_and_increment(user_id, &month, 10).await.unwrap();
        assert_eq!(decision.current_count, 1);
    }

    #[tokio::test]
    async fn users_are_independent_counters() {
        let ledger = SqliteUsageLedger::new(test_pool().await);
        let period = BillingPeriod::Trial;

        let user_a = Uuid::now_v7();
        let user_b = Uuid::now_v7();

        ledger.check_and_increment(user_a, &period, 5).await.unwrap();
        let decision = ledger.check_and_increment(user_b, &period, 5).await.unwrap();
        assert_eq!(decision.current_count, 1);
    }

    #[tokio::test]
    async fn concurrent_admissions_never_exceed_the_limit() {
        let ledger = Arc::new(SqliteUsageLedger::new(test_pool().await));
        let user_id = Uuid::now_v7();
        let limit = 10u32;

        let mut handles = Vec::new();
        for _ in 0..25 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .check_and_increment(user_id, &BillingPeriod::Trial, limit)
                    .await
                    .unwrap()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().allowed {
                admitted += 1;
            }
        }
        assert_eq!(admitted, limit);

        let last = ledger
            .check_and_increment(user_id, &BillingPeriod::Trial, limit)
            .await
            .unwrap();
        assert_eq!(last.current_count, limit);
    }
}
