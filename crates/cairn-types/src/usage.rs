//! Usage metering types: billing periods, quota decisions, and the
//! write-once cost log.
//!
//! The trial billing period is a fixed sentinel, not a rolling month.
//! A trial allowance is a lifetime cap; keying it by month would grant
//! an accidental monthly reset.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Fixed period key for trial users. Never changes, never rolls over.
pub const TRIAL_PERIOD_KEY: &str = "trial";

/// Subscription tier of a user, as granted by the billing system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Trial,
    Paid,
}

impl SubscriptionTier {
    pub fn is_trial(self) -> bool {
        matches!(self, SubscriptionTier::Trial)
    }
}

/// The key under which a usage counter is scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingPeriod {
    /// Lifetime trial allowance.
    Trial,
    /// Calendar month, keyed as `"YYYY-MM"`.
    Month(String),
}

impl BillingPeriod {
    /// Resolve the current billing period for a tier.
    pub fn current(tier: SubscriptionTier, now: DateTime<Utc>) -> Self {
        match tier {
            SubscriptionTier::Trial => BillingPeriod::Trial,
            SubscriptionTier::Paid => {
                BillingPeriod::Month(format!("{:04}-{:02}", now.year(), now.month()))
            }
        }
    }

    /// The storage key for this period.
    pub fn key(&self) -> &str {
        match self {
            BillingPeriod::Trial => TRIAL_PERIOD_KEY,
            BillingPeriod::Month(key) => key,
        }
    }

    /// Start of the next period, if this period ever resets.
    ///
    /// Trial allowances never reset, so they have no reset instant.
    pub fn next_reset(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            BillingPeriod::Trial => None,
            BillingPeriod::Month(_) => {
                let (year, month) = if now.month() == 12 {
                    (now.year() + 1, 1)
                } else {
                    (now.year(), now.month() + 1)
                };
                chrono::NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            }
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Outcome of an atomic check-and-increment against a usage counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Count after the call: incremented when allowed, untouched when
    /// rejected.
    pub current_count: u32,
    pub limit: u32,
    pub remaining: u32,
}

impl QuotaDecision {
    pub fn allowed(current_count: u32, limit: u32) -> Self {
        Self {
            allowed: true,
            current_count,
            limit,
            remaining: limit.saturating_sub(current_count),
        }
    }

    pub fn rejected(current_count: u32, limit: u32) -> Self {
        Self {
            allowed: false,
            current_count,
            limit,
            remaining: 0,
        }
    }
}

/// A stored usage counter row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCounter {
    pub user_id: Uuid,
    pub billing_period: String,
    pub count: u32,
    pub limit: u32,
    pub updated_at: DateTime<Utc>,
}

/// Write-once cost accounting entry. Best effort: its absence never
/// blocks or fails the surrounding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost_usd: f64,
    pub created_at: DateTime<Utc>,
}

/// Structured rejection body returned instead of opening a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitBody {
    /// Always `"rate_limited"`.
    pub error: String,
    pub message: String,
    pub is_trial: bool,
    /// ISO-8601 instant when the quota resets; null for trials.
    pub remaining_until_reset: Option<String>,
    pub current_count: u32,
    pub limit: u32,
}

impl RateLimitBody {
    pub fn new(decision: &QuotaDecision, period: &BillingPeriod, now: DateTime<Utc>) -> Self {
        let is_trial = matches!(period, BillingPeriod::Trial);
        let message = if is_trial {
            "You've used all of your trial messages. Upgrade to keep going.".to_string()
        } else {
            "You've reached this month's message limit.".to_string()
        };
        Self {
            error: "rate_limited".to_string(),
            message,
            is_trial,
            remaining_until_reset: period.next_reset(now).map(|dt| dt.to_rfc3339()),
            current_count: decision.current_count,
            limit: decision.limit,
        }
    }
}
