//! Usage ledger: the sole arbiter of "may this user send a message
//! right now".
//!
//! The [`UsageLedger`] trait is the atomic store contract; the SQLite
//! implementation lives in `cairn-infra`. [`QuotaGate`] layers policy
//! on top: discovery conversations bypass the ledger entirely, and a
//! storage outage fails open (admit and log) so a metering fault
//! cannot lock out the whole user base.

use cairn_types::chat::ConversationKind;
use cairn_types::error::LedgerError;
use cairn_types::usage::{BillingPeriod, QuotaDecision, SubscriptionTier};
use chrono::Utc;
use tracing::{debug, error};
use uuid::Uuid;

/// Atomic per-(user, billing-period) message counter.
///
/// Implementations must provide linearizable check-and-increment
/// semantics: two simultaneous calls for the same key must never both
/// be admitted when only one slot remains, and a rejected call must
/// leave the stored count untouched.
pub trait UsageLedger: Send + Sync {
    /// Check the counter and, if below `limit`, increment it.
    ///
    /// On rejection the returned `current_count` is the unincremented
    /// stored value.
    fn check_and_increment(
        &self,
        user_id: Uuid,
        period: &BillingPeriod,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<QuotaDecision, LedgerError>> + Send;
}

/// Admission verdict from the quota gate.
#[derive(Debug, Clone)]
pub enum GateVerdict {
    /// Open a stream. `decision` is `None` for bypassed (discovery)
    /// requests, which are never charged against any quota.
    Admitted { decision: Option<QuotaDecision> },
    /// Return a structured rate-limit rejection; no stream is opened.
    Rejected {
        decision: QuotaDecision,
        period: BillingPeriod,
    },
}

/// Per-tier limits for the gate.
#[derive(Debug, Clone, Copy)]
pub struct QuotaLimits {
    pub trial_messages: u32,
    pub monthly_messages: u32,
}

impl QuotaLimits {
    pub fn for_tier(&self, tier: SubscriptionTier) -> u32 {
        match tier {
            SubscriptionTier::Trial => self.trial_messages,
            SubscriptionTier::Paid => self.monthly_messages,
        }
    }
}

/// Policy wrapper over a [`UsageLedger`].
pub struct QuotaGate<L: UsageLedger> {
    ledger: L,
    limits: QuotaLimits,
}

impl<L: UsageLedger> QuotaGate<L> {
    pub fn new(ledger: L, limits: QuotaLimits) -> Self {
        Self { ledger, limits }
    }

    /// Decide whether a message may be sent.
    ///
    /// Discovery conversations skip the ledger entirely: no read, no
    /// write, no charge. Ledger storage errors fail open.
    pub async fn admit(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
        kind: ConversationKind,
    ) -> GateVerdict {
        if kind.bypasses_quota() {
            debug!(%user_id, "discovery conversation, quota bypassed");
            return GateVerdict::Admitted { decision: None };
        }

        let period = BillingPeriod::current(tier, Utc::now());
        let limit = self.limits.for_tier(tier);

        match self
            .ledger
            .check_and_increment(user_id, &period, limit)
            .await
        {
            Ok(decision) if decision.allowed => GateVerdict::Admitted {
                decision: Some(decision),
            },
            Ok(decision) => GateVerdict::Rejected { decision, period },
            Err(e) => {
                // Fail open: metering outages must not lock users out
                // of the product. The gap in enforcement is logged.
                error!(%user_id, error = %e, "usage ledger unreachable, admitting without quota check");
                GateVerdict::Admitted { decision: None }
            }
        }
    }
}
