//! Conversation and message types.
//!
//! Assistant messages are stored with their semantic tags intact, so
//! re-rendering a historical message reproduces the same visual
//! treatment the live stream produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::llm::MessageRole;

/// Request class of a conversation.
///
/// Discovery conversations are exempt from usage metering: the ledger
/// is never consulted and never incremented for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Standard,
    Discovery,
}

impl ConversationKind {
    pub fn bypasses_quota(self) -> bool {
        matches!(self, ConversationKind::Discovery)
    }
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationKind::Standard => write!(f, "standard"),
            ConversationKind::Discovery => write!(f, "discovery"),
        }
    }
}

impl FromStr for ConversationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(ConversationKind::Standard),
            "discovery" => Ok(ConversationKind::Discovery),
            other => Err(format!("invalid conversation kind: '{other}'")),
        }
    }
}

/// A coaching conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Coaching domain this conversation belongs to (e.g. "career").
    pub domain: Option<String>,
    pub kind: ConversationKind,
    pub created_at: DateTime<Utc>,
}

/// A persisted chat message. Created once at stream completion and
/// never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    /// Raw text with `[MEMORY: ...]` / `[PATTERN: ...]` tags intact.
    pub content: String,
    pub token_count: u32,
    /// True when the client disconnected before the stream finished.
    pub interrupted: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_kind_roundtrip() {
        for kind in [ConversationKind::Standard, ConversationKind::Discovery] {
            let parsed: ConversationKind = kind.to_string().parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn only_discovery_bypasses_quota() {
        assert!(ConversationKind::Discovery.bypasses_quota());
        assert!(!ConversationKind::Standard.bypasses_quota());
    }
}
