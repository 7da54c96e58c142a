//! Request-scoped context bundle types.
//!
//! A [`ContextBundle`] is recomputed per request from its sources and
//! never persisted as its own entity. Absence of any sub-source
//! degrades the bundle to a smaller but still valid one; it is never
//! an error condition.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored values, goals, and situation for a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub values_goals: String,
    pub situation: String,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.values_goals.trim().is_empty() && self.situation.trim().is_empty()
    }
}

/// A confirmed insight about the user, surfaced in earlier sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: Uuid,
    pub content: String,
}

/// Extractive summary of one prior conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    pub domain: Option<String>,
    pub summary: String,
}

/// Configuration for a coaching domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    pub id: String,
    pub title: String,
    pub methodology: String,
}

/// Ephemeral aggregate assembled per request from parallel fetches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBundle {
    pub profile: Option<UserProfile>,
    pub insights: Vec<Insight>,
    /// Up to five most-recent other conversations, summarized.
    pub summaries: Vec<ConversationSummary>,
    pub domain: Option<DomainConfig>,
}

impl ContextBundle {
    /// Whether the profile section carries anything worth referencing.
    pub fn has_profile(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| !p.is_empty()) || !self.insights.is_empty()
    }

    /// Whether there is cross-session history to reason over.
    ///
    /// Pattern recognition requires history; it is never fabricated
    /// from a single session.
    pub fn has_history(&self) -> bool {
        !self.summaries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bundle_has_neither_profile_nor_history() {
        let bundle = ContextBundle::default();
        assert!(!bundle.has_profile());
        assert!(!bundle.has_history());
    }

    #[test]
    fn whitespace_profile_counts_as_empty() {
        let bundle = ContextBundle {
            profile: Some(UserProfile {
                values_goals: "  \n".to_string(),
                situation: String::new(),
            }),
            ..Default::default()
        };
        assert!(!bundle.has_profile());
    }
}
