//! Parallel loader of the per-request context bundle.
//!
//! Issues independent fetches concurrently (profile + insights,
//! recent-conversation summaries, domain configuration) and merges
//! them into a [`ContextBundle`]. Every sub-fetch is wrapped in its
//! own timeout; an error or timeout contributes an empty default to
//! the bundle rather than failing the assembly. Context degradation
//! is never an error condition.

use std::time::Duration;

use cairn_types::context::{ContextBundle, ConversationSummary, DomainConfig, Insight, UserProfile};
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::repository::{ContextRepository, ConversationRepository, MessageRepository};

use super::summarizer;

/// How many prior conversations are summarized into the bundle.
const MAX_PRIOR_CONVERSATIONS: u32 = 5;

/// How many trailing messages feed each conversation summary.
const TAIL_MESSAGES: u32 = 6;

/// Fan-out/fan-in context assembler.
pub struct ContextAssembler<C, M, X> {
    conversations: C,
    messages: M,
    context: X,
    fetch_budget: Duration,
    history_token_budget: u32,
}

impl<C, M, X> ContextAssembler<C, M, X>
where
    C: ConversationRepository,
    M: MessageRepository,
    X: ContextRepository,
{
    pub fn new(
        conversations: C,
        messages: M,
        context: X,
        fetch_budget: Duration,
        history_token_budget: u32,
    ) -> Self {
        Self {
            conversations,
            messages,
            context,
            fetch_budget,
            history_token_budget,
        }
    }

    /// Assemble the context bundle for one request.
    pub async fn assemble(
        &self,
        user_id: &Uuid,
        current_conversation_id: &Uuid,
        domain_id: Option<&str>,
    ) -> ContextBundle {
        let (profile_part, summaries, domain) = tokio::join!(
            self.fetch_profile(user_id),
            self.fetch_summaries(user_id, current_conversation_id),
            self.fetch_domain(domain_id),
        );
        let (profile, insights) = profile_part;

        ContextBundle {
            profile,
            insights,
            summaries,
            domain,
        }
    }

    async fn fetch_profile(&self, user_id: &Uuid) -> (Option<UserProfile>, Vec<Insight>) {
        let profile = match timeout(self.fetch_budget, self.context.profile(user_id)).await {
            Ok(Ok(profile)) => profile,
            Ok(Err(e)) => {
                warn!(%user_id, error = %e, "profile fetch failed, degrading bundle");
                None
            }
            Err(_) => {
                warn!(%user_id, "profile fetch timed out, degrading bundle");
                None
            }
        };

        let insights = match timeout(self.fetch_budget, self.context.confirmed_insights(user_id)).await
        {
            Ok(Ok(insights)) => insights,
            Ok(Err(e)) => {
                warn!(%user_id, error = %e, "insight fetch failed, degrading bundle");
                Vec::new()
            }
            Err(_) => {
                warn!(%user_id, "insight fetch timed out, degrading bundle");
                Vec::new()
            }
        };

        (profile, insights)
    }

    async fn fetch_summaries(
        &self,
        user_id: &Uuid,
        current_conversation_id: &Uuid,
    ) -> Vec<ConversationSummary> {
        let recent = match timeout(
            self.fetch_budget,
            self.conversations
                .recent_for_user(user_id, current_conversation_id, MAX_PRIOR_CONVERSATIONS),
        )
        .await
        {
            Ok(Ok(recent)) => recent,
            Ok(Err(e)) => {
                warn!(%user_id, error = %e, "recent-conversation fetch failed, degrading bundle");
                return Vec::new();
            }
            Err(_) => {
                warn!(%user_id, "recent-conversation fetch timed out, degrading bundle");
                return Vec::new();
            }
        };

        let mut summaries = Vec::with_capacity(recent.len());
        for conversation in &recent {
            let tail = match timeout(
                self.fetch_budget,
                self.messages.tail(&conversation.id, TAIL_MESSAGES),
            )
            .await
            {
                Ok(Ok(tail)) => tail,
                Ok(Err(e)) => {
                    warn!(conversation_id = %conversation.id, error = %e, "tail fetch failed, skipping summary");
                    continue;
                }
                Err(_) => continue,
            };

            let summary = summarizer::summarize_tail(&tail);
            if summary.is_empty() {
                continue;
            }
            summaries.push(ConversationSummary {
                conversation_id: conversation.id,
                domain: conversation.domain.clone(),
                summary,
            });
        }

        let mut texts: Vec<String> = summaries.iter().map(|s| s.summary.clone()).collect();
        summarizer::cap_to_token_budget(&mut texts, self.history_token_budget);
        summaries.truncate(texts.len());
        for (summary, text) in summaries.iter_mut().zip(texts) {
            summary.summary = text;
        }
        summaries
    }

    async fn fetch_domain(&self, domain_id: Option<&str>) -> Option<DomainConfig> {
        let domain_id = domain_id?;
        match timeout(self.fetch_budget, self.context.domain(domain_id)).await {
            Ok(Ok(domain)) => domain,
            Ok(Err(e)) => {
                warn!(domain_id, error = %e, "domain fetch failed, degrading bundle");
                None
            }
            Err(_) => {
                warn!(domain_id, "domain fetch timed out, degrading bundle");
                None
            }
        }
    }
}
