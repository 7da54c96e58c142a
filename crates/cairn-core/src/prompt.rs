//! System prompt builder.
//!
//! Pure and deterministic: identical inputs always produce the same
//! prompt string. Sections backed by absent data are omitted
//! entirely, never emitted as empty headers. An empty section header
//! can itself bias model behavior, so omission is a hard contract
//! here, covered by the section-absence tests below.

use cairn_types::context::ContextBundle;
use cairn_types::llm::{ChatTurn, MessageRole};

/// Header of the stored-context instruction block. Tests assert on
/// presence/absence of these markers.
pub const MEMORY_SECTION_HEADER: &str = "<stored_context>";
pub const HISTORY_SECTION_HEADER: &str = "<previous_conversations>";
pub const PATTERN_SECTION_HEADER: &str = "<pattern_recognition>";

/// Builds the system prompt for one request.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Compose the system prompt, in order: core behavioral
    /// instructions, domain methodology, stored-context block (iff
    /// the bundle has profile data), previous-conversations block
    /// (iff summaries exist), pattern-recognition block (iff there
    /// is cross-session history to reason over).
    pub fn build(
        core_instructions: &str,
        bundle: &ContextBundle,
        prior_turns: &[ChatTurn],
    ) -> String {
        let mut sections = Vec::with_capacity(5);

        sections.push(core_instructions.trim().to_string());

        if let Some(domain) = &bundle.domain {
            sections.push(format!(
                "<methodology domain=\"{}\">\n{}\n</methodology>",
                domain.title,
                domain.methodology.trim()
            ));
        }

        if bundle.has_profile() {
            sections.push(Self::memory_section(bundle));
        }

        if bundle.has_history() {
            sections.push(Self::history_section(bundle));
            // Patterns require history; never fabricated from a
            // single session.
            sections.push(Self::pattern_section());
        }

        if !prior_turns.is_empty() {
            let recap: Vec<String> = prior_turns
                .iter()
                .map(|t| {
                    let speaker = match t.role {
                        MessageRole::User => "User",
                        MessageRole::Assistant => "Coach",
                        MessageRole::System => "System",
                    };
                    format!("{speaker}: {}", t.content)
                })
                .collect();
            sections.push(format!(
                "<current_conversation>\n{}\n</current_conversation>",
                recap.join("\n")
            ));
        }

        sections.join("\n\n")
    }

    fn memory_section(bundle: &ContextBundle) -> String {
        let mut lines = Vec::new();
        if let Some(profile) = &bundle.profile {
            if !profile.values_goals.trim().is_empty() {
                lines.push(format!("Values and goals: {}", profile.values_goals.trim()));
            }
            if !profile.situation.trim().is_empty() {
                lines.push(format!("Current situation: {}", profile.situation.trim()));
            }
        }
        for insight in &bundle.insights {
            lines.push(format!("Confirmed insight: {}", insight.content));
        }

        format!(
            "{MEMORY_SECTION_HEADER}\n\
             {}\n\
             When you draw on any of this stored context, wrap the reference \
             in a memory tag: [MEMORY: what you are referencing]. Use the tag \
             inline, at the exact point of the reference.\n\
             </stored_context>",
            lines.join("\n")
        )
    }

    fn history_section(bundle: &ContextBundle) -> String {
        let lines: Vec<String> = bundle
            .summaries
            .iter()
            .map(|s| match &s.domain {
                Some(domain) => format!("- ({domain}) {}", s.summary),
                None => format!("- {}", s.summary),
            })
            .collect();

        format!(
            "{HISTORY_SECTION_HEADER}\n\
             Summaries of this user's recent sessions:\n\
             {}\n\
             You may reference these with [MEMORY: ...] tags as well.\n\
             </previous_conversations>",
            lines.join("\n")
        )
    }

    fn pattern_section() -> String {
        format!(
            "{PATTERN_SECTION_HEADER}\n\
             If, and only if, you notice a theme recurring across several of \
             the sessions above with high confidence, you may surface it once, \
             wrapped in a pattern tag: [PATTERN: the recurring theme]. Never \
             force a pattern; most responses contain none. A single session is \
             never enough evidence for a pattern.\n\
             </pattern_recognition>"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_types::context::{ConversationSummary, DomainConfig, UserProfile};
    use uuid::Uuid;

    const CORE: &str = "You are a supportive coach.";

    fn bundle_with_history() -> ContextBundle {
        ContextBundle {
            profile: Some(UserProfile {
                values_goals: "autonomy".to_string(),
                situation: "career switch".to_string(),
            }),
            insights: Vec::new(),
            summaries: vec![ConversationSummary {
                conversation_id: Uuid::now_v7(),
                domain: Some("career".to_string()),
                summary: "User focus: interview prep.".to_string(),
            }],
            domain: Some(DomainConfig {
                id: "career".to_string(),
                title: "Career".to_string(),
                methodology: "Strengths-based.".to_string(),
            }),
        }
    }

    #[test]
    fn full_bundle_emits_all_sections() {
        let prompt = PromptBuilder::build(CORE, &bundle_with_history(), &[]);
        assert!(prompt.starts_with(CORE));
        assert!(prompt.contains(MEMORY_SECTION_HEADER));
        assert!(prompt.contains(HISTORY_SECTION_HEADER));
        assert!(prompt.contains(PATTERN_SECTION_HEADER));
        assert!(prompt.contains("[MEMORY:"));
        assert!(prompt.contains("[PATTERN:"));
    }

    #[test]
    fn empty_bundle_omits_sections_entirely() {
        // Section-absence, not emptiness: a new user with no history
        // must see neither header at all.
        let prompt = PromptBuilder::build(CORE, &ContextBundle::default(), &[]);
        assert!(!prompt.contains(MEMORY_SECTION_HEADER));
        assert!(!prompt.contains(HISTORY_SECTION_HEADER));
        assert!(!prompt.contains(PATTERN_SECTION_HEADER));
        assert_eq!(prompt, CORE);
    }

    #[test]
    fn pattern_section_requires_history_not_just_profile() {
        let bundle = ContextBundle {
            profile: Some(UserProfile {
                values_goals: "calm".to_string(),
                situation: String::new(),
            }),
            ..Default::default()
        };
        let prompt = PromptBuilder::build(CORE, &bundle, &[]);
        assert!(prompt.contains(MEMORY_SECTION_HEADER));
        assert!(!prompt.contains(PATTERN_SECTION_HEADER));
        assert!(!prompt.contains(HISTORY_SECTION_HEADER));
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let bundle = bundle_with_history();
        let turns = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let a = PromptBuilder::build(CORE, &bundle, &turns);
        let b = PromptBuilder::build(CORE, &bundle, &turns);
        assert_eq!(a, b);
    }

    #[test]
    fn prior_turns_are_recapped_in_order() {
        let turns = vec![ChatTurn::user("first"), ChatTurn::assistant("second")];
        let prompt = PromptBuilder::build(CORE, &ContextBundle::default(), &turns);
        let user_pos = prompt.find("User: first").unwrap();
        let coach_pos = prompt.find("Coach: second").unwrap();
        assert!(user_pos < coach_pos);
    }
}
