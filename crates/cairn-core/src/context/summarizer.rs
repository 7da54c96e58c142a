//! Extractive conversation summaries.
//!
//! Past conversations are reduced to short summaries by light
//! heuristics over their last few messages. No model call: the
//! assembler's cost and latency stay independent of how much history
//! a user has, and the prompt-token overhead stays bounded.

use cairn_types::chat::StoredMessage;
use cairn_types::llm::MessageRole;

/// Character budget per individual summary (~120 tokens).
const SUMMARY_CHAR_BUDGET: usize = 480;

/// Estimated characters per token, used for prompt budgeting.
pub const CHARS_PER_TOKEN: usize = 4;

/// Condense the tail of a conversation into one short summary line.
///
/// Takes the first sentence of the most recent user message (what
/// they were working on) and of the most recent assistant message
/// (where the session landed), skipping interrupted fragments.
pub fn summarize_tail(messages: &[StoredMessage]) -> String {
    let last_user = messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User && !m.content.trim().is_empty());
    let last_assistant = messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant && !m.interrupted && !m.content.trim().is_empty());

    let mut parts = Vec::with_capacity(2);
    if let Some(msg) = last_user {
        parts.push(format!("User focus: {}", first_sentence(&msg.content)));
    }
    if let Some(msg) = last_assistant {
        parts.push(format!("Session landed on: {}", first_sentence(&msg.content)));
    }

    truncate_chars(&parts.join(" "), SUMMARY_CHAR_BUDGET)
}

/// Trim a set of summaries to a total token budget, dropping from the
/// oldest end and truncating the last survivor if needed.
pub fn cap_to_token_budget(summaries: &mut Vec<String>, token_budget: u32) {
    let char_budget = token_budget as usize * CHARS_PER_TOKEN;
    let mut used = 0usize;
    let mut kept = 0usize;

    for summary in summaries.iter_mut() {
        if used >= char_budget {
            break;
        }
        let remaining = char_budget - used;
        if summary.len() > remaining {
            *summary = truncate_chars(summary, remaining);
        }
        used += summary.len();
        kept += 1;
    }

    summaries.truncate(kept);
}

/// First sentence of a text, bounded in length.
fn first_sentence(text: &str) -> String {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?' | '\n'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(text.len());
    truncate_chars(text[..end].trim_end(), SUMMARY_CHAR_BUDGET / 2)
}

/// Truncate at a char boundary, appending an ellipsis when cut.
fn truncate_chars(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut cut = max_bytes.saturating_sub(1);
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &text[..cut].trim_end())
}
