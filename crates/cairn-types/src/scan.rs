//! Semantic tag scan result types.
//!
//! Tags are inline markers inside assistant text: `[MEMORY: ...]`
//! indicates a reference to stored user context, `[PATTERN: ...]` a
//! recurring theme across sessions. The scanner in `cairn-core`
//! produces these shapes; both the server emitter and the CLI client
//! consume them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two recognized tag grammars, distinguished only by keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Memory,
    Pattern,
}

impl TagKind {
    /// The leading keyword inside the opening delimiter.
    pub fn keyword(self) -> &'static str {
        match self {
            TagKind::Memory => "MEMORY",
            TagKind::Pattern => "PATTERN",
        }
    }

    /// The full opener up to and including the colon.
    pub fn opener(self) -> &'static str {
        match self {
            TagKind::Memory => "[MEMORY:",
            TagKind::Pattern => "[PATTERN:",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Memory => write!(f, "memory"),
            TagKind::Pattern => write!(f, "pattern"),
        }
    }
}

/// A completed tag span, with offsets into the *clean* (tag-stripped)
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticTag {
    pub kind: TagKind,
    pub content: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Scanner output for one incoming fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScannedFragment {
    /// Fragment text with tag delimiters removed.
    pub clean_text: String,
    /// A memory tag is open or was completed within this fragment.
    pub memory_moment: bool,
    /// A pattern tag is open or was completed within this fragment.
    pub pattern_insight: bool,
    /// Tags whose closing delimiter arrived in this fragment.
    pub completed_tags: Vec<SemanticTag>,
}

impl ScannedFragment {
    pub fn is_empty(&self) -> bool {
        self.clean_text.is_empty() && self.completed_tags.is_empty()
    }
}

/// Result of scanning a complete message in one shot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub clean_text: String,
    pub tags: Vec<SemanticTag>,
    pub has_memory: bool,
    pub has_pattern: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_kind_openers() {
        assert_eq!(TagKind::Memory.opener(), "[MEMORY:");
        assert_eq!(TagKind::Pattern.opener(), "[PATTERN:");
    }

    #[test]
    fn tag_kind_serde_is_lowercase() {
        let json = serde_json::to_string(&TagKind::Pattern).unwrap();
        assert_eq!(json, "\"pattern\"");
    }
}
