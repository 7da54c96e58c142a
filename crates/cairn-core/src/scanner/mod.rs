//! Incremental semantic tag scanner.
//!
//! Detects `[MEMORY: ...]` and `[PATTERN: ...]` spans inside a stream
//! of text fragments without buffering the whole response. Input may
//! be split at arbitrary points, including inside the tag keyword
//! itself, so the scanner carries a bounded look-back buffer (just
//! the partial opener) across fragment boundaries.
//!
//! One state machine backs both entry points: [`TagScanner`] for live
//! streams and [`scan_all`] for already-complete messages, so the two
//! paths cannot drift. Full-text scans are memoized via [`ScanMemo`]
//! because the same persisted message is re-scanned on every
//! re-render.

mod memo;

pub use memo::ScanMemo;

use cairn_types::scan::{ScanOutcome, ScannedFragment, SemanticTag, TagKind};

/// Scanner state across fragment boundaries.
enum State {
    /// Ordinary prose.
    Outside,
    /// Buffering text that may still become a tag opener. The buffer
    /// always starts with `[` and is bounded by the longest opener.
    SeenBracket(String),
    /// Inside tag content, after the opener's colon.
    InsideTag {
        kind: TagKind,
        /// Everything consumed since `[`, kept verbatim so a
        /// truncated tag can be flushed without data loss.
        raw: String,
        /// Unescaped content accumulated so far.
        inner: String,
    },
}

/// Chunk-boundary-safe scanner for memory/pattern tags.
///
/// Feed fragments with [`push`](TagScanner::push); call
/// [`finish`](TagScanner::finish) exactly once at end of stream to
/// flush any buffered partial tag as plain text.
pub struct TagScanner {
    state: State,
    /// Cumulative length of clean text emitted, in bytes. Tag offsets
    /// are relative to this clean text.
    clean_len: usize,
}

impl Default for TagScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl TagScanner {
    pub fn new() -> Self {
        Self {
            state: State::Outside,
            clean_len: 0,
        }
    }

    /// Scan one incoming fragment.
    ///
    /// Returns the fragment's clean text (tag delimiters removed) and
    /// flags indicating whether a tag span is open or was completed
    /// within this fragment. Tag content is withheld from the clean
    /// output until its closing `]` arrives, so a truncated tag never
    /// leaks half-processed text.
    pub fn push(&mut self, fragment: &str) -> ScannedFragment {
        let mut out = ScannedFragment::default();
        for ch in fragment.chars() {
            self.push_char(ch, &mut out);
        }
        if matches!(self.state, State::InsideTag { .. }) {
            self.mark_open(&mut out);
        }
        out
    }

    /// Flush end-of-stream state.
    ///
    /// A stream that ends while still buffering an opener or inside
    /// an unterminated tag fails safe: the raw buffered text is
    /// returned as plain text, and no completed tag is reported.
    pub fn finish(&mut self) -> ScannedFragment {
        let mut out = ScannedFragment::default();
        match std::mem::replace(&mut self.state, State::Outside) {
            State::Outside => {}
            State::SeenBracket(buf) => self.emit_clean(&buf, &mut out),
            State::InsideTag { raw, .. } => self.emit_clean(&raw, &mut out),
        }
        out
    }

    fn push_char(&mut self, ch: char, out: &mut ScannedFragment) {
        match &mut self.state {
            State::Outside => {
                if ch == '[' {
                    self.state = State::SeenBracket(String::from('['));
                } else {
                    let mut buf = [0u8; 4];
                    self.emit_clean(ch.encode_utf8(&mut buf), out);
                }
            }
            State::SeenBracket(buf) => {
                buf.push(ch);
                if let Some(kind) = opener_match(buf) {
                    let raw = std::mem::take(buf);
                    self.state = State::InsideTag {
                        kind,
                        raw,
                        inner: String::new(),
                    };
                } else if !opener_viable(buf) {
                    // Not a tag after all. Emit the leading bracket as
                    // prose and re-scan the rest, since a real opener
                    // may start later in the buffer (e.g. "[[MEMORY:").
                    let buf = std::mem::take(buf);
                    self.state = State::Outside;
                    self.emit_clean("[", out);
                    for c in buf.chars().skip(1) {
                        self.push_char(c, out);
                    }
                }
            }
            State::InsideTag { kind, raw, inner } => {
                raw.push(ch);
                if ch == ']' {
                    if inner.ends_with('\\') {
                        // Escaped closer: literal "]" in content.
                        inner.pop();
                        inner.push(']');
                    } else {
                        let kind = *kind;
                        let content = inner.trim().to_string();
                        self.state = State::Outside;
                        self.complete_tag(kind, content, out);
                    }
                } else if inner.is_empty() && ch == ' ' {
                    // Conventional single space after the colon is
                    // part of the delimiter, not the content.
                } else {
                    inner.push(ch);
                }
            }
        }
    }

    /// Emit a completed tag: its content joins the clean text and the
    /// span is recorded with offsets into that clean text.
    fn complete_tag(&mut self, kind: TagKind, content: String, out: &mut ScannedFragment) {
        let start_offset = self.clean_len;
        self.emit_clean(&content, out);
        match kind {
            TagKind::Memory => out.memory_moment = true,
            TagKind::Pattern => out.pattern_insight = true,
        }
        out.completed_tags.push(SemanticTag {
            kind,
            end_offset: start_offset + content.len(),
            start_offset,
            content,
        });
    }

    fn emit_clean(&mut self, text: &str, out: &mut ScannedFragment) {
        out.clean_text.push_str(text);
        self.clean_len += text.len();
    }

    fn mark_open(&self, out: &mut ScannedFragment) {
        if let State::InsideTag { kind, .. } = &self.state {
            match kind {
                TagKind::Memory => out.memory_moment = true,
                TagKind::Pattern => out.pattern_insight = true,
            }
        }
    }
}

/// Exact match of a complete opener.
fn opener_match(buf: &str) -> Option<TagKind> {
    if buf == TagKind::Memory.opener() {
        Some(TagKind::Memory)
    } else if buf == TagKind::Pattern.opener() {
        Some(TagKind::Pattern)
    } else {
        None
    }
}

/// Whether the buffer is still a prefix of either opener.
fn opener_viable(buf: &str) -> bool {
    TagKind::Memory.opener().starts_with(buf) || TagKind::Pattern.opener().starts_with(buf)
}

/// Scan a complete message in one shot.
///
/// Built on the same state machine as the incremental scanner, so
/// live and replay parsing cannot disagree.
pub fn scan_all(text: &str) -> ScanOutcome {
    let mut scanner = TagScanner::new();
    let mut merged = scanner.push(text);
    let tail = scanner.finish();
    merged.clean_text.push_str(&tail.clean_text);

    let has_memory = merged.completed_tags.iter().any(|t| t.kind == TagKind::Memory);
    let has_pattern = merged
        .completed_tags
        .iter()
        .any(|t| t.kind == TagKind::Pattern);

    ScanOutcome {
        clean_text: merged.clean_text,
        tags: merged.completed_tags,
        has_memory,
        has_pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_fragments(fragments: &[&str]) -> (String, Vec<SemanticTag>) {
        let mut scanner = TagScanner::new();
        let mut clean = String::new();
        let mut tags = Vec::new();
        for fragment in fragments {
            let out = scanner.push(fragment);
            clean.push_str(&out.clean_text);
            tags.extend(out.completed_tags);
        }
        let tail = scanner.finish();
        clean.push_str(&tail.clean_text);
        tags.extend(tail.completed_tags);
        (clean, tags)
    }

    #[test]
    fn plain_text_passes_through() {
        let (clean, tags) = scan_fragments(&["hello ", "world"]);
        assert_eq!(clean, "hello world");
        assert!(tags.is_empty());
    }

    #[test]
    fn memory_tag_in_one_fragment() {
        let (clean, tags) =
            scan_fragments(&["I recall [MEMORY: you value autonomy] strongly."]);
        assert_eq!(clean, "I recall you value autonomy strongly.");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].kind, TagKind::Memory);
        assert_eq!(tags[0].content, "you value autonomy");
    }

    #[test]
    fn tag_offsets_index_into_clean_text() {
        let outcome = scan_all("ab [PATTERN: x recurs] cd");
        let tag = &outcome.tags[0];
        assert_eq!(&outcome.clean_text[tag.start_offset..tag.end_offset], "x recurs");
    }

    #[test]
    fn opener_split_inside_keyword() {
        let (clean, tags) = scan_fragments(&["see [MEM", "ORY: split", " opener] here"]);
        assert_eq!(clean, "see split opener here");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].content, "split opener");
    }

    #[test]
    fn split_at_every_boundary_matches_one_shot() {
        let text = "Warm up. [MEMORY: values courage] Then [PATTERN: avoids conflict] and [done] end.";
        let expected = scan_all(text);
        for split in 0..=text.len() {
            if !text.is_char_boundary(split) {
                continue;
            }
            let (clean, tags) = scan_fragments(&[&text[..split], &text[split..]]);
            assert_eq!(clean, expected.clean_text, "split at {split}");
            assert_eq!(tags, expected.tags, "split at {split}");
        }
    }

    #[test]
    fn unknown_bracketed_text_is_untouched() {
        let outcome = scan_all("see [reference 3] and [TODO: later] here");
        assert_eq!(outcome.clean_text, "see [reference 3] and [TODO: later] here");
        assert!(outcome.tags.is_empty());
        assert!(!outcome.has_memory);
    }

    #[test]
    fn double_bracket_before_real_opener() {
        let outcome = scan_all("x [[MEMORY: nested] y");
        assert_eq!(outcome.clean_text, "x [nested y");
        assert_eq!(outcome.tags.len(), 1);
        assert_eq!(outcome.tags[0].content, "nested");
    }

    #[test]
    fn unterminated_tag_flushes_raw_text() {
        let (clean, tags) = scan_fragments(&["so ", "[MEMORY: cut off"]);
        assert_eq!(clean, "so [MEMORY: cut off");
        assert!(tags.is_empty());
    }

    #[test]
    fn unterminated_opener_flushes_raw_text() {
        let (clean, tags) = scan_fragments(&["tail [PAT"]);
        assert_eq!(clean, "tail [PAT");
        assert!(tags.is_empty());
    }

    #[test]
    fn escaped_closer_stays_in_content() {
        let outcome = scan_all(r"[MEMORY: likes \] brackets] done");
        assert_eq!(outcome.tags[0].content, "likes ] brackets");
        assert_eq!(outcome.clean_text, "likes ] brackets done");
    }

    #[test]
    fn open_tag_sets_flag_without_leaking_content() {
        let mut scanner = TagScanner::new();
        let first = scanner.push("pre [PATTERN: half");
        assert_eq!(first.clean_text, "pre ");
        assert!(first.pattern_insight);
        assert!(first.completed_tags.is_empty());

        let second = scanner.push(" done] post");
        assert_eq!(second.clean_text, "half done post");
        assert!(second.pattern_insight);
        assert_eq!(second.completed_tags.len(), 1);
    }

    #[test]
    fn both_kinds_reported_in_scan_all() {
        let outcome = scan_all("[MEMORY: a] mid [PATTERN: b]");
        assert!(outcome.has_memory);
        assert!(outcome.has_pattern);
        assert_eq!(outcome.clean_text, "a mid b");
    }

    #[test]
    fn lowercase_keyword_is_not_a_tag() {
        let outcome = scan_all("[memory: casual aside]");
        assert_eq!(outcome.clean_text, "[memory: casual aside]");
        assert!(outcome.tags.is_empty());
    }

    #[test]
    fn multibyte_text_around_tags() {
        let text = "naïve — [MEMORY: héroïsme] ✓";
        let expected = scan_all(text);
        assert_eq!(expected.clean_text, "naïve — héroïsme ✓");
        for split in 0..=text.len() {
            if !text.is_char_boundary(split) {
                continue;
            }
            let (clean, tags) = scan_fragments(&[&text[..split], &text[split..]]);
            assert_eq!(clean, expected.clean_text);
            assert_eq!(tags, expected.tags);
        }
    }
}
