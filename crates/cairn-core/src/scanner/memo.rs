//! Bounded memo for full-text scans.
//!
//! Completed messages are re-scanned every time history is rendered,
//! so [`ScanMemo`] caches `scan_all` results keyed by input text. The
//! memo is capacity-bounded: when full, it is flushed wholesale
//! instead of tracking per-entry recency.

use dashmap::DashMap;

use cairn_types::scan::ScanOutcome;

use super::scan_all;

/// Default number of memoized scans.
const DEFAULT_CAPACITY: usize = 256;

/// Thread-safe, capacity-bounded cache over [`scan_all`].
pub struct ScanMemo {
    entries: DashMap<String, ScanOutcome>,
    capacity: usize,
}

impl Default for ScanMemo {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ScanMemo {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Scan `text`, reusing a prior result when available.
    pub fn scan(&self, text: &str) -> ScanOutcome {
        if let Some(hit) = self.entries.get(text) {
            return hit.clone();
        }

        let outcome = scan_all(text);
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }
        self.entries.insert(text.to_string(), outcome.clone());
        outcome
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
