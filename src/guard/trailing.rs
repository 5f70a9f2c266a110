// =============================================================================
// Trailing State Store — per-symbol high-water-mark profit tracker
// =============================================================================
//
// The only persistent state in the whole process. One entry per open symbol,
// holding the best return-on-margin percentage the position has reached since
// it was first sighted. Entries ratchet upward, never downward; they leave
// the map only through `evict` (confirmed close), `retain_symbols` (symbol
// vanished from a good snapshot), or `reset_all` (confirmed flat account).
//
// Owned exclusively by the monitor task. No locking, no clock, no I/O.
// =============================================================================

use std::collections::HashMap;

use tracing::debug;

/// Per-symbol high-water-mark store.
#[derive(Debug, Default)]
pub struct TrailingStore {
    peaks: HashMap<String, f64>,
}

impl TrailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a profit observation for `symbol` and return the resulting
    /// high-water mark. First sighting seeds the mark with `profit_pct`;
    /// later sightings only ever raise it.
    pub fn observe(&mut self, symbol: &str, profit_pct: f64) -> f64 {
        let peak = self
            .peaks
            .entry(symbol.to_string())
            .and_modify(|p| {
                if profit_pct > *p {
                    *p = profit_pct;
                }
            })
            .or_insert(profit_pct);
        *peak
    }

    /// Current high-water mark for `symbol`, if tracked.
    pub fn peak(&self, symbol: &str) -> Option<f64> {
        self.peaks.get(symbol).copied()
    }

    /// Drop the entry for `symbol` after a confirmed close.
    pub fn evict(&mut self, symbol: &str) {
        if self.peaks.remove(symbol).is_some() {
            debug!(symbol, "trailing state evicted");
        }
    }

    /// Drop every entry whose symbol is not in `seen`. Covers positions
    /// closed outside the sentinel (manual close, liquidation) while other
    /// positions remain open.
    pub fn retain_symbols(&mut self, seen: &std::collections::HashSet<String>) {
        self.peaks.retain(|symbol, _| seen.contains(symbol));
    }

    /// Clear everything. Called on a confirmed-empty snapshot so marks from
    /// a previous run never leak onto freshly opened positions.
    pub fn reset_all(&mut self) {
        if !self.peaks.is_empty() {
            debug!(count = self.peaks.len(), "trailing state cleared");
            self.peaks.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
