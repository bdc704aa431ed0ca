use std::collections::VecDeque;

use serde::Serialize;

use super::snapshot::Snapshot;

/// Maximum number of snapshots retained, the seed included.
pub const MAX_DEPTH: usize = 20;

/// Bounded undo/redo timeline with a cursor.
///
/// `entries[..=cursor]` is the realized path, `entries[cursor + 1..]` the
/// redo-able branch that the next [`push`](HistoryStack::push) discards.
/// The cursor is `None` only while the stack is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStack {
    entries: VecDeque<Snapshot>,
    cursor: Option<usize>,
    max_depth: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::with_max_depth(MAX_DEPTH)
    }

    /// A depth of zero is treated as one; the current entry always survives.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_depth.max(1)),
            cursor: None,
            max_depth: max_depth.max(1),
        }
    }

    /// Append a snapshot after the cursor.
    ///
    /// Drops the forward branch first, even when `snapshot` matches an entry
    /// in it. Returns the entry evicted from the front when the stack was
    /// already at capacity.
    pub fn push(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        self.entries.push_back(snapshot);

        let evicted = if self.entries.len() > self.max_depth {
            self.entries.pop_front()
        } else {
            None
        };
        self.cursor = Some(self.entries.len() - 1);
        evicted
    }

    /// Step back one entry and return it, or `None` at the start.
    pub fn undo(&mut self) -> Option<Snapshot> {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                self.entries.get(c - 1).copied()
            }
            _ => None,
        }
    }

    /// Step forward one entry and return it, or `None` at the tip.
    pub fn redo(&mut self) -> Option<Snapshot> {
        match self.cursor {
            Some(c) if c + 1 < self.entries.len() => {
                self.cursor = Some(c + 1);
                self.entries.get(c + 1).copied()
            }
            _ => None,
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.entries.len())
    }

    /// Replace everything with a single seed entry.
    pub fn reset(&mut self, initial: Snapshot) {
        self.entries.clear();
        self.entries.push_back(initial);
        self.cursor = Some(0);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            entries: self.entries.iter().copied().collect(),
            cursor: self.cursor,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }
}

/// Serializable view of the timeline for the frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub entries: Vec<Snapshot>,
    pub cursor: Option<usize>,
    pub can_undo: bool,
    pub can_redo: bool,
}
