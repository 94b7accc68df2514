//! Bounded undo/redo history of filter selections.

use serde::{Deserialize, Serialize};

use crate::filter::FilterSelection;

/// Default number of selections kept in history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// An append-only list of selections plus a cursor.
///
/// Undo and redo only move the cursor. Pushing after an undo discards the
/// entries past the cursor. The list never exceeds its capacity; the oldest
/// entry is dropped first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterHistory {
    entries: Vec<FilterSelection>,
    index: usize,
    capacity: usize,
}

impl FilterHistory {
    /// Starts a history whose only entry is `initial`.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(initial: FilterSelection, capacity: usize) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
            capacity: capacity.max(1),
        }
    }

    /// The selection under the cursor.
    #[must_use]
    pub fn current(&self) -> &FilterSelection {
        &self.entries[self.index]
    }

    /// Records `selection` as the new current entry.
    ///
    /// Returns `false` and leaves the history untouched if it equals the
    /// current entry.
    pub fn push(&mut self, selection: FilterSelection) -> bool {
        if *self.current() == selection {
            return false;
        }

        self.entries.truncate(self.index + 1);
        self.entries.push(selection);

        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }

        self.index = self.entries.len() - 1;
        true
    }

    /// Steps back one entry.
    pub fn undo(&mut self) -> Option<&FilterSelection> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(self.current())
    }

    /// Steps forward one entry.
    pub fn redo(&mut self) -> Option<&FilterSelection> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(self.current())
    }

    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.index > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Clears all entries and starts over from `initial`.
    pub fn reset(&mut self, initial: FilterSelection) {
        self.entries.clear();
        self.entries.push(initial);
        self.index = 0;
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: a history holds at least one entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
