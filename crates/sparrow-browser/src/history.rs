//! Session history.
//!
//! [§ 7.4.2 Session history](https://html.spec.whatwg.org/multipage/document-sequences.html#session-history)
//!
//! A linear list of loaded documents and a cursor. Moving the cursor never
//! touches the network: each entry keeps the parsed snapshot.

use std::sync::Arc;

use sparrow_html::HtmlTree;
use url::Url;

/// One loaded document.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// The document URL after redirects.
    pub url: Url,
    /// The parsed snapshot.
    pub document: Arc<HtmlTree>,
    /// Status of the response the document came from.
    pub status: u16,
}

/// The entries of a session and the position of the current one.
///
/// Invariant: `cursor` indexes `entries` whenever `entries` is non-empty.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    max_entries: Option<usize>,
}

impl History {
    /// An empty history, optionally capped at `max_entries`.
    #[must_use]
    pub const fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_entries,
        }
    }

    /// The entry under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    /// Add `entry` after the cursor and move onto it.
    ///
    /// "Remove all the entries in the session history after the current
    /// entry." When a cap is set the oldest entries are dropped.
    pub fn push(&mut self, entry: HistoryEntry) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(entry);
        if let Some(max) = self.max_entries {
            let excess = self.entries.len().saturating_sub(max.max(1));
            let _ = self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one entry. Returns false at the start of history.
    pub fn back(&mut self) -> bool {
        if self.can_go_back() {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one entry. Returns false at the end of history.
    pub fn forward(&mut self) -> bool {
        if self.can_go_forward() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Returns true if [`History::back`] would move.
    #[must_use]
    pub const fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    /// Returns true if [`History::forward`] would move.
    #[must_use]
    pub const fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Index of the current entry.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true before the first navigation commits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
