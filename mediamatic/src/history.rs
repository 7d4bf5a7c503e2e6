//! Session history of completed analyses

use chrono::{DateTime, Local, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// A completed analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Prompt as submitted (or the template label)
    pub prompt: String,
    /// Extracted response text
    pub response: String,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            timestamp: Utc::now(),
        }
    }

    /// Heading shown above an entry, in local time
    pub fn title(&self) -> String {
        format!(
            "Analysis from {}",
            self.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )
    }
}

/// Append-only ledger of analyses for one session.
///
/// Entries are never edited or removed; readers get copies.
#[derive(Debug, Default)]
pub struct HistoryLedger {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: HistoryEntry) {
        self.entries.write().push(entry);
    }

    /// Up to `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Every entry in chronological order
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
