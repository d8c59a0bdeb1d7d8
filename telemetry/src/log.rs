//! Bounded diagnostic event log.

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::VecDeque;
use strum::{
    Display,
    EnumIter,
    EnumString,
};

pub const DEFAULT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub emitted_at: DateTime<Utc>,
}

/// Append-only ring buffer of [`LogEntry`] values.
///
/// Every append trims the buffer back to its capacity, dropping the oldest
/// entries first. Entries are never reordered.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_id: u64,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl DiagnosticLog {
    /// A capacity of zero is bumped to one so the latest entry is always kept.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Returns the id assigned to the new entry.
    pub fn append(&mut self, message: impl Into<String>, severity: Severity) -> u64 {
        let message = message.into();
        match severity {
            Severity::Error => error!("{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Info | Severity::Success => info!(%severity, "{message}"),
        }

        let id = self.next_id;
        let entry = LogEntry {
            id,
            message,
            severity,
            emitted_at: Utc::now(),
        };
        self.next_id += 1;

        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        id
    }

    /// Entries in insertion order, optionally restricted to one severity.
    pub fn list(&self, filter: Option<Severity>) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|entry| filter.is_none_or(|severity| entry.severity == severity))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
