//! Bounded, newest-first game log.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default maximum number of retained entries.
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Semantic category of an entry. Used by presentation only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    #[default]
    Info,
    Success,
    Warning,
    Danger,
    Story,
    LevelUp,
    System,
}

/// A single timestamped log line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonic sequence number, unique within a game.
    pub seq: u64,
    /// Simulation clock at the time of writing.
    pub timestamp_ms: u64,
    pub kind: LogKind,
    pub text: String,
}

/// Ring buffer of [`LogEntry`] values, newest first. Pushing past the capacity
/// drops the oldest entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameLog {
    capacity: usize,
    next_seq: u64,
    entries: VecDeque<LogEntry>,
}

impl Default for GameLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl GameLog {
    /// Create an empty log. A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            next_seq: 0,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry at the front and return a copy of it.
    pub fn push(&mut self, timestamp_ms: u64, kind: LogKind, text: impl Into<String>) -> LogEntry {
        let entry = LogEntry {
            seq: self.next_seq,
            timestamp_ms,
            kind,
            text: text.into(),
        };
        self.next_seq += 1;
        self.entries.push_front(entry.clone());
        self.entries.truncate(self.capacity);
        entry
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Restore the capacity bound and the sequence counter after deserializing.
    pub fn normalize(&mut self) {
        self.capacity = self.capacity.max(1);
        self.entries.truncate(self.capacity);
        if let Some(max_seq) = self.entries.iter().map(|e| e.seq).max() {
            self.next_seq = self.next_seq.max(max_seq + 1);
        }
    }
}
