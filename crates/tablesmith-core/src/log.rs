//! Observable query log.
//!
//! Every statement a dialect context executes, and every failure, is
//! reported to a caller-supplied [`QueryLog`]. The log lives as long as the
//! caller wants it to; nothing here is process-global.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info};

/// One entry of the query log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// A statement that was sent to the database.
    Statement(String),
    /// A statement that failed, with the database's error text.
    Error {
        /// The failing statement.
        statement: String,
        /// Error text.
        message: String,
    },
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Statement(sql) => write!(f, "{sql};"),
            Self::Error { statement, message } => write!(f, "-- failed: {statement}\n-- {message}"),
        }
    }
}

/// Receives query log entries.
pub trait QueryLog: Send + Sync {
    /// Records one entry.
    fn record(&self, entry: LogEntry);
}

/// A log that keeps entries in memory.
///
/// Clones share the same buffer, so a clone can be handed to a dialect
/// context while the original is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every entry recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the statements recorded so far, failures excluded.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Statement(sql) => Some(sql),
                LogEntry::Error { .. } => None,
            })
            .collect()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl QueryLog for MemoryLog {
    fn record(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

/// A log that forwards entries to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl QueryLog for TracingLog {
    fn record(&self, entry: LogEntry) {
        match entry {
            LogEntry::Statement(sql) => info!(sql = %sql, "Executed"),
            LogEntry::Error { statement, message } => {
                error!(sql = %statement, error = %message, "Statement failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let log = MemoryLog::new();
        let handle = log.clone();
        handle.record(LogEntry::Statement("DROP TABLE t".into()));
        handle.record(LogEntry::Error {
            statement: "DROP TABLE u".into(),
            message: "no such table: u".into(),
        });
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.statements(), vec!["DROP TABLE t".to_string()]);
        log.clear();
        assert!(handle.entries().is_empty());
    }

    #[test]
    fn display_marks_failures() {
        let entry = LogEntry::Error {
            statement: "X".into(),
            message: "syntax error".into(),
        };
        assert_eq!(entry.to_string(), "-- failed: X\n-- syntax error");
        assert_eq!(LogEntry::Statement("SELECT 1".into()).to_string(), "SELECT 1;");
    }
}
