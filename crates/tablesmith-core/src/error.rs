//! Error types for the reconciliation engine.

use std::fmt;

/// A single reason why an entity failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// The entity the issue was found on (e.g. `column "email"`).
    pub entity: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationIssue {
    /// Creates a new validation issue.
    #[must_use]
    pub fn new(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.message)
    }
}

/// Errors that can occur while planning or applying schema changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A catalog lookup found no matching entry.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// What was looked up (e.g. "datatype").
        kind: &'static str,
        /// The name that was looked up.
        name: String,
    },

    /// One or more entities are invalid; nothing was executed.
    #[error("Validation failed:\n{}", .0.iter().map(|i| format!("  - {i}")).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<ValidationIssue>),

    /// A statement failed; the surrounding transaction was rolled back.
    #[error("Statement failed: {message}\n  statement: {statement}")]
    Execution {
        /// The statement that failed.
        statement: String,
        /// The error text reported by the database.
        message: String,
    },

    /// The dialect cannot express the requested change.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// An operation was attempted in the wrong lifecycle state.
    #[error("Cannot {operation} a table in state {state}")]
    InvalidState {
        /// The current lifecycle state.
        state: &'static str,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// The baseline must be refreshed from the database before another alter.
    #[error("Original table definition is stale; refresh it from the database first")]
    StaleBaseline,
}

impl Error {
    /// Shorthand for a single-issue validation error.
    #[must_use]
    pub fn invalid(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationIssue::new(entity, message)])
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
