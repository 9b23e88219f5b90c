//! Error types for the SQLite front end.

use std::path::PathBuf;

/// Errors raised while connecting, introspecting or loading definitions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine refused or failed an operation.
    #[error(transparent)]
    Core(#[from] tablesmith_core::Error),

    /// The driver failed outside of a planned statement.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading definition files, starting the runtime).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A definition file is not valid JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A definition names something the dialect does not know.
    #[error("Invalid definition '{path}': {message}")]
    Definition {
        /// Path to the definition file.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// The table does not exist.
    #[error("Table not found: {0}")]
    TableNotFound(String),
}

/// Result type for front-end operations.
pub type Result<T> = std::result::Result<T, Error>;
