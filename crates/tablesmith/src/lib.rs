//! Reconcile SQLite tables with JSON definitions.
//!
//! `tablesmith` puts the `tablesmith-core` engine in front of a real
//! database:
//!
//! - **Session** - A blocking SQLite connection over `sqlx`
//! - **Introspection** - Reads tables back from the SQLite catalog
//! - **Definitions** - Editable JSON descriptions of tables
//!
//! # Example
//!
//! ```rust,no_run
//! use tablesmith::prelude::*;
//!
//! # fn main() -> tablesmith::Result<()> {
//! let mut session = SqliteSession::connect("sqlite:app.db")?;
//! let definition = TableDefinition::load("users.json".as_ref())?;
//!
//! let context = Dialect::Sqlite.context();
//! let baseline = load_table(&mut session, definition.existing_name())?;
//! let table = definition.resolve(context.as_ref(), baseline.as_ref())?;
//!
//! let mut editor = match baseline {
//!     Some(baseline) => TableEditor::open(context, baseline),
//!     None => TableEditor::create(context, &table.name),
//! };
//! editor.set_current(table);
//! editor.save(&mut session, &TracingLog)?;
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the statements that would turn one definition into another
//! tablesmith plan --original users.json --current users_v2.json
//!
//! # Create or alter a table to match a definition
//! tablesmith apply --current users.json
//!
//! # Dump a table as an editable definition
//! tablesmith inspect users > users.json
//! ```

pub mod definition;
pub mod error;
pub mod introspect;
pub mod session;

pub use error::{Error, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::definition::{
        CheckDefinition, ColumnDefinition, ForeignKeyDefinition, GeneratedDefinition,
        IndexDefinition, TableDefinition,
    };
    pub use crate::error::{Error, Result};
    pub use crate::session::SqliteSession;
    pub use tablesmith_core::prelude::{
        Dialect, DialectContext, MemoryLog, Plan, QueryLog, SchemaSource, Session, Strategy,
        Table, TableEditor, TableState, TracingLog, load_table,
    };
}
