//! Schema reconciliation and DDL synthesis for SQLite, MariaDB/MySQL and
//! PostgreSQL.
//!
//! `tablesmith-core` compares the definition of a table as it was last read
//! from the database (the *original*) with the definition as edited (the
//! *current*) and synthesizes the statements that turn one into the other:
//!
//! - **Catalogs** - Per-dialect registries of datatypes and index types
//! - **Schema** - Tables and the columns, indexes, foreign keys and checks they own
//! - **Diff** - Pairs original and current entities by identity
//! - **Builder** - Renders column and index definitions from ordered slots
//! - **Dialect** - Chooses between incremental `ALTER TABLE` and a full rebuild
//! - **Session** - The boundary to whatever executes statements
//! - **Editor** - Create / alter / drop lifecycle of one table
//!
//! # Example
//!
//! ```rust
//! use tablesmith_core::prelude::*;
//!
//! let ctx = Dialect::MariaDb.context();
//! let int = ctx.datatypes().get_by_name("INTEGER").unwrap();
//! let varchar = ctx.datatypes().get_by_name("VARCHAR").unwrap();
//!
//! let original = Table::new(EntityId::Persisted(1), "users")
//!     .column(Column::new(EntityId::Persisted(1), "id", int).not_null())
//!     .column(Column::new(EntityId::Persisted(2), "name", varchar).length(50))
//!     .index(Index::new(EntityId::Persisted(1), "PRIMARY", IndexType::primary(), ["id"]));
//!
//! let mut current = original.clone();
//! current.rename_column(EntityId::Persisted(2), "full_name").unwrap();
//!
//! let plan = ctx.plan_alter(&original, &current, &[]).unwrap();
//! assert_eq!(
//!     plan.statements,
//!     vec!["ALTER TABLE users CHANGE name full_name VARCHAR(50)"]
//! );
//! ```

pub mod builder;
pub mod catalog;
pub mod dialect;
pub mod diff;
pub mod editor;
pub mod error;
pub mod id;
pub mod log;
pub mod schema;
pub mod session;

pub use error::{Error, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builder::{ColumnSlot, DdlBuilder, IndexSlot};
    pub use crate::catalog::{
        BooleanStyle, Catalog, CatalogEntry, Datatype, DatatypeCategory, IndexType, Value,
    };
    pub use crate::dialect::{
        Capabilities, Dialect, DialectContext, MariaDbContext, Plan, PostgresContext,
        SqliteContext, Strategy, TableChanges,
    };
    pub use crate::diff::{ChangeKind, Pair, reconcile};
    pub use crate::editor::{TableEditor, TableState};
    pub use crate::error::{Error, Result, ValidationIssue};
    pub use crate::id::{EntityId, IdAllocator, Identified};
    pub use crate::log::{LogEntry, MemoryLog, QueryLog, TracingLog};
    pub use crate::schema::{
        Check, Column, ForeignKey, Index, IndexOrigin, ReferentialAction, Table, Virtuality,
    };
    pub use crate::session::{Event, RecordingSession, SchemaSource, Session, load_table};
}
