//! Table lifecycle.
//!
//! A [`TableEditor`] holds the baseline read from the database next to the
//! definition being edited and knows which of the two DDL operations brings
//! the database in line with it.

use std::fmt;

use tracing::debug;

use crate::catalog::Datatype;
use crate::dialect::{DialectContext, Plan};
use crate::error::{Error, Result};
use crate::log::QueryLog;
use crate::schema::{Check, Column, ForeignKey, Index, Table};
use crate::session::Session;

/// Where a table is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// Not created yet.
    NoTable,
    /// Exists in the database.
    Created,
    /// Dropped; nothing more can be done with it.
    Dropped,
}

impl TableState {
    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoTable => "no-table",
            Self::Created => "created",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edits one table against a dialect.
///
/// After a successful [`save`](Self::save) the baseline no longer matches
/// the database; the next save is refused with [`Error::StaleBaseline`]
/// until [`refresh`](Self::refresh) installs the definition read back from
/// the database.
pub struct TableEditor {
    context: Box<dyn DialectContext>,
    state: TableState,
    original: Option<Table>,
    current: Table,
    stale: bool,
}

impl TableEditor {
    /// Starts editing a table that does not exist yet.
    #[must_use]
    pub fn create(context: Box<dyn DialectContext>, name: impl Into<String>) -> Self {
        Self {
            context,
            state: TableState::NoTable,
            original: None,
            current: Table::pending(name),
            stale: false,
        }
    }

    /// Starts editing `table` as read from the database.
    #[must_use]
    pub fn open(context: Box<dyn DialectContext>, table: Table) -> Self {
        Self {
            context,
            state: TableState::Created,
            current: table.clone(),
            original: Some(table),
            stale: false,
        }
    }

    /// The dialect in use.
    #[must_use]
    pub fn context(&self) -> &dyn DialectContext {
        self.context.as_ref()
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TableState {
        self.state
    }

    /// The definition as last read from the database.
    #[must_use]
    pub const fn original(&self) -> Option<&Table> {
        self.original.as_ref()
    }

    /// The definition being edited.
    #[must_use]
    pub const fn current(&self) -> &Table {
        &self.current
    }

    /// Mutable access to the definition being edited.
    pub fn current_mut(&mut self) -> &mut Table {
        &mut self.current
    }

    /// Replaces the definition being edited.
    pub fn set_current(&mut self, table: Table) {
        self.current = table;
    }

    /// Looks a datatype up in the dialect's catalog.
    pub fn datatype(&self, name: &str) -> Result<Datatype> {
        self.context.datatypes().get_by_name(name)
    }

    /// An empty column with a fresh pending id.
    pub fn new_column(&self, name: impl Into<String>, datatype: &str) -> Result<Column> {
        Ok(Column::new(
            self.current.next_column_id(),
            name,
            self.datatype(datatype)?,
        ))
    }

    /// An empty index with a fresh pending id.
    pub fn new_index(&self, name: impl Into<String>, index_type: &str) -> Result<Index> {
        let index_type = self.context.index_types().get_by_name(index_type)?;
        Ok(Index::new(
            self.current.next_index_id(),
            name,
            index_type,
            Vec::<String>::new(),
        ))
    }

    /// A single-column foreign key with a fresh pending id.
    #[must_use]
    pub fn new_foreign_key(
        &self,
        name: impl Into<String>,
        column: impl Into<String>,
        reference_table: impl Into<String>,
        reference_column: impl Into<String>,
    ) -> ForeignKey {
        ForeignKey::new(
            self.current.next_foreign_key_id(),
            name,
            column,
            reference_table,
            reference_column,
        )
    }

    /// A check with a fresh pending id.
    #[must_use]
    pub fn new_check(&self, name: Option<&str>, expression: impl Into<String>) -> Check {
        let id = self.current.next_check_id();
        match name {
            Some(name) => Check::named(id, name, expression),
            None => Check::anonymous(id, expression),
        }
    }

    /// The plan [`save`](Self::save) would execute.
    pub fn plan(&self, taken: &[String]) -> Result<Plan> {
        match (self.state, &self.original) {
            (TableState::NoTable, _) => self.context.plan_create(&self.current),
            (TableState::Created, _) if self.stale => Err(Error::StaleBaseline),
            (TableState::Created, Some(original)) => {
                self.context.plan_alter(original, &self.current, taken)
            }
            (state, _) => Err(Error::InvalidState {
                state: state.as_str(),
                operation: "save",
            }),
        }
    }

    /// Creates or alters the table.
    pub fn save(&mut self, session: &mut dyn Session, log: &dyn QueryLog) -> Result<()> {
        match (self.state, &self.original) {
            (TableState::NoTable, _) => {
                self.context.create(session, log, &self.current)?;
                self.state = TableState::Created;
            }
            (TableState::Created, _) if self.stale => return Err(Error::StaleBaseline),
            (TableState::Created, Some(original)) => {
                self.context.alter(session, log, original, &self.current)?;
            }
            (state, _) => {
                return Err(Error::InvalidState {
                    state: state.as_str(),
                    operation: "save",
                })
            }
        }
        self.stale = true;
        debug!(table = %self.current.name, "Baseline is now stale");
        Ok(())
    }

    /// Drops the table.
    pub fn drop(&mut self, session: &mut dyn Session, log: &dyn QueryLog) -> Result<()> {
        if self.state != TableState::Created {
            return Err(Error::InvalidState {
                state: self.state.as_str(),
                operation: "drop",
            });
        }
        let table = self.original.as_ref().unwrap_or(&self.current);
        self.context.drop_table(session, log, table)?;
        self.state = TableState::Dropped;
        Ok(())
    }

    /// Installs `table`, read back from the database, as the new baseline
    /// and the new definition being edited.
    pub fn refresh(&mut self, table: Table) {
        self.current = table.clone();
        self.original = Some(table);
        self.state = TableState::Created;
        self.stale = false;
    }
}

impl fmt::Debug for TableEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableEditor")
            .field("dialect", &self.context.dialect())
            .field("state", &self.state)
            .field("table", &self.current.name)
            .field("stale", &self.stale)
            .finish()
    }
}
