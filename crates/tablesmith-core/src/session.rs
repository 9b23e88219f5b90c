//! The database boundary.
//!
//! The engine never talks to a driver directly. It needs a [`Session`] that
//! can execute one statement and open, commit or roll back a transaction,
//! and, to populate tables, a [`SchemaSource`] that answers catalog
//! queries. Both are implemented by the driver crate; [`RecordingSession`]
//! is an in-memory stand-in for tests and dry runs.

use tracing::warn;

use crate::error::{Error, Result};
use crate::schema::{Check, Column, ForeignKey, Index, Table};

/// A connection that executes DDL.
///
/// Calls block until the database answers. A failing statement is reported
/// as [`Error::Execution`] carrying the statement and the driver's message.
pub trait Session {
    /// Executes one statement, ignoring any rows it returns.
    fn execute(&mut self, statement: &str) -> Result<()>;

    /// Opens a transaction.
    fn begin(&mut self) -> Result<()>;

    /// Commits the open transaction.
    fn commit(&mut self) -> Result<()>;

    /// Rolls the open transaction back.
    fn rollback(&mut self) -> Result<()>;

    /// Names of the tables that exist, used to pick collision-free
    /// temporary names.
    fn table_names(&mut self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Runs `f` inside a transaction.
///
/// Commits when `f` succeeds and rolls back when it fails. The error of `f`
/// wins over a failing rollback, which is only logged.
pub fn in_transaction<S, T, F>(session: &mut S, f: F) -> Result<T>
where
    S: Session + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    session.begin()?;
    match f(session) {
        Ok(value) => {
            session.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = session.rollback() {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Answers catalog queries for one database.
pub trait SchemaSource {
    /// Reads a table's own properties, without its collections.
    /// Returns `None` if the table does not exist.
    fn get_table(&mut self, name: &str) -> Result<Option<Table>>;

    /// Reads the columns of `table`, in table order.
    fn get_columns(&mut self, table: &Table) -> Result<Vec<Column>>;

    /// Reads the indexes of `table`, the primary key included.
    fn get_indexes(&mut self, table: &Table) -> Result<Vec<Index>>;

    /// Reads the foreign keys of `table`.
    fn get_foreign_keys(&mut self, table: &Table) -> Result<Vec<ForeignKey>>;

    /// Reads the table-level checks of `table`.
    fn get_checks(&mut self, table: &Table) -> Result<Vec<Check>>;
}

/// Reads a table and all four of its collections.
pub fn load_table<S: SchemaSource + ?Sized>(source: &mut S, name: &str) -> Result<Option<Table>> {
    let Some(mut table) = source.get_table(name)? else {
        return Ok(None);
    };
    let columns = source.get_columns(&table)?;
    table.set_columns(columns);
    table.indexes = source.get_indexes(&table)?;
    table.foreign_keys = source.get_foreign_keys(&table)?;
    table.checks = source.get_checks(&table)?;
    Ok(Some(table))
}

/// What a [`RecordingSession`] saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `BEGIN`.
    Begin,
    /// A statement that was accepted.
    Execute(String),
    /// A statement that was refused.
    Failed(String),
    /// `COMMIT`.
    Commit,
    /// `ROLLBACK`.
    Rollback,
}

/// An in-memory session that records what it is asked to do.
///
/// It can be told to refuse the n-th statement or any statement containing
/// a given text, and keeps track of which statements would have been made
/// durable: statements outside a transaction immediately, statements inside
/// one only when it commits.
#[derive(Debug, Default)]
pub struct RecordingSession {
    events: Vec<Event>,
    committed: Vec<String>,
    pending: Vec<String>,
    in_transaction: bool,
    executed: usize,
    fail_on: Option<usize>,
    fail_matching: Option<String>,
    tables: Vec<String>,
}

impl RecordingSession {
    /// Creates a session that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses the `n`-th executed statement (1-based).
    #[must_use]
    pub fn fail_on_nth(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Refuses any statement containing `text`.
    #[must_use]
    pub fn fail_when(mut self, text: impl Into<String>) -> Self {
        self.fail_matching = Some(text.into());
        self
    }

    /// Reports `names` from [`Session::table_names`].
    #[must_use]
    pub fn with_tables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = names.into_iter().map(Into::into).collect();
        self
    }

    /// Everything the session saw.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Accepted statements, in order, whether or not they were committed.
    #[must_use]
    pub fn executed(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Execute(sql) => Some(sql.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Statements that would be durable.
    #[must_use]
    pub fn committed(&self) -> &[String] {
        &self.committed
    }

    /// Returns `true` while a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

impl Session for RecordingSession {
    fn execute(&mut self, statement: &str) -> Result<()> {
        self.executed += 1;
        let refused = self.fail_on == Some(self.executed)
            || self
                .fail_matching
                .as_deref()
                .is_some_and(|text| statement.contains(text));
        if refused {
            self.events.push(Event::Failed(statement.to_string()));
            return Err(Error::Execution {
                statement: statement.to_string(),
                message: "refused by recording session".to_string(),
            });
        }
        self.events.push(Event::Execute(statement.to_string()));
        if self.in_transaction {
            self.pending.push(statement.to_string());
        } else {
            self.committed.push(statement.to_string());
        }
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(Error::InvalidState {
                state: "in transaction",
                operation: "begin",
            });
        }
        self.in_transaction = true;
        self.events.push(Event::Begin);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::InvalidState {
                state: "no transaction",
                operation: "commit",
            });
        }
        self.in_transaction = false;
        self.committed.append(&mut self.pending);
        self.events.push(Event::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.in_transaction = false;
        self.pending.clear();
        self.events.push(Event::Rollback);
        Ok(())
    }

    fn table_names(&mut self) -> Result<Vec<String>> {
        Ok(self.tables.clone())
    }
}
