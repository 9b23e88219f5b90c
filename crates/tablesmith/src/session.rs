//! A blocking SQLite session over an sqlx connection.
//!
//! The engine is synchronous, so the session owns a single-threaded tokio
//! runtime and blocks on every driver call. It must not be used from inside
//! another tokio runtime.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use tablesmith_core::dialect::SqliteContext;
use tablesmith_core::session::Session;

use crate::error::Result;

/// One connection to a SQLite database.
pub struct SqliteSession {
    pub(crate) runtime: Runtime,
    pub(crate) conn: SqliteConnection,
    pub(crate) context: SqliteContext,
}

impl SqliteSession {
    /// Connects to `url` (e.g. `sqlite:db.sqlite3` or `sqlite::memory:`),
    /// creating the database file if needed.
    pub fn connect(url: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let conn = runtime.block_on(options.connect())?;
        info!(url = %url, "Connected");
        Ok(Self {
            runtime,
            conn,
            context: SqliteContext::new(),
        })
    }

    /// Opens a private in-memory database.
    pub fn memory() -> Result<Self> {
        Self::connect("sqlite::memory:")
    }

    /// Runs a query and returns its rows, for callers that need data rather
    /// than DDL (tests, the CLI).
    pub fn fetch_all<T>(&mut self, sql: &str) -> Result<Vec<T>>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
    {
        let rows = self
            .runtime
            .block_on(sqlx::query_as::<_, T>(sql).fetch_all(&mut self.conn))?;
        Ok(rows)
    }

    /// Closes the connection.
    pub fn close(self) -> Result<()> {
        let Self { runtime, conn, .. } = self;
        runtime.block_on(conn.close())?;
        Ok(())
    }

    fn run(&mut self, sql: &str) -> tablesmith_core::Result<()> {
        self.runtime
            .block_on(sqlx::raw_sql(sql).execute(&mut self.conn))
            .map(|_| ())
            .map_err(|e| tablesmith_core::Error::Execution {
                statement: sql.to_string(),
                message: driver_message(&e),
            })
    }
}

impl Session for SqliteSession {
    fn execute(&mut self, statement: &str) -> tablesmith_core::Result<()> {
        self.run(statement)
    }

    fn begin(&mut self) -> tablesmith_core::Result<()> {
        debug!("BEGIN");
        self.run("BEGIN")
    }

    fn commit(&mut self) -> tablesmith_core::Result<()> {
        debug!("COMMIT");
        self.run("COMMIT")
    }

    fn rollback(&mut self) -> tablesmith_core::Result<()> {
        debug!("ROLLBACK");
        self.run("ROLLBACK")
    }

    fn table_names(&mut self) -> tablesmith_core::Result<Vec<String>> {
        let names: Vec<(String,)> = self
            .runtime
            .block_on(
                sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                    .fetch_all(&mut self.conn),
            )
            .map_err(|e| catalog_error(&e))?;
        Ok(names.into_iter().map(|(n,)| n).collect())
    }
}

/// The database's own message, without sqlx's prefix.
pub(crate) fn driver_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}

/// A failed catalog query as an engine error.
pub(crate) fn catalog_error(err: &sqlx::Error) -> tablesmith_core::Error {
    tablesmith_core::Error::Execution {
        statement: "catalog query".to_string(),
        message: driver_message(err),
    }
}
