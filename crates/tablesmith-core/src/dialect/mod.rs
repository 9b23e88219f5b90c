//! Database dialect contexts.
//!
//! A context owns a dialect's catalogs and its policy for turning a table
//! definition, or the difference between two of them, into statements.
//! Planning is pure; [`DialectContext::create`], [`DialectContext::alter`]
//! and [`DialectContext::drop_table`] plan and then execute the plan inside one
//! transaction.

mod changes;
mod mariadb;
mod plan;
mod postgres;
mod sqlite;

pub use changes::TableChanges;
pub use mariadb::MariaDbContext;
pub use plan::{Plan, Strategy};
pub use postgres::PostgresContext;
pub use sqlite::SqliteContext;

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::builder::DdlBuilder;
use crate::catalog::{Catalog, Datatype, DatatypeCategory, IndexType, Value};
use crate::error::{Error, Result};
use crate::log::QueryLog;
use crate::schema::{Column, Table};
use crate::session::Session;

/// The supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// SQLite 3.35 or later.
    #[default]
    Sqlite,
    /// MariaDB and MySQL.
    MariaDb,
    /// PostgreSQL 12 or later.
    PostgreSql,
}

impl Dialect {
    /// Every dialect.
    pub const ALL: [Self; 3] = [Self::Sqlite, Self::MariaDb, Self::PostgreSql];

    /// Returns the dialect name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MariaDb => "mariadb",
            Self::PostgreSql => "postgresql",
        }
    }

    /// Creates the dialect's context, building its catalogs.
    #[must_use]
    pub fn context(self) -> Box<dyn DialectContext> {
        match self {
            Self::Sqlite => Box::new(SqliteContext::new()),
            Self::MariaDb => Box::new(MariaDbContext::new()),
            Self::PostgreSql => Box::new(PostgresContext::new()),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "mariadb" | "mysql" => Ok(Self::MariaDb),
            "postgresql" | "postgres" | "pg" => Ok(Self::PostgreSql),
            _ => Err(Error::NotFound {
                kind: "dialect",
                name: s.to_string(),
            }),
        }
    }
}

/// What a dialect can express with `ALTER TABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// `RENAME COLUMN` or an equivalent.
    pub rename_column: bool,
    /// `DROP COLUMN`.
    pub drop_column: bool,
    /// Changing a column's type or attributes in place.
    pub alter_column: bool,
    /// Adding constraints to an existing table.
    pub add_constraint: bool,
    /// Placing a column with `FIRST` / `AFTER`.
    pub column_position: bool,
    /// Index definitions inside `CREATE TABLE`.
    pub inline_indexes: bool,
    /// DDL can be rolled back.
    pub transactional_ddl: bool,
}

/// A dialect: catalogs, fragment rendering and statement planning.
pub trait DialectContext: DdlBuilder + Send + Sync {
    /// Which dialect this is.
    fn dialect(&self) -> Dialect;

    /// What the dialect can alter in place.
    fn capabilities(&self) -> Capabilities;

    /// Registered datatypes.
    fn datatypes(&self) -> &Catalog<Datatype>;

    /// Registered index types.
    fn index_types(&self) -> &Catalog<IndexType>;

    /// Renders the statements that create `table`.
    fn emit_create(&self, table: &Table) -> Result<Plan>;

    /// Renders the statements that turn `original` into `current`.
    ///
    /// `taken` lists table names already in use. Only called when there is
    /// something to change.
    fn emit_alter(&self, changes: &TableChanges<'_>, taken: &[String]) -> Result<Plan>;

    /// Plans the creation of `table`.
    fn plan_create(&self, table: &Table) -> Result<Plan> {
        table.ensure_valid()?;
        self.emit_create(table)
    }

    /// Plans the alteration of `original` into `current`. Identical tables
    /// give an empty plan.
    fn plan_alter(&self, original: &Table, current: &Table, taken: &[String]) -> Result<Plan> {
        current.ensure_valid()?;
        let changes = TableChanges::new(original, current);
        if changes.is_empty() {
            return Ok(Plan::new(Strategy::Incremental));
        }
        self.emit_alter(&changes, taken)
    }

    /// Plans dropping `table`.
    fn plan_drop(&self, table: &Table) -> Result<Plan> {
        let mut plan = Plan::new(Strategy::Drop);
        plan.push(format!("DROP TABLE {}", self.quote_identifier(&table.name)));
        Ok(plan)
    }

    /// Creates `table`.
    fn create(&self, session: &mut dyn Session, log: &dyn QueryLog, table: &Table) -> Result<()> {
        let plan = self.plan_create(table)?;
        self.execute(session, log, &plan)?;
        info!(table = %table.name, dialect = %self.dialect(), "Created table");
        Ok(())
    }

    /// Alters `original` into `current`. Either every statement commits or
    /// none does.
    fn alter(
        &self,
        session: &mut dyn Session,
        log: &dyn QueryLog,
        original: &Table,
        current: &Table,
    ) -> Result<()> {
        let taken = session.table_names()?;
        let plan = self.plan_alter(original, current, &taken)?;
        if plan.is_empty() {
            info!(table = %current.name, "No changes");
            return Ok(());
        }
        info!(
            table = %current.name,
            strategy = %plan.strategy,
            statements = plan.statements.len(),
            "Altering table"
        );
        self.execute(session, log, &plan)?;
        info!(table = %current.name, "Altered table");
        Ok(())
    }

    /// Drops `table`.
    fn drop_table(&self, session: &mut dyn Session, log: &dyn QueryLog, table: &Table) -> Result<()> {
        let plan = self.plan_drop(table)?;
        self.execute(session, log, &plan)?;
        info!(table = %table.name, "Dropped table");
        Ok(())
    }

    /// Executes a plan.
    fn execute(&self, session: &mut dyn Session, log: &dyn QueryLog, plan: &Plan) -> Result<()> {
        if !self.capabilities().transactional_ddl && plan.statements.len() > 1 {
            warn!(
                dialect = %self.dialect(),
                "DDL commits implicitly; a failure leaves earlier statements applied"
            );
        }
        plan.execute(session, log)
    }

    /// Builds a `WHERE` condition identifying one row by its primary key,
    /// else by the first unique index.
    ///
    /// `row` maps column names to values. Fails with a validation error
    /// when the table has no such key or the row lacks a key column.
    fn row_condition(&self, table: &Table, row: &[(String, Value)]) -> Result<String> {
        let entity = format!("table \"{}\"", table.name);
        let key = table
            .primary_key()
            .or_else(|| {
                table.indexes.iter().find(|i| {
                    i.index_type.is_unique && i.condition.is_none() && i.expression.is_empty()
                })
            })
            .ok_or_else(|| {
                Error::invalid(&entity, "has no primary or unique index to identify a row")
            })?;

        let mut terms = Vec::with_capacity(key.columns.len());
        for name in &key.columns {
            let column = table.column_by_name(name).ok_or_else(|| Error::NotFound {
                kind: "column",
                name: name.clone(),
            })?;
            let value = row
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
                .ok_or_else(|| Error::invalid(&entity, format!("row has no value for \"{name}\"")))?;
            let lhs = self.quote_identifier(name);
            terms.push(match value {
                Value::Null => format!("{lhs} IS NULL"),
                v => format!("{lhs} = {}", column.datatype.format(v)),
            });
        }
        Ok(terms.join(" AND "))
    }
}

/// Renders `CREATE TABLE name (\n  def,\n  def\n)` followed by `options`.
pub(crate) fn create_table_statement<B: DdlBuilder + ?Sized>(
    builder: &B,
    table: &Table,
    definitions: &[String],
    options: &str,
) -> String {
    let mut sql = format!("CREATE TABLE {} (\n  ", builder.quote_identifier(&table.name));
    sql.push_str(&definitions.join(",\n  "));
    sql.push_str("\n)");
    if !options.is_empty() {
        sql.push(' ');
        sql.push_str(options);
    }
    sql
}

/// Value for a column that did not exist before a rebuild: its default,
/// else NULL, else an empty value of its type.
pub(crate) fn fill_value(column: &Column) -> String {
    if let Some(default) = &column.server_default {
        return default.clone();
    }
    if column.is_nullable {
        return "NULL".to_string();
    }
    match column.datatype.category {
        DatatypeCategory::Integer | DatatypeCategory::Real => "0".to_string(),
        _ => "''".to_string(),
    }
}

/// `_old_{name}`, numbered when that is taken.
pub(crate) fn temporary_name(name: &str, taken: &[String]) -> String {
    let is_taken = |candidate: &str| taken.iter().any(|t| t.eq_ignore_ascii_case(candidate));
    let base = format!("_old_{name}");
    if !is_taken(&base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}_{n}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
