//! Computed statement sequences.

use std::fmt;

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::log::{LogEntry, QueryLog};
use crate::session::{Session, in_transaction};

/// How a plan brings the database in line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// `CREATE TABLE` and its indexes.
    Create,
    /// Direct `ALTER TABLE` sub-clauses.
    Incremental,
    /// Copy into a freshly created table.
    Rebuild,
    /// `DROP TABLE`.
    Drop,
}

impl Strategy {
    /// Returns the strategy name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Incremental => "incremental",
            Self::Rebuild => "rebuild",
            Self::Drop => "drop",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The statements of one create, alter or drop.
///
/// `statements` run inside one transaction. `before` runs ahead of it,
/// outside the transaction, for session settings a transaction would
/// ignore; `after` runs once everything else is done, whether it succeeded
/// or not, and restores those settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// How the change is applied.
    pub strategy: Strategy,
    /// Session settings applied first.
    pub before: Vec<String>,
    /// The transactional statements.
    pub statements: Vec<String>,
    /// Session settings restored last.
    pub after: Vec<String>,
}

impl Plan {
    /// Creates an empty plan.
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            before: Vec::new(),
            statements: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Appends a transactional statement.
    pub fn push(&mut self, statement: impl Into<String>) {
        self.statements.push(statement.into());
    }

    /// Returns `true` if there is nothing to execute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Every statement in execution order.
    pub fn all_statements(&self) -> impl Iterator<Item = &str> {
        self.before
            .iter()
            .chain(&self.statements)
            .chain(&self.after)
            .map(String::as_str)
    }

    /// Executes the plan, reporting every statement to `log`.
    ///
    /// An empty plan executes nothing, not even `BEGIN`.
    pub fn execute(&self, session: &mut dyn Session, log: &dyn QueryLog) -> Result<()> {
        if self.is_empty() {
            debug!("Nothing to execute");
            return Ok(());
        }
        let result = run(session, log, &self.before)
            .and_then(|()| in_transaction(&mut *session, |s| run(s, log, &self.statements)));
        let restored = run(session, log, &self.after);
        result.and(restored)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in self.all_statements() {
            writeln!(f, "{statement};")?;
        }
        Ok(())
    }
}

fn run(session: &mut dyn Session, log: &dyn QueryLog, statements: &[String]) -> Result<()> {
    for sql in statements {
        debug!(sql = %sql, "Executing SQL");
        if let Err(err) = session.execute(sql) {
            let message = match &err {
                Error::Execution { message, .. } => message.clone(),
                other => other.to_string(),
            };
            error!(sql = %sql, error = %message, "Statement failed");
            log.record(LogEntry::Error {
                statement: sql.clone(),
                message,
            });
            return Err(err);
        }
        log.record(LogEntry::Statement(sql.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemoryLog;
    use crate::session::{Event, RecordingSession};

    fn plan() -> Plan {
        let mut plan = Plan::new(Strategy::Rebuild);
        plan.before.push("PRAGMA foreign_keys = OFF".into());
        plan.push("ALTER TABLE t RENAME TO _old_t");
        plan.push("CREATE TABLE t (a INTEGER)");
        plan.after.push("PRAGMA foreign_keys = ON".into());
        plan
    }

    #[test]
    fn runs_in_order_inside_one_transaction() {
        let mut session = RecordingSession::new();
        let log = MemoryLog::new();
        plan().execute(&mut session, &log).unwrap();
        assert_eq!(
            session.events(),
            &[
                Event::Execute("PRAGMA foreign_keys = OFF".into()),
                Event::Begin,
                Event::Execute("ALTER TABLE t RENAME TO _old_t".into()),
                Event::Execute("CREATE TABLE t (a INTEGER)".into()),
                Event::Commit,
                Event::Execute("PRAGMA foreign_keys = ON".into()),
            ]
        );
        assert_eq!(log.statements().len(), 4);
    }

    #[test]
    fn restores_settings_after_failure() {
        let mut session = RecordingSession::new().fail_when("CREATE");
        let log = MemoryLog::new();
        let err = plan().execute(&mut session, &log).unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
        assert_eq!(
            session.committed(),
            &[
                "PRAGMA foreign_keys = OFF".to_string(),
                "PRAGMA foreign_keys = ON".to_string(),
            ]
        );
        assert!(log.entries().iter().any(|e| matches!(
            e,
            LogEntry::Error { statement, .. } if statement.starts_with("CREATE")
        )));
    }

    #[test]
    fn empty_plan_touches_nothing() {
        let mut session = RecordingSession::new();
        let mut empty = Plan::new(Strategy::Incremental);
        empty.before.push("PRAGMA foreign_keys = OFF".into());
        empty.execute(&mut session, &MemoryLog::new()).unwrap();
        assert!(session.events().is_empty());
    }

    #[test]
    fn display_terminates_statements() {
        let text = plan().to_string();
        assert!(text.starts_with("PRAGMA foreign_keys = OFF;\n"));
        assert!(text.ends_with("PRAGMA foreign_keys = ON;\n"));
    }
}
