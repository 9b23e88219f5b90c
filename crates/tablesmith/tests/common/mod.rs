#![allow(dead_code)]

use tablesmith::prelude::*;

/// An in-memory database with `ddl` already executed.
pub fn session(ddl: &[&str]) -> SqliteSession {
    let mut session = SqliteSession::memory().unwrap();
    for statement in ddl {
        session
            .execute(statement)
            .unwrap_or_else(|e| panic!("{statement}: {e}"));
    }
    session
}

/// Reads `name` back from the database.
pub fn load(session: &mut SqliteSession, name: &str) -> Table {
    load_table(session, name)
        .unwrap()
        .unwrap_or_else(|| panic!("table {name} does not exist"))
}

pub fn definition(json: &str) -> TableDefinition {
    serde_json::from_str(json).unwrap()
}

/// Resolves `definition` against the live table and saves it.
pub fn apply(session: &mut SqliteSession, definition: &TableDefinition) -> Result<MemoryLog> {
    let context = Dialect::Sqlite.context();
    let baseline = load_table(session, definition.existing_name())?;
    let table = definition.resolve(context.as_ref(), baseline.as_ref())?;
    let mut editor = match baseline {
        Some(baseline) => TableEditor::open(context, baseline),
        None => TableEditor::create(context, &table.name),
    };
    editor.set_current(table);
    let log = MemoryLog::new();
    editor.save(session, &log)?;
    Ok(log)
}

/// The plan that would bring the live table in line with `definition`.
pub fn plan(session: &mut SqliteSession, definition: &TableDefinition) -> Plan {
    let context = Dialect::Sqlite.context();
    let baseline = load(session, definition.existing_name());
    let table = definition.resolve(context.as_ref(), Some(&baseline)).unwrap();
    let taken = session.table_names().unwrap();
    context.plan_alter(&baseline, &table, &taken).unwrap()
}

/// `users` with a rowid key, a unique email, a checked status, an index
/// and a named table check.
pub const USERS: &str = r#"{
    "name": "users",
    "columns": [
        { "name": "id", "type": "INTEGER", "nullable": false, "auto_increment": true },
        { "name": "email", "type": "VARCHAR", "length": 120, "nullable": false },
        { "name": "status", "type": "TEXT", "default": "'active'",
          "check": "status IN ('active', 'banned')" }
    ],
    "indexes": [
        { "name": "PRIMARY", "type": "PRIMARY", "columns": ["id"] },
        { "name": "uq_email", "type": "UNIQUE", "columns": ["email"], "constraint": true },
        { "name": "idx_status", "type": "INDEX", "columns": ["status"] }
    ],
    "checks": [ { "name": "email_length", "expression": "length(email) > 3" } ]
}"#;
