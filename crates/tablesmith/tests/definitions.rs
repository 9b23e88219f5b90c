mod common;

use std::fs;

use tablesmith::prelude::*;

use common::{USERS, apply, definition, load, plan, session};

#[test]
fn loads_definition_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    fs::write(&path, USERS).unwrap();

    let loaded = TableDefinition::load(&path).unwrap();
    assert_eq!(loaded, definition(USERS));
    assert_eq!(loaded.existing_name(), "users");
}

#[test]
fn malformed_files_name_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, r#"{ "name": "t", "columns": [ { "name": "a" } ] }"#).unwrap();

    match TableDefinition::load(&path).unwrap_err() {
        Error::Definition { path: reported, message } => {
            assert_eq!(reported, path);
            assert!(message.contains("type"), "{message}");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        TableDefinition::load(&dir.path().join("missing.json")),
        Err(Error::Io(_))
    ));
}

#[test]
fn inspected_definition_feeds_back_unchanged() {
    let mut db = session(&[
        "CREATE TABLE authors (id INTEGER PRIMARY KEY)",
        "CREATE TABLE books (
            id INTEGER PRIMARY KEY,
            author_id INTEGER NOT NULL,
            title TEXT NOT NULL COLLATE NOCASE,
            price DECIMAL(8,2) DEFAULT 0,
            slug TEXT GENERATED ALWAYS AS (lower(title)) STORED,
            CONSTRAINT fk_author FOREIGN KEY (author_id) REFERENCES authors (id) ON DELETE CASCADE,
            CHECK (price >= 0)
        )",
        "CREATE INDEX books_title ON books (title) WHERE price > 0",
    ]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.json");
    let inspected = TableDefinition::from_table(&load(&mut db, "books"));
    fs::write(&path, inspected.to_json().unwrap()).unwrap();

    let reloaded = TableDefinition::load(&path).unwrap();
    assert_eq!(reloaded, inspected);
    assert_eq!(reloaded.foreign_keys[0].on_delete.as_deref(), Some("CASCADE"));
    let slug = reloaded.columns.iter().find(|c| c.name == "slug").unwrap();
    assert!(slug.generated.as_ref().unwrap().stored);

    let again = plan(&mut db, &reloaded);
    assert!(again.is_empty(), "{again}");
}

#[test]
fn applied_definition_round_trips_through_json() {
    let mut db = session(&[]);
    apply(&mut db, &definition(USERS)).unwrap();
    let json = TableDefinition::from_table(&load(&mut db, "users"))
        .to_json()
        .unwrap();
    assert!(json.contains("\"name\": \"email_length\""));
    assert!(json.contains("\"auto_increment\": true"));
    assert!(!json.contains("renamed_from"));
}

/// Drops every id so the definition is matched to the live table by name,
/// as after a rebuild reassigns index root pages.
fn by_name(mut definition: TableDefinition) -> TableDefinition {
    definition.columns.iter_mut().for_each(|c| c.id = None);
    definition.indexes.iter_mut().for_each(|i| i.id = None);
    definition.checks.iter_mut().for_each(|c| c.id = None);
    definition
}

#[test]
fn expression_indexes_save_back() {
    let mut db = session(&[
        "CREATE TABLE handles (id INTEGER PRIMARY KEY, handle TEXT NOT NULL, bio TEXT)",
        "CREATE UNIQUE INDEX ux_handle ON handles (lower(handle))",
        "CREATE INDEX ix_bio ON handles (length(bio))",
        "INSERT INTO handles (handle, bio) VALUES ('ann', 'hi')",
    ]);
    let inspected = TableDefinition::from_table(&load(&mut db, "handles"));
    let unique = inspected.indexes.iter().find(|i| i.name == "ux_handle").unwrap();
    assert_eq!(unique.index_type, "UNIQUE");
    assert_eq!(unique.expressions, vec!["lower(handle)".to_string()]);
    let plain = inspected.indexes.iter().find(|i| i.name == "ix_bio").unwrap();
    assert_eq!(plain.index_type, "EXPRESSION");

    let unchanged = plan(&mut db, &inspected);
    assert!(unchanged.is_empty(), "{unchanged}");
    apply(&mut db, &inspected).unwrap();

    let mut edited = inspected;
    edited.columns[2].default = Some("''".into());
    assert_eq!(plan(&mut db, &edited).strategy, Strategy::Rebuild);
    apply(&mut db, &edited).unwrap();

    assert!(db.execute("INSERT INTO handles (handle) VALUES ('ANN')").is_err());
    let again = plan(&mut db, &by_name(edited));
    assert!(again.is_empty(), "{again}");
}

#[test]
fn partial_indexes_save_back() {
    let mut db = session(&[
        "CREATE TABLE jobs (id INTEGER PRIMARY KEY, state TEXT NOT NULL, owner TEXT)",
        "CREATE INDEX jobs_pending ON jobs (owner) WHERE state = 'pending'",
        "CREATE UNIQUE INDEX jobs_one_running ON jobs (owner) WHERE state = 'running'",
        "INSERT INTO jobs (state, owner) VALUES ('running', 'ann'), ('pending', 'ann')",
    ]);
    let inspected = TableDefinition::from_table(&load(&mut db, "jobs"));
    let pending = inspected.indexes.iter().find(|i| i.name == "jobs_pending").unwrap();
    assert_eq!(pending.index_type, "PARTIAL");
    assert_eq!(pending.condition.as_deref(), Some("state = 'pending'"));
    let running = inspected.indexes.iter().find(|i| i.name == "jobs_one_running").unwrap();
    assert_eq!(running.index_type, "UNIQUE");
    assert_eq!(running.condition.as_deref(), Some("state = 'running'"));
    assert!(plan(&mut db, &inspected).is_empty());

    let mut edited = inspected;
    edited.columns[2].default = Some("'nobody'".into());
    assert_eq!(plan(&mut db, &edited).strategy, Strategy::Rebuild);
    apply(&mut db, &edited).unwrap();

    let table = load(&mut db, "jobs");
    let running = table.indexes.iter().find(|i| i.name == "jobs_one_running").unwrap();
    assert!(running.index_type.is_unique);
    assert_eq!(running.condition.as_deref(), Some("state = 'running'"));
    assert!(db
        .execute("INSERT INTO jobs (state, owner) VALUES ('running', 'ann')")
        .is_err());
    let again = plan(&mut db, &by_name(edited));
    assert!(again.is_empty(), "{again}");
}
