//! SQLite catalog introspection.
//!
//! Columns, indexes and foreign keys come from the `pragma_*` table-valued
//! functions. What the pragmas do not report (collations, generation
//! expressions, check constraints, partial-index predicates and the names of
//! foreign keys) is recovered from the `CREATE` statement SQLite keeps in
//! `sqlite_master`, split into its top-level definitions. Nothing beyond that
//! split is parsed.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use sqlx::sqlite::SqliteRow;
use tracing::{debug, warn};

use tablesmith_core::prelude::*;

use crate::session::{SqliteSession, catalog_error};

static DECLARED_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_ ]*?)\s*(?:\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\))?\s*$")
        .expect("declared type pattern is valid")
});

static COLLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bCOLLATE\s+(?:"([^"]+)"|([A-Za-z0-9_]+))"#).expect("collate pattern is valid")
});

static GENERATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bGENERATED\s+ALWAYS\s+)?\bAS\s*\(").expect("generated pattern is valid")
});

static INLINE_CHECK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCHECK\s*\(").expect("check pattern is valid"));

static AUTOINCREMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAUTOINCREMENT\b").expect("autoincrement pattern is valid"));

/// `cid, name, type, notnull, dflt_value, pk, hidden`
type ColumnRow = (i64, String, String, i64, Option<String>, i64, i64);

/// `name, unique, origin`
type IndexListRow = (String, i64, String);

/// `id, seq, table, from, to, on_update, on_delete`
type ForeignKeyRow = (i64, i64, String, String, Option<String>, String, String);

const TABLE_CONSTRAINTS: &[&str] = &["CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN"];

impl SqliteSession {
    fn catalog<T>(&mut self, sql: &str, binds: &[&str]) -> tablesmith_core::Result<Vec<T>>
    where
        T: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut query = sqlx::query_as::<_, T>(sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        self.runtime
            .block_on(query.fetch_all(&mut self.conn))
            .map_err(|e| catalog_error(&e))
    }

    /// The stored `CREATE` statement of a table or index.
    fn stored_sql(&mut self, kind: &str, name: &str) -> tablesmith_core::Result<Option<String>> {
        let rows: Vec<(Option<String>,)> = self.catalog(
            "SELECT sql FROM sqlite_master WHERE type = ?1 AND name = ?2",
            &[kind, name],
        )?;
        Ok(rows.into_iter().next().and_then(|(sql,)| sql))
    }

    /// Top-level definitions of a table's `CREATE` statement.
    fn definitions(&mut self, table: &str) -> tablesmith_core::Result<Vec<String>> {
        let sql = self.stored_sql("table", table)?.unwrap_or_default();
        match split_definitions(&sql) {
            Some(definitions) => Ok(definitions),
            None => {
                warn!(
                    table = %table,
                    "Stored CREATE statement could not be split; collations, checks and generation expressions are not read"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Primary key columns in key order, as reported by `table_xinfo`.
    fn key_columns(&mut self, table: &str) -> tablesmith_core::Result<Vec<String>> {
        let rows: Vec<(String,)> = self.catalog(
            "SELECT name FROM pragma_table_xinfo(?1) WHERE pk > 0 ORDER BY pk",
            &[table],
        )?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Resolves a declared type against the catalog, falling back to the
    /// type SQLite's affinity rules give it.
    fn declared_type(&self, declared: &str) -> tablesmith_core::Result<(Datatype, Option<u32>, Option<u32>)> {
        let (name, first, second) = match DECLARED_TYPE.captures(declared) {
            Some(caps) => (
                caps[1].to_ascii_uppercase(),
                caps.get(2).and_then(|m| m.as_str().parse().ok()),
                caps.get(3).and_then(|m| m.as_str().parse().ok()),
            ),
            None => (declared.trim().to_ascii_uppercase(), None, None),
        };
        let catalog = self.context.datatypes();
        let datatype = match catalog.get_by_name(&name) {
            Ok(datatype) => datatype,
            Err(_) => {
                let fallback = affinity(&name);
                debug!(declared = %declared, datatype = fallback, "Declared type not in catalog");
                catalog.get_by_name(fallback)?
            }
        };
        Ok((datatype, first, second))
    }

    fn index_type(&self, name: &str) -> tablesmith_core::Result<IndexType> {
        self.context.index_types().get_by_name(name)
    }

    fn index_columns(&mut self, index: &str) -> tablesmith_core::Result<Vec<(i64, Option<String>)>> {
        self.catalog(
            "SELECT cid, name FROM pragma_index_info(?1) ORDER BY seqno",
            &[index],
        )
    }
}

impl SchemaSource for SqliteSession {
    fn get_table(&mut self, name: &str) -> tablesmith_core::Result<Option<Table>> {
        let rows: Vec<(String, i64)> = self.catalog(
            "SELECT name, rootpage FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            &[name],
        )?;
        let Some((name, rootpage)) = rows.into_iter().next() else {
            return Ok(None);
        };
        let count_sql = format!("SELECT COUNT(*) FROM {}", self.context.quote_identifier(&name));
        let count: Vec<(i64,)> = self.catalog(&count_sql, &[])?;
        let mut table = Table::new(persisted(rootpage), name);
        table.row_count = count.first().and_then(|(n,)| u64::try_from(*n).ok());
        Ok(Some(table))
    }

    fn get_columns(&mut self, table: &Table) -> tablesmith_core::Result<Vec<Column>> {
        let rows: Vec<ColumnRow> = self.catalog(
            r#"SELECT cid, name, type, "notnull", dflt_value, pk, hidden FROM pragma_table_xinfo(?1) ORDER BY cid"#,
            &[table.name.as_str()],
        )?;
        let definitions = self.definitions(&table.name)?;
        let sql = self.stored_sql("table", &table.name)?.unwrap_or_default();
        let lone_key = rows.iter().filter(|row| row.5 > 0).count() == 1;
        let autoincrement = AUTOINCREMENT.is_match(&sql);

        let mut columns = Vec::with_capacity(rows.len());
        for (cid, name, declared, notnull, default, pk, hidden) in rows {
            if hidden == 1 {
                continue;
            }
            let (datatype, first, second) = self.declared_type(&declared)?;
            let mut column = Column::new(persisted(cid + 1), name, datatype);
            column.is_nullable = notnull == 0;
            column.server_default = default;
            if datatype.flags.has_length {
                column.length = first;
            } else if datatype.flags.has_precision {
                column.numeric_precision = first;
                column.numeric_scale = second;
            }
            column.is_auto_increment = pk > 0 && lone_key && autoincrement && datatype.is_integer();

            let segment = definitions
                .iter()
                .find(|d| defines_column(d, &column.name))
                .map(String::as_str)
                .unwrap_or_default();
            if datatype.flags.has_collation {
                column.collation = COLLATE.captures(segment).and_then(|caps| {
                    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string())
                });
            }
            column.check = INLINE_CHECK
                .find(segment)
                .and_then(|m| parenthesized(segment, m.end() - 1))
                .map(str::to_string);
            if hidden >= 2 {
                let virtuality = if hidden == 3 {
                    Virtuality::Stored
                } else {
                    Virtuality::Virtual
                };
                let expression = GENERATED
                    .find(segment)
                    .and_then(|m| parenthesized(segment, m.end() - 1))
                    .unwrap_or_default();
                column = column.generated(virtuality, expression);
            }
            columns.push(column);
        }
        debug!(table = %table.name, columns = columns.len(), "Read columns");
        Ok(columns)
    }

    fn get_indexes(&mut self, table: &Table) -> tablesmith_core::Result<Vec<Index>> {
        let list: Vec<IndexListRow> = self.catalog(
            r#"SELECT name, "unique", origin FROM pragma_index_list(?1) ORDER BY seq DESC"#,
            &[table.name.as_str()],
        )?;
        let mut indexes = Vec::with_capacity(list.len() + 1);
        for (name, unique, origin) in list {
            let pages: Vec<(i64,)> = self.catalog(
                "SELECT rootpage FROM sqlite_master WHERE type = 'index' AND name = ?1",
                &[name.as_str()],
            )?;
            let id = persisted(pages.first().map_or(0, |(page,)| *page));
            let keys = self.index_columns(&name)?;
            let columns: Vec<String> = keys.iter().filter_map(|(_, n)| n.clone()).collect();
            let unique = unique != 0;

            let index = match origin.as_str() {
                "pk" => Index::new(id, "PRIMARY", self.index_type("PRIMARY")?, columns),
                "u" => Index::new(id, name, self.index_type("UNIQUE")?, columns).constraint(),
                _ => {
                    let sql = self.stored_sql("index", &name)?.unwrap_or_default();
                    let (parts, condition) = index_parts(&sql).unwrap_or_default();
                    let has_expression = keys.iter().any(|(cid, _)| *cid == -2);
                    let index = if has_expression {
                        let index_type = if unique {
                            self.index_type("UNIQUE")?
                        } else {
                            self.index_type("EXPRESSION")?
                        };
                        let expression = parts.iter().map(|p| unwrap_parens(p).to_string());
                        Index::on_expressions(id, name, index_type, expression)
                    } else {
                        let index_type = match (unique, condition.is_some()) {
                            (true, _) => self.index_type("UNIQUE")?,
                            (false, true) => self.index_type("PARTIAL")?,
                            (false, false) => self.index_type("INDEX")?,
                        };
                        Index::new(id, name, index_type, columns)
                    };
                    match condition {
                        Some(condition) => index.condition(condition),
                        None => index,
                    }
                }
            };
            indexes.push(index);
        }

        if !indexes.iter().any(Index::is_primary) {
            let key = self.key_columns(&table.name)?;
            if !key.is_empty() {
                // The rowid alias has no index of its own.
                let primary = self.index_type("PRIMARY")?;
                indexes.insert(0, Index::new(table.id, "PRIMARY", primary, key));
            }
        }
        debug!(table = %table.name, indexes = indexes.len(), "Read indexes");
        Ok(indexes)
    }

    fn get_foreign_keys(&mut self, table: &Table) -> tablesmith_core::Result<Vec<ForeignKey>> {
        let rows: Vec<ForeignKeyRow> = self.catalog(
            r#"SELECT id, seq, "table", "from", "to", on_update, on_delete FROM pragma_foreign_key_list(?1) ORDER BY id DESC, seq"#,
            &[table.name.as_str()],
        )?;
        let names = constraint_names(&self.definitions(&table.name)?);

        let mut foreign_keys: Vec<(i64, ForeignKey)> = Vec::new();
        let mut implicit_targets: HashMap<String, Vec<String>> = HashMap::new();
        for (id, seq, reference_table, from, to, on_update, on_delete) in rows {
            let to = match to {
                Some(to) => to,
                None => {
                    if !implicit_targets.contains_key(&reference_table) {
                        let key = self.key_columns(&reference_table)?;
                        implicit_targets.insert(reference_table.clone(), key);
                    }
                    implicit_targets
                        .get(&reference_table)
                        .and_then(|key| key.get(usize::try_from(seq).unwrap_or_default()))
                        .cloned()
                        .unwrap_or_else(|| from.clone())
                }
            };
            match foreign_keys.last_mut() {
                Some((last, fk)) if *last == id => {
                    fk.columns.push(from);
                    fk.reference_columns.push(to);
                }
                _ => {
                    let fk = ForeignKey::new(
                        persisted(id + 1),
                        format!("fk_{}_{id}", table.name),
                        from,
                        reference_table,
                        to,
                    )
                    .on_update(ReferentialAction::parse(&on_update).unwrap_or_default())
                    .on_delete(ReferentialAction::parse(&on_delete).unwrap_or_default());
                    foreign_keys.push((id, fk));
                }
            }
        }

        Ok(foreign_keys
            .into_iter()
            .map(|(_, mut fk)| {
                if let Some(name) = names.get(&fk.columns.join(",").to_ascii_lowercase()) {
                    fk.name.clone_from(name);
                }
                fk
            })
            .collect())
    }

    fn get_checks(&mut self, table: &Table) -> tablesmith_core::Result<Vec<Check>> {
        let checks: Vec<Check> = self
            .definitions(&table.name)?
            .iter()
            .filter_map(|d| table_check(d))
            .zip(1_i64..)
            .map(|((name, expression), n)| match name {
                Some(name) => Check::named(persisted(n), name, expression),
                None => Check::anonymous(persisted(n), expression),
            })
            .collect();
        debug!(table = %table.name, checks = checks.len(), "Read checks");
        Ok(checks)
    }
}

fn persisted(n: i64) -> EntityId {
    EntityId::Persisted(n.unsigned_abs())
}

/// The type SQLite's affinity rules give a declared type name.
fn affinity(name: &str) -> &'static str {
    if name.contains("INT") {
        "INTEGER"
    } else if name.contains("CHAR") || name.contains("CLOB") || name.contains("TEXT") {
        "TEXT"
    } else if name.is_empty() || name.contains("BLOB") {
        "BLOB"
    } else if name.contains("REAL") || name.contains("FLOA") || name.contains("DOUB") {
        "REAL"
    } else {
        "NUMERIC"
    }
}

// ---------------------------------------------------------------
// Stored statement text
// ---------------------------------------------------------------

/// Calls `visit(offset, ch, depth)` for every character outside quoted
/// text, with the parenthesis depth before `ch`. Stops when `visit`
/// returns `false`.
fn scan(text: &str, mut visit: impl FnMut(usize, char, usize) -> bool) {
    let mut quote: Option<char> = None;
    let mut depth = 0_usize;
    for (i, ch) in text.char_indices() {
        if let Some(close) = quote {
            if ch == close {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '[' => quote = Some(']'),
            _ => {
                if !visit(i, ch, depth) {
                    return;
                }
                match ch {
                    '(' => depth += 1,
                    ')' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
        }
    }
}

/// Offset of the parenthesis closing the one at `open`.
fn closing(text: &str, open: usize) -> Option<usize> {
    let tail = text.get(open..)?;
    if !tail.starts_with('(') {
        return None;
    }
    let mut close = None;
    scan(tail, |i, ch, depth| {
        if ch == ')' && depth == 1 {
            close = Some(open + i);
            false
        } else {
            true
        }
    });
    close
}

/// The trimmed text inside the parenthesis at `open`.
fn parenthesized(text: &str, open: usize) -> Option<&str> {
    closing(text, open).map(|close| text[open + 1..close].trim())
}

/// Offset of the first parenthesis outside quoted text.
fn first_paren(text: &str) -> Option<usize> {
    let mut open = None;
    scan(text, |i, ch, _| {
        if ch == '(' {
            open = Some(i);
            false
        } else {
            true
        }
    });
    open
}

/// Splits `text` on commas that are neither quoted nor parenthesized.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    scan(text, |i, ch, depth| {
        if ch == ',' && depth == 0 {
            parts.push(text[start..i].trim().to_string());
            start = i + 1;
        }
        true
    });
    parts.push(text[start..].trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Column and constraint definitions of a `CREATE TABLE` statement.
fn split_definitions(sql: &str) -> Option<Vec<String>> {
    let body = parenthesized(sql, first_paren(sql)?)?;
    Some(split_top_level(body))
}

/// Key parts and `WHERE` predicate of a `CREATE INDEX` statement.
fn index_parts(sql: &str) -> Option<(Vec<String>, Option<String>)> {
    let open = first_paren(sql)?;
    let close = closing(sql, open)?;
    let parts = split_top_level(&sql[open + 1..close]);
    let condition = strip_keyword(&sql[close + 1..], "WHERE").map(|c| c.trim().to_string());
    Some((parts, condition))
}

/// `(expr)` becomes `expr`; anything else is returned as is.
fn unwrap_parens(part: &str) -> &str {
    let part = part.trim();
    match closing(part, 0) {
        Some(close) if close == part.len() - 1 => part[1..close].trim(),
        _ => part,
    }
}

/// Strips a leading keyword, matched case-insensitively as a whole word.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let text = text.trim_start();
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(rest.trim_start())
}

/// Reads a leading identifier. Returns the unquoted name, whether it was
/// quoted, and the rest of the text.
fn leading_name(text: &str) -> Option<(String, bool, &str)> {
    let text = text.trim_start();
    let close = match text.chars().next()? {
        '"' => '"',
        '`' => '`',
        '[' => ']',
        _ => {
            let end = text
                .find(|c: char| c.is_whitespace() || c == '(' || c == ',')
                .unwrap_or(text.len());
            return Some((text[..end].to_string(), false, &text[end..]));
        }
    };
    let mut name = String::new();
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, ch)) = chars.next() {
        if ch == close {
            if close != ']' && chars.peek().is_some_and(|(_, c)| *c == close) {
                name.push(ch);
                chars.next();
                continue;
            }
            return Some((name, true, &text[i + 1..]));
        }
        name.push(ch);
    }
    None
}

/// Returns `true` if `definition` is the definition of column `name`.
fn defines_column(definition: &str, name: &str) -> bool {
    match leading_name(definition) {
        Some((_, false, _)) if is_table_constraint(definition) => false,
        Some((leading, _, _)) => leading.eq_ignore_ascii_case(name),
        None => false,
    }
}

fn is_table_constraint(definition: &str) -> bool {
    TABLE_CONSTRAINTS
        .iter()
        .any(|k| strip_keyword(definition, k).is_some())
}

/// A table-level `[CONSTRAINT name] CHECK (expr)`.
fn table_check(definition: &str) -> Option<(Option<String>, String)> {
    let (name, rest) = match strip_keyword(definition, "CONSTRAINT") {
        Some(rest) => {
            let (name, _, rest) = leading_name(rest)?;
            (Some(name), rest)
        }
        None => (None, definition),
    };
    let rest = strip_keyword(rest, "CHECK")?;
    parenthesized(rest, 0).map(|e| (name, e.to_string()))
}

/// Names of `CONSTRAINT name FOREIGN KEY (cols)` definitions, keyed by
/// their lowercased, comma-joined column list.
fn constraint_names(definitions: &[String]) -> HashMap<String, String> {
    definitions
        .iter()
        .filter_map(|d| {
            let rest = strip_keyword(d, "CONSTRAINT")?;
            let (name, _, rest) = leading_name(rest)?;
            let rest = strip_keyword(strip_keyword(rest, "FOREIGN")?, "KEY")?;
            let columns: Vec<String> = split_top_level(parenthesized(rest, 0)?)
                .iter()
                .filter_map(|c| leading_name(c).map(|(n, _, _)| n))
                .collect();
            Some((columns.join(",").to_ascii_lowercase(), name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablesmith_core::session::{Session, load_table};

    fn session(ddl: &[&str]) -> SqliteSession {
        let mut session = SqliteSession::memory().unwrap();
        for statement in ddl {
            session.execute(statement).unwrap();
        }
        session
    }

    #[test]
    fn splits_definitions_outside_quotes_and_parens() {
        let parts = split_definitions(
            r#"CREATE TABLE "a(b" (x DECIMAL(10,2) DEFAULT ',', y TEXT CHECK (y IN ('a','b')))"#,
        )
        .unwrap();
        assert_eq!(
            parts,
            vec!["x DECIMAL(10,2) DEFAULT ','", "y TEXT CHECK (y IN ('a','b'))"]
        );
    }

    #[test]
    fn reads_index_parts() {
        let (parts, condition) =
            index_parts("CREATE INDEX i ON t ((lower(a)), b) WHERE b IS NOT NULL").unwrap();
        assert_eq!(parts, vec!["(lower(a))", "b"]);
        assert_eq!(unwrap_parens(&parts[0]), "lower(a)");
        assert_eq!(condition.as_deref(), Some("b IS NOT NULL"));
    }

    #[test]
    fn quoted_names_are_not_constraints() {
        assert!(defines_column(r#""check" INTEGER"#, "check"));
        assert!(!defines_column("CHECK (a > 0)", "check"));
        assert!(defines_column("[my col] TEXT", "my col"));
    }

    #[test]
    fn declared_types_fall_back_to_affinity() {
        let session = SqliteSession::memory().unwrap();
        let (varchar, length, _) = session.declared_type("varchar(50)").unwrap();
        assert_eq!((varchar.name, length), ("VARCHAR", Some(50)));
        let (decimal, p, s) = session.declared_type("DECIMAL(10, 2)").unwrap();
        assert_eq!((decimal.name, p, s), ("DECIMAL", Some(10), Some(2)));
        assert_eq!(session.declared_type("UNSIGNED BIG INT").unwrap().0.name, "INTEGER");
        assert_eq!(session.declared_type("NVARCHAR(10)").unwrap().0.name, "TEXT");
        assert_eq!(session.declared_type("").unwrap().0.name, "BLOB");
        assert_eq!(session.declared_type("MONEY").unwrap().0.name, "NUMERIC");
    }

    #[test]
    fn reads_columns_and_rowid_key() {
        let mut session = session(&[
            "CREATE TABLE notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                title VARCHAR(80) NOT NULL COLLATE NOCASE DEFAULT 'untitled',
                score INTEGER CHECK (score >= 0),
                slug TEXT GENERATED ALWAYS AS (lower(title)) VIRTUAL
            )",
            "INSERT INTO notes (title) VALUES ('a'), ('b')",
        ]);
        let table = load_table(&mut session, "NOTES").unwrap().unwrap();
        assert_eq!(table.name, "notes");
        assert_eq!(table.row_count, Some(2));

        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "title", "score", "slug"]);
        let id = &table.columns[0];
        assert!(id.is_auto_increment && !id.is_nullable);
        let title = &table.columns[1];
        assert_eq!(title.type_sql(), "VARCHAR(80)");
        assert_eq!(title.collation.as_deref(), Some("NOCASE"));
        assert_eq!(title.server_default.as_deref(), Some("'untitled'"));
        assert_eq!(table.columns[2].check.as_deref(), Some("score >= 0"));
        let slug = &table.columns[3];
        assert_eq!(slug.virtuality, Some(Virtuality::Virtual));
        assert_eq!(slug.expression.as_deref(), Some("lower(title)"));

        assert_eq!(table.primary_key_columns(), vec!["id"]);
        assert_eq!(table.primary_key().unwrap().id, table.id);
    }

    #[test]
    fn constraint_indexes_are_detected_structurally() {
        let mut session = session(&[
            "CREATE TABLE members (
                team TEXT NOT NULL,
                person TEXT NOT NULL,
                email TEXT UNIQUE,
                PRIMARY KEY (team, person)
            )",
            "CREATE INDEX members_person ON members (person)",
            "CREATE UNIQUE INDEX members_live ON members (email) WHERE email IS NOT NULL",
            "CREATE INDEX members_lower ON members ((lower(email)))",
        ]);
        let table = load_table(&mut session, "members").unwrap().unwrap();
        let pk = table.primary_key().unwrap();
        assert_eq!(pk.columns, vec!["team", "person"]);
        assert_eq!(pk.origin, IndexOrigin::Constraint);

        let by_name = |name: &str| table.indexes.iter().find(|i| i.name == name).unwrap();
        let unique = table
            .indexes
            .iter()
            .find(|i| i.name.starts_with("sqlite_autoindex") && !i.is_primary())
            .unwrap();
        assert!(unique.is_constraint() && unique.index_type.is_unique);
        assert_eq!(by_name("members_person").index_type, IndexType::normal());
        assert_eq!(by_name("members_lower").index_type, IndexType::expression());
        let live = by_name("members_live");
        assert_eq!(live.condition.as_deref(), Some("email IS NOT NULL"));
        assert!(live.index_type.is_unique && live.index_type.enable_condition);
        assert_eq!(by_name("members_lower").expression, vec!["lower(email)"]);
        assert!(table.is_unique_key(table.column_by_name("email").unwrap()));
    }

    #[test]
    fn reads_foreign_keys_and_checks() {
        let mut session = session(&[
            "CREATE TABLE teams (id INTEGER PRIMARY KEY)",
            "CREATE TABLE players (
                id INTEGER PRIMARY KEY,
                team_id INTEGER REFERENCES teams ON DELETE CASCADE,
                coach_id INTEGER,
                age INTEGER,
                CONSTRAINT fk_coach FOREIGN KEY (coach_id) REFERENCES players (id),
                CONSTRAINT adult CHECK (age >= 18),
                CHECK (id > 0)
            )",
        ]);
        let table = load_table(&mut session, "players").unwrap().unwrap();

        let team = table.foreign_keys.iter().find(|fk| fk.columns == ["team_id"]).unwrap();
        assert_eq!(team.reference_table, "teams");
        assert_eq!(team.reference_columns, vec!["id"]);
        assert_eq!(team.on_delete, ReferentialAction::Cascade);
        assert!(team.name.starts_with("fk_players_"));
        let coach = table.foreign_keys.iter().find(|fk| fk.columns == ["coach_id"]).unwrap();
        assert_eq!(coach.name, "fk_coach");

        assert_eq!(table.checks.len(), 2);
        assert_eq!(table.checks[0].name.as_deref(), Some("adult"));
        assert_eq!(table.checks[0].expression, "age >= 18");
        assert_eq!(table.checks[1].name, None);
    }

    #[test]
    fn missing_table_is_none() {
        let mut session = SqliteSession::memory().unwrap();
        assert!(load_table(&mut session, "nope").unwrap().is_none());
    }
}
