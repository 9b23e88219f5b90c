//! DDL fragment assembly.
//!
//! A column definition is rendered from named slots. Each slot is a method
//! of [`DdlBuilder`] returning a fragment or an empty string; non-empty
//! fragments are joined with single spaces in the order the dialect lists
//! its slots. Dialects override individual slot methods and callers may
//! exclude slots for a single rendering, e.g. leaving `PRIMARY KEY` to a
//! table-level constraint when the key spans several columns.
//!
//! Inline index definitions (`UNIQUE KEY name (a, b)`,
//! `CONSTRAINT name UNIQUE (a, b)`) follow the same pattern with
//! [`IndexSlot`].

mod quote;

pub use quote::{needs_quoting, quote_with};

use crate::schema::{Check, Column, ForeignKey, Index, ReferentialAction, Table};

/// A named part of a column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnSlot {
    /// Column name.
    Name,
    /// Type with parameters.
    Datatype,
    /// `UNSIGNED`.
    Unsigned,
    /// `ZEROFILL`.
    Zerofill,
    /// Inline `PRIMARY KEY`.
    PrimaryKey,
    /// Auto-increment marker or serial substitution.
    AutoIncrement,
    /// `NOT NULL`.
    Nullable,
    /// Inline `UNIQUE`.
    Unique,
    /// Inline `CHECK (...)`.
    Check,
    /// `DEFAULT ...`.
    Default,
    /// `COLLATE ...`.
    Collate,
    /// `GENERATED ALWAYS AS (...)`.
    Generated,
}

/// A named part of an inline index definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexSlot {
    /// Kind (`PRIMARY KEY`, `UNIQUE`, `KEY`, ...).
    Type,
    /// Index or constraint name.
    Name,
    /// Key parts.
    Columns,
}

/// Renders entities into DDL fragments for one dialect.
pub trait DdlBuilder {
    /// Returns the identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Quotes an identifier when it cannot be written bare.
    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, self.quote_char())
    }

    /// Quotes and joins a list of identifiers.
    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ---------------------------------------------------------------
    // Column slots
    // ---------------------------------------------------------------

    /// Column slots in rendering order.
    fn column_slots(&self) -> &'static [ColumnSlot];

    /// Renders the column name.
    fn name(&self, _table: &Table, column: &Column) -> String {
        self.quote_identifier(&column.name)
    }

    /// Renders the type.
    fn datatype(&self, _table: &Table, column: &Column) -> String {
        column.type_sql()
    }

    /// Renders `UNSIGNED`.
    fn unsigned(&self, _table: &Table, column: &Column) -> String {
        flag(column.is_unsigned && column.datatype.flags.has_unsigned, "UNSIGNED")
    }

    /// Renders `ZEROFILL`.
    fn zerofill(&self, _table: &Table, column: &Column) -> String {
        flag(column.is_zerofill && column.datatype.flags.has_zerofill, "ZEROFILL")
    }

    /// Renders `PRIMARY KEY` for any primary key column.
    fn primary_key(&self, table: &Table, column: &Column) -> String {
        flag(table.is_primary_key(column), "PRIMARY KEY")
    }

    /// Renders the auto-increment marker.
    fn auto_increment(&self, _table: &Table, column: &Column) -> String {
        flag(column.is_auto_increment, "AUTO_INCREMENT")
    }

    /// Renders `NOT NULL`; generated columns get nothing.
    fn nullable(&self, _table: &Table, column: &Column) -> String {
        flag(!column.is_nullable && !column.is_generated(), "NOT NULL")
    }

    /// Renders `UNIQUE` for a column that alone makes up a unique key.
    fn unique(&self, table: &Table, column: &Column) -> String {
        flag(table.is_unique_key(column), "UNIQUE")
    }

    /// Renders the inline check.
    fn check(&self, _table: &Table, column: &Column) -> String {
        column
            .check
            .as_ref()
            .map(|c| format!("CHECK ({c})"))
            .unwrap_or_default()
    }

    /// Renders the default; generated columns get nothing.
    fn default(&self, _table: &Table, column: &Column) -> String {
        match &column.server_default {
            Some(d) if !column.is_generated() => format!("DEFAULT {d}"),
            _ => String::new(),
        }
    }

    /// Renders the collation.
    fn collate(&self, _table: &Table, column: &Column) -> String {
        match &column.collation {
            Some(c) if column.datatype.flags.has_collation => format!("COLLATE {c}"),
            _ => String::new(),
        }
    }

    /// Renders the generation clause.
    fn generated(&self, _table: &Table, column: &Column) -> String {
        match (&column.virtuality, &column.expression) {
            (Some(v), Some(expr)) => format!("GENERATED ALWAYS AS ({expr}) {}", v.as_sql()),
            _ => String::new(),
        }
    }

    /// Renders one slot.
    fn render_column_slot(&self, slot: ColumnSlot, table: &Table, column: &Column) -> String {
        match slot {
            ColumnSlot::Name => self.name(table, column),
            ColumnSlot::Datatype => self.datatype(table, column),
            ColumnSlot::Unsigned => self.unsigned(table, column),
            ColumnSlot::Zerofill => self.zerofill(table, column),
            ColumnSlot::PrimaryKey => self.primary_key(table, column),
            ColumnSlot::AutoIncrement => self.auto_increment(table, column),
            ColumnSlot::Nullable => self.nullable(table, column),
            ColumnSlot::Unique => self.unique(table, column),
            ColumnSlot::Check => self.check(table, column),
            ColumnSlot::Default => self.default(table, column),
            ColumnSlot::Collate => self.collate(table, column),
            ColumnSlot::Generated => self.generated(table, column),
        }
    }

    /// Renders a full column definition, skipping `exclude`.
    fn build_column(&self, table: &Table, column: &Column, exclude: &[ColumnSlot]) -> String {
        self.column_slots()
            .iter()
            .filter(|slot| !exclude.contains(slot))
            .map(|slot| self.render_column_slot(*slot, table, column))
            .filter(|fragment| !fragment.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    // ---------------------------------------------------------------
    // Index slots
    // ---------------------------------------------------------------

    /// Index slots in rendering order for inline definitions.
    fn index_slots(&self) -> &'static [IndexSlot] {
        &[IndexSlot::Name, IndexSlot::Type, IndexSlot::Columns]
    }

    /// Renders the kind of an inline index definition.
    fn index_type(&self, index: &Index) -> String {
        if index.is_primary() {
            "PRIMARY KEY".to_string()
        } else if index.index_type.is_unique {
            "UNIQUE".to_string()
        } else {
            String::new()
        }
    }

    /// Renders the name of an inline index definition.
    fn index_name(&self, index: &Index) -> String {
        format!("CONSTRAINT {}", self.quote_identifier(&index.name))
    }

    /// Renders the key parts: plain columns, or parenthesized expressions.
    fn index_columns(&self, index: &Index) -> String {
        if index.expression.is_empty() {
            format!("({})", self.quote_list(&index.columns))
        } else {
            let parts: Vec<String> = index.expression.iter().map(|e| format!("({e})")).collect();
            format!("({})", parts.join(", "))
        }
    }

    /// Renders one index slot.
    fn render_index_slot(&self, slot: IndexSlot, index: &Index) -> String {
        match slot {
            IndexSlot::Type => self.index_type(index),
            IndexSlot::Name => self.index_name(index),
            IndexSlot::Columns => self.index_columns(index),
        }
    }

    /// Renders an inline index definition, skipping `exclude`.
    fn build_index(&self, index: &Index, exclude: &[IndexSlot]) -> String {
        self.index_slots()
            .iter()
            .filter(|slot| !exclude.contains(slot))
            .map(|slot| self.render_index_slot(*slot, index))
            .filter(|fragment| !fragment.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Renders `CREATE [kind] INDEX name ON table [USING m] (parts) [WHERE cond]`.
    fn create_index(&self, table: &str, index: &Index) -> String {
        let mut sql = String::from("CREATE ");
        if !index.index_type.keyword.is_empty() {
            sql.push_str(index.index_type.keyword);
            sql.push(' ');
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.quote_identifier(&index.name));
        sql.push_str(" ON ");
        sql.push_str(&self.quote_identifier(table));
        if let Some(method) = index.index_type.method {
            sql.push_str(" USING ");
            sql.push_str(method);
        }
        sql.push(' ');
        sql.push_str(&self.index_columns(index));
        if let Some(condition) = &index.condition {
            if index.index_type.enable_condition {
                sql.push_str(" WHERE ");
                sql.push_str(condition);
            }
        }
        sql
    }

    // ---------------------------------------------------------------
    // Constraints
    // ---------------------------------------------------------------

    /// Renders `CONSTRAINT name FOREIGN KEY (...) REFERENCES t (...) [actions]`.
    fn foreign_key_definition(&self, fk: &ForeignKey) -> String {
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_identifier(&fk.name),
            self.quote_list(&fk.columns),
            self.quote_identifier(&fk.reference_table),
            self.quote_list(&fk.reference_columns)
        );
        if fk.on_delete != ReferentialAction::NoAction {
            sql.push_str(" ON DELETE ");
            sql.push_str(fk.on_delete.as_sql());
        }
        if fk.on_update != ReferentialAction::NoAction {
            sql.push_str(" ON UPDATE ");
            sql.push_str(fk.on_update.as_sql());
        }
        sql
    }

    /// Renders `[CONSTRAINT name] CHECK (expr)`.
    fn check_definition(&self, check: &Check) -> String {
        match &check.name {
            Some(name) => format!(
                "CONSTRAINT {} CHECK ({})",
                self.quote_identifier(name),
                check.expression
            ),
            None => format!("CHECK ({})", check.expression),
        }
    }
}

fn flag(on: bool, fragment: &str) -> String {
    if on {
        fragment.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Datatype, DatatypeCategory, IndexType};
    use crate::id::EntityId;

    struct Plain;

    impl DdlBuilder for Plain {
        fn column_slots(&self) -> &'static [ColumnSlot] {
            &[
                ColumnSlot::Name,
                ColumnSlot::Datatype,
                ColumnSlot::PrimaryKey,
                ColumnSlot::AutoIncrement,
                ColumnSlot::Nullable,
                ColumnSlot::Unique,
                ColumnSlot::Check,
                ColumnSlot::Default,
                ColumnSlot::Collate,
                ColumnSlot::Generated,
            ]
        }
    }

    fn table() -> Table {
        Table::pending("users")
            .column(
                Column::new(
                    EntityId::Pending(-1),
                    "id",
                    Datatype::new("INTEGER", DatatypeCategory::Integer),
                )
                .not_null()
                .auto_increment(),
            )
            .column(
                Column::new(
                    EntityId::Pending(-2),
                    "email",
                    Datatype::new("VARCHAR", DatatypeCategory::Text).with_length(),
                )
                .length(255)
                .not_null()
                .default_text(""),
            )
            .index(Index::new(
                EntityId::Pending(-1),
                "PRIMARY",
                IndexType::primary(),
                ["id"],
            ))
    }

    #[test]
    fn slots_join_in_order() {
        let t = table();
        assert_eq!(
            Plain.build_column(&t, &t.columns[0], &[]),
            "id INTEGER PRIMARY KEY AUTO_INCREMENT NOT NULL"
        );
        assert_eq!(
            Plain.build_column(&t, &t.columns[1], &[]),
            "email VARCHAR(255) NOT NULL DEFAULT ''"
        );
    }

    #[test]
    fn excluded_slots_never_render() {
        let t = table();
        let sql = Plain.build_column(
            &t,
            &t.columns[0],
            &[ColumnSlot::PrimaryKey, ColumnSlot::AutoIncrement],
        );
        assert_eq!(sql, "id INTEGER NOT NULL");
        assert!(!sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn generated_columns_skip_default_and_nullability() {
        let t = table();
        let col = Column::new(
            EntityId::Pending(-3),
            "domain",
            Datatype::new("TEXT", DatatypeCategory::Text),
        )
        .not_null()
        .generated(
            crate::schema::Virtuality::Virtual,
            "substr(email, instr(email, '@') + 1)",
        );
        assert_eq!(
            Plain.build_column(&t, &col, &[]),
            "domain TEXT GENERATED ALWAYS AS (substr(email, instr(email, '@') + 1)) VIRTUAL"
        );
    }

    #[test]
    fn inline_index_definitions() {
        let pk = Index::new(
            EntityId::Pending(-1),
            "pk_users",
            IndexType::primary(),
            ["a", "b"],
        );
        assert_eq!(
            Plain.build_index(&pk, &[]),
            "CONSTRAINT pk_users PRIMARY KEY (a, b)"
        );
        assert_eq!(
            Plain.build_index(&pk, &[IndexSlot::Name]),
            "PRIMARY KEY (a, b)"
        );
    }

    #[test]
    fn create_index_statement() {
        let idx = Index::new(
            EntityId::Pending(-1),
            "idx_email",
            IndexType::unique().with_condition(),
            ["email"],
        )
        .condition("deleted_at IS NULL");
        assert_eq!(
            Plain.create_index("users", &idx),
            "CREATE UNIQUE INDEX idx_email ON users (email) WHERE deleted_at IS NULL"
        );

        let expr = Index::on_expressions(
            EntityId::Pending(-2),
            "idx_lower",
            IndexType::expression(),
            ["lower(email)"],
        );
        assert_eq!(
            Plain.create_index("users", &expr),
            "CREATE INDEX idx_lower ON users ((lower(email)))"
        );
    }

    #[test]
    fn constraint_definitions() {
        let fk = ForeignKey::new(EntityId::Pending(-1), "fk_owner", "owner_id", "users", "id")
            .on_delete(ReferentialAction::Cascade);
        assert_eq!(
            Plain.foreign_key_definition(&fk),
            "CONSTRAINT fk_owner FOREIGN KEY (owner_id) REFERENCES users (id) ON DELETE CASCADE"
        );
        let check = Check::anonymous(EntityId::Pending(-1), "price > 0");
        assert_eq!(Plain.check_definition(&check), "CHECK (price > 0)");
    }
}
