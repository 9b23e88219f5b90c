#![allow(dead_code)]

use tablesmith_core::prelude::*;

pub fn datatype(ctx: &dyn DialectContext, name: &str) -> Datatype {
    ctx.datatypes()
        .get_by_name(name)
        .unwrap_or_else(|e| panic!("{} has no {name}: {e}", ctx.dialect()))
}

/// `users(id INTEGER PK, name VARCHAR(50))` as read from the database.
pub fn users(ctx: &dyn DialectContext) -> Table {
    Table::new(EntityId::Persisted(1), "users")
        .column(Column::new(EntityId::Persisted(1), "id", datatype(ctx, "INTEGER")).not_null())
        .column(Column::new(EntityId::Persisted(2), "name", datatype(ctx, "VARCHAR")).length(50))
        .index(Index::new(
            EntityId::Persisted(1),
            "PRIMARY",
            IndexType::primary(),
            ["id"],
        ))
}

/// `users` with `name` renamed to `full_name` and a new
/// `email VARCHAR(255) NOT NULL DEFAULT ''` appended.
pub fn renamed_with_email(ctx: &dyn DialectContext, original: &Table) -> Table {
    let mut current = original.clone();
    current
        .rename_column(EntityId::Persisted(2), "full_name")
        .unwrap_or_else(|e| panic!("rename failed: {e}"));
    let email = Column::new(current.next_column_id(), "email", datatype(ctx, "VARCHAR"))
        .length(255)
        .not_null()
        .default_text("");
    current.column(email)
}

/// `users` plus `email` and `tenant_id` and an index on `email`.
pub fn users_with_email_index(ctx: &dyn DialectContext) -> Table {
    users(ctx)
        .column(Column::new(EntityId::Persisted(3), "email", datatype(ctx, "VARCHAR")).length(255))
        .column(Column::new(EntityId::Persisted(4), "tenant_id", datatype(ctx, "INTEGER")))
        .index(Index::new(
            EntityId::Persisted(2),
            "idx_email",
            IndexType::normal(),
            ["email"],
        ))
}

/// Marks every entity of `table` as persisted, as if it had been read back
/// after a save.
pub fn persisted(table: &Table) -> Table {
    let mut table = table.clone();
    let mut next = 100;
    let mut persist = |id: &mut EntityId| {
        if id.is_pending() {
            next += 1;
            *id = EntityId::Persisted(next);
        }
    };
    persist(&mut table.id);
    for column in &mut table.columns {
        persist(&mut column.id);
    }
    for index in &mut table.indexes {
        persist(&mut index.id);
    }
    for fk in &mut table.foreign_keys {
        persist(&mut fk.id);
    }
    for check in &mut table.checks {
        persist(&mut check.id);
    }
    table
}
