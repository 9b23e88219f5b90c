//! JSON table definitions.
//!
//! A [`TableDefinition`] is the editable, serializable form of a table. It
//! names datatypes and index types as strings and is resolved against a
//! dialect's catalogs, and against the table as it currently exists, into
//! engine entities.
//!
//! Entities are paired with the existing table by id when the definition
//! carries one (as `inspect` output does), else by name. Anything left over
//! is new and gets a pending id.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tablesmith_core::id::IdAllocator;
use tablesmith_core::prelude::*;

use crate::error::{Error, Result};

/// A table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Name the table currently has, when the definition renames it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
    /// Storage engine (MariaDB).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Default collation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    /// Table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Next auto-increment value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<u64>,
    /// Columns in table order.
    pub columns: Vec<ColumnDefinition>,
    /// Indexes, the primary key included.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDefinition>,
    /// Foreign keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    /// Table-level checks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckDefinition>,
}

/// A column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Database identity, as written by `inspect`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Column name.
    pub name: String,
    /// Datatype name or alias.
    #[serde(rename = "type")]
    pub datatype: String,
    /// Accepts NULL.
    #[serde(default = "nullable_by_default", skip_serializing_if = "is_true")]
    pub nullable: bool,
    /// Default as a SQL expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Values are assigned by the database.
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
    /// Type length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Numeric precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Numeric scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Allowed values of `ENUM`/`SET` types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    /// `UNSIGNED`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unsigned: bool,
    /// `ZEROFILL`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub zerofill: bool,
    /// Collation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    /// Generation clause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedDefinition>,
    /// Inline check expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
}

/// The generation clause of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDefinition {
    /// Generation expression.
    pub expression: String,
    /// Stored rather than virtual.
    #[serde(default, skip_serializing_if = "is_false")]
    pub stored: bool,
}

/// An index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Database identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Index name; `PRIMARY` for the primary key.
    pub name: String,
    /// Index type name, e.g. `PRIMARY`, `UNIQUE`, `INDEX`.
    #[serde(rename = "type")]
    pub index_type: String,
    /// Key columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// Key expressions, used instead of columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<String>,
    /// Partial-index predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Backs a table constraint rather than being created on its own.
    #[serde(default, skip_serializing_if = "is_false")]
    pub constraint: bool,
}

/// A foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    /// Database identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Constraint name.
    pub name: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub references: String,
    /// Referenced columns.
    pub reference_columns: Vec<String>,
    /// `ON UPDATE` action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    /// `ON DELETE` action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}

/// A table-level check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDefinition {
    /// Database identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Constraint name; checks may be anonymous.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Check expression.
    pub expression: String,
}

const fn nullable_by_default() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_true(value: &bool) -> bool {
    *value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Picks the id of an entity: the explicit one, else the id of the
/// baseline entity `matching` finds, else a fresh pending id.
fn pick_id(
    explicit: Option<u64>,
    matching: Option<EntityId>,
    allocator: &mut IdAllocator,
) -> EntityId {
    explicit
        .map(EntityId::Persisted)
        .or(matching)
        .unwrap_or_else(|| allocator.next_pending())
}

fn persisted_id(id: EntityId) -> Option<u64> {
    match id {
        EntityId::Persisted(n) => Some(n),
        EntityId::Pending(_) => None,
    }
}

fn action(text: Option<&str>) -> Result<ReferentialAction> {
    match text {
        None => Ok(ReferentialAction::NoAction),
        Some(text) => ReferentialAction::parse(text).ok_or_else(|| {
            tablesmith_core::Error::NotFound {
                kind: "referential action",
                name: text.to_string(),
            }
            .into()
        }),
    }
}

impl TableDefinition {
    /// Reads a definition from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| Error::Definition {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Writes the definition as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Name of the table as it exists now.
    #[must_use]
    pub fn existing_name(&self) -> &str {
        self.renamed_from.as_deref().unwrap_or(&self.name)
    }

    /// Resolves the definition into a table.
    ///
    /// `baseline` is the table as it exists in the database, if it does;
    /// entities of the definition that match one of its entities take over
    /// that entity's id.
    pub fn resolve(&self, context: &dyn DialectContext, baseline: Option<&Table>) -> Result<Table> {
        let mut table = match baseline {
            Some(baseline) => Table::new(baseline.id, &self.name),
            None => Table::pending(&self.name),
        };
        table.engine.clone_from(&self.engine);
        table.collation.clone_from(&self.collation);
        table.comment.clone_from(&self.comment);
        table.auto_increment = self.auto_increment;

        let mut allocator = IdAllocator::default();
        let mut columns = Vec::with_capacity(self.columns.len());
        for def in &self.columns {
            let matching = baseline
                .and_then(|b| b.column_by_name(&def.name))
                .map(|c| c.id);
            let id = pick_id(def.id, matching, &mut allocator);
            columns.push(def.resolve(context, id)?);
        }
        table.set_columns(columns);

        let mut allocator = IdAllocator::default();
        let sqlite = context.dialect() == Dialect::Sqlite;
        for def in &self.indexes {
            let mut index = def.resolve(context, EntityId::Pending(0))?;
            let by_name = baseline.and_then(|b| {
                b.indexes
                    .iter()
                    .find(|i| i.name == index.name || (i.is_primary() && index.is_primary()))
            });
            // SQLite does not keep the names of table constraints.
            let by_shape = baseline.filter(|_| sqlite).and_then(|b| {
                b.indexes.iter().find(|i| {
                    i.is_constraint()
                        && index.is_constraint()
                        && i.index_type == index.index_type
                        && i.columns == index.columns
                })
            });
            let matching = by_name.or(by_shape);
            if let (None, Some(existing)) = (by_name, by_shape) {
                index.name.clone_from(&existing.name);
            }
            index.id = pick_id(def.id, matching.map(|i| i.id), &mut allocator);
            table.indexes.push(index);
        }

        let mut allocator = IdAllocator::default();
        for def in &self.foreign_keys {
            let matching = baseline.and_then(|b| {
                b.foreign_keys
                    .iter()
                    .find(|fk| fk.name == def.name || fk.columns == def.columns)
                    .map(|fk| fk.id)
            });
            let id = pick_id(def.id, matching, &mut allocator);
            table.foreign_keys.push(def.resolve(id)?);
        }

        let mut allocator = IdAllocator::default();
        for def in &self.checks {
            let matching = baseline.and_then(|b| {
                b.checks
                    .iter()
                    .find(|c| match (&c.name, &def.name) {
                        (Some(a), Some(b)) => a == b,
                        _ => c.expression == def.expression,
                    })
                    .map(|c| c.id)
            });
            let id = pick_id(def.id, matching, &mut allocator);
            table.checks.push(match &def.name {
                Some(name) => Check::named(id, name, &def.expression),
                None => Check::anonymous(id, &def.expression),
            });
        }
        Ok(table)
    }

    /// The definition of an existing table, ids included.
    #[must_use]
    pub fn from_table(table: &Table) -> Self {
        Self {
            name: table.name.clone(),
            renamed_from: None,
            engine: table.engine.clone(),
            collation: table.collation.clone(),
            comment: table.comment.clone(),
            auto_increment: table.auto_increment,
            columns: table.columns.iter().map(ColumnDefinition::from_column).collect(),
            indexes: table.indexes.iter().map(IndexDefinition::from_index).collect(),
            foreign_keys: table
                .foreign_keys
                .iter()
                .map(|fk| ForeignKeyDefinition {
                    id: persisted_id(fk.id),
                    name: fk.name.clone(),
                    columns: fk.columns.clone(),
                    references: fk.reference_table.clone(),
                    reference_columns: fk.reference_columns.clone(),
                    on_update: Some(fk.on_update)
                        .filter(|a| *a != ReferentialAction::NoAction)
                        .map(|a| a.as_sql().to_string()),
                    on_delete: Some(fk.on_delete)
                        .filter(|a| *a != ReferentialAction::NoAction)
                        .map(|a| a.as_sql().to_string()),
                })
                .collect(),
            checks: table
                .checks
                .iter()
                .map(|c| CheckDefinition {
                    id: persisted_id(c.id),
                    name: c.name.clone(),
                    expression: c.expression.clone(),
                })
                .collect(),
        }
    }
}

impl ColumnDefinition {
    fn resolve(&self, context: &dyn DialectContext, id: EntityId) -> Result<Column> {
        let datatype = context.datatypes().get_by_name(&self.datatype)?;
        let mut column = Column::new(id, &self.name, datatype);
        column.is_nullable = self.nullable;
        column.server_default.clone_from(&self.default);
        column.is_auto_increment = self.auto_increment;
        column.length = self.length;
        column.numeric_precision = self.precision;
        column.numeric_scale = self.scale;
        column.set.clone_from(&self.values);
        column.is_unsigned = self.unsigned;
        column.is_zerofill = self.zerofill;
        column.collation.clone_from(&self.collation);
        column.check.clone_from(&self.check);
        if let Some(generated) = &self.generated {
            let virtuality = if generated.stored {
                Virtuality::Stored
            } else {
                Virtuality::Virtual
            };
            column = column.generated(virtuality, &generated.expression);
        }
        Ok(column)
    }

    fn from_column(column: &Column) -> Self {
        Self {
            id: persisted_id(column.id),
            name: column.name.clone(),
            datatype: column.datatype.name.to_string(),
            nullable: column.is_nullable,
            default: column.server_default.clone(),
            auto_increment: column.is_auto_increment,
            length: column.length,
            precision: column.numeric_precision,
            scale: column.numeric_scale,
            values: column.set.clone(),
            unsigned: column.is_unsigned,
            zerofill: column.is_zerofill,
            collation: column.collation.clone(),
            generated: column.expression.as_ref().map(|expression| GeneratedDefinition {
                expression: expression.clone(),
                stored: column.virtuality == Some(Virtuality::Stored),
            }),
            check: column.check.clone(),
        }
    }
}

impl IndexDefinition {
    fn resolve(&self, context: &dyn DialectContext, id: EntityId) -> Result<Index> {
        let index_type = context.index_types().get_by_name(&self.index_type)?;
        let mut index = if self.expressions.is_empty() {
            Index::new(id, &self.name, index_type, self.columns.iter().map(String::as_str))
        } else {
            Index::on_expressions(id, &self.name, index_type, self.expressions.iter().map(String::as_str))
        };
        if let Some(condition) = &self.condition {
            index = index.condition(condition);
        }
        if self.constraint {
            index = index.constraint();
        }
        Ok(index)
    }

    fn from_index(index: &Index) -> Self {
        Self {
            id: persisted_id(index.id),
            name: index.name.clone(),
            index_type: index.index_type.name.to_string(),
            columns: index.columns.clone(),
            expressions: index.expression.clone(),
            condition: index.condition.clone(),
            constraint: index.is_constraint() && !index.is_primary(),
        }
    }
}

impl ForeignKeyDefinition {
    fn resolve(&self, id: EntityId) -> Result<ForeignKey> {
        let mut fk = ForeignKey::new(id, &self.name, "", &self.references, "");
        fk.columns.clone_from(&self.columns);
        fk.reference_columns.clone_from(&self.reference_columns);
        Ok(fk
            .on_update(action(self.on_update.as_deref())?)
            .on_delete(action(self.on_delete.as_deref())?))
    }
}
