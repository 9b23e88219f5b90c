//! Index definitions.

use crate::catalog::IndexType;
use crate::error::ValidationIssue;
use crate::id::{EntityId, Identified};

/// Where an index comes from.
///
/// Constraint-backed indexes are created implicitly by a `PRIMARY KEY` or
/// `UNIQUE` table constraint and can only be removed by removing the
/// constraint. Introspection fills this in from catalog metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexOrigin {
    /// Created with `CREATE INDEX`.
    #[default]
    Explicit,
    /// Backs a table constraint.
    Constraint,
}

/// An index on a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Identity.
    pub id: EntityId,
    /// Index name.
    pub name: String,
    /// Kind.
    pub index_type: IndexType,
    /// Indexed column names, in key order.
    pub columns: Vec<String>,
    /// Partial-index predicate.
    pub condition: Option<String>,
    /// Expression key parts, used instead of `columns`.
    pub expression: Vec<String>,
    /// How the index came to exist.
    pub origin: IndexOrigin,
}

impl Index {
    /// Creates an index over `columns`.
    #[must_use]
    pub fn new<I, S>(id: EntityId, name: impl Into<String>, index_type: IndexType, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origin = if index_type.is_primary {
            IndexOrigin::Constraint
        } else {
            IndexOrigin::Explicit
        };
        Self {
            id,
            name: name.into(),
            index_type,
            columns: columns.into_iter().map(Into::into).collect(),
            condition: None,
            expression: Vec::new(),
            origin,
        }
    }

    /// Creates an index over expressions.
    #[must_use]
    pub fn on_expressions<I, S>(
        id: EntityId,
        name: impl Into<String>,
        index_type: IndexType,
        expression: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new(id, name, index_type, Vec::<String>::new());
        index.expression = expression.into_iter().map(Into::into).collect();
        index
    }

    /// Sets the partial-index predicate.
    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Marks the index as backing a table constraint.
    #[must_use]
    pub fn constraint(mut self) -> Self {
        self.origin = IndexOrigin::Constraint;
        self
    }

    /// Returns `true` for the primary key.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.index_type.is_primary
    }

    /// Returns `true` if the index backs a table constraint.
    #[must_use]
    pub fn is_constraint(&self) -> bool {
        self.origin == IndexOrigin::Constraint || self.is_primary()
    }

    /// Returns `true` if the index covers `column`.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Collects everything that keeps this index from being valid.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let entity = format!("index \"{}\"", self.name);
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::new(&entity, "name is empty"));
        }
        match (self.columns.is_empty(), self.expression.is_empty()) {
            (true, true) => issues.push(ValidationIssue::new(
                &entity,
                "needs at least one column or expression",
            )),
            (false, false) => issues.push(ValidationIssue::new(
                &entity,
                "cannot mix plain columns and expressions",
            )),
            _ => {}
        }
        if !self.expression.is_empty() && !self.index_type.enable_expression {
            issues.push(ValidationIssue::new(
                &entity,
                format!("{} indexes do not accept expressions", self.index_type.name),
            ));
        }
        if self.condition.is_some() && !self.index_type.enable_condition {
            issues.push(ValidationIssue::new(
                &entity,
                format!("{} indexes do not accept a condition", self.index_type.name),
            ));
        }
        issues
    }

    /// Returns `true` if the index is valid on its own.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

impl Identified for Index {
    fn id(&self) -> EntityId {
        self.id
    }
}
