//! Foreign keys and check constraints.

use crate::error::ValidationIssue;
use crate::id::{EntityId, Identified};

/// Referential action for `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReferentialAction {
    /// No action (error if referenced row is deleted/updated).
    #[default]
    NoAction,
    /// Restrict (same as `NoAction` but checked immediately).
    Restrict,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the referencing column to NULL.
    SetNull,
    /// Set the referencing column to its default value.
    SetDefault,
}

impl ReferentialAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses an action as reported by a database catalog.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "NO ACTION" | "" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Identity.
    pub id: EntityId,
    /// Constraint name.
    pub name: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub reference_table: String,
    /// Referenced columns.
    pub reference_columns: Vec<String>,
    /// Action on update.
    pub on_update: ReferentialAction,
    /// Action on delete.
    pub on_delete: ReferentialAction,
}

impl ForeignKey {
    /// Creates a single-column foreign key with `NO ACTION` semantics.
    #[must_use]
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        column: impl Into<String>,
        reference_table: impl Into<String>,
        reference_column: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            columns: vec![column.into()],
            reference_table: reference_table.into(),
            reference_columns: vec![reference_column.into()],
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::NoAction,
        }
    }

    /// Sets the `ON DELETE` action.
    #[must_use]
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Sets the `ON UPDATE` action.
    #[must_use]
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    /// Collects everything that keeps this foreign key from being valid.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let entity = format!("foreign key \"{}\"", self.name);
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::new(&entity, "name is empty"));
        }
        if self.columns.is_empty() {
            issues.push(ValidationIssue::new(&entity, "has no columns"));
        }
        if self.reference_table.trim().is_empty() {
            issues.push(ValidationIssue::new(&entity, "has no referenced table"));
        }
        if self.reference_columns.is_empty() {
            issues.push(ValidationIssue::new(&entity, "has no referenced columns"));
        }
        if !self.columns.is_empty()
            && !self.reference_columns.is_empty()
            && self.columns.len() != self.reference_columns.len()
        {
            issues.push(ValidationIssue::new(
                &entity,
                "column count differs from referenced column count",
            ));
        }
        issues
    }

    /// Returns `true` if the foreign key is valid on its own.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

impl Identified for ForeignKey {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// A table-level check constraint. Anonymous checks have no name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// Identity.
    pub id: EntityId,
    /// Constraint name.
    pub name: Option<String>,
    /// Boolean expression.
    pub expression: String,
}

impl Check {
    /// Creates a named check.
    #[must_use]
    pub fn named(id: EntityId, name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            expression: expression.into(),
        }
    }

    /// Creates an anonymous check.
    #[must_use]
    pub fn anonymous(id: EntityId, expression: impl Into<String>) -> Self {
        Self {
            id,
            name: None,
            expression: expression.into(),
        }
    }

    /// Collects everything that keeps this check from being valid.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let entity = match &self.name {
            Some(name) => format!("check \"{name}\""),
            None => "anonymous check".to_string(),
        };
        let mut issues = Vec::new();
        if self.expression.trim().is_empty() {
            issues.push(ValidationIssue::new(&entity, "expression is empty"));
        }
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            issues.push(ValidationIssue::new(&entity, "name is empty"));
        }
        issues
    }
}

impl Identified for Check {
    fn id(&self) -> EntityId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_round_trip_through_catalog_spelling() {
        assert_eq!(
            ReferentialAction::parse("set_null"),
            Some(ReferentialAction::SetNull)
        );
        assert_eq!(
            ReferentialAction::parse("CASCADE"),
            Some(ReferentialAction::Cascade)
        );
        assert_eq!(ReferentialAction::parse("bogus"), None);
        assert_eq!(ReferentialAction::SetDefault.as_sql(), "SET DEFAULT");
    }

    #[test]
    fn foreign_key_requires_all_parts() {
        let fk = ForeignKey::new(EntityId::Pending(-1), "fk", "user_id", "users", "id");
        assert!(fk.is_valid());

        let mut broken = fk.clone();
        broken.reference_columns.clear();
        assert!(!broken.is_valid());

        let mut mismatched = fk;
        mismatched.columns.push("tenant_id".into());
        assert!(!mismatched.is_valid());
    }

    #[test]
    fn anonymous_checks_are_allowed() {
        let check = Check::anonymous(EntityId::Pending(-1), "price > 0");
        assert!(check.validate().is_empty());
        let empty = Check::named(EntityId::Pending(-2), "positive", " ");
        assert_eq!(empty.validate().len(), 1);
    }
}
