//! Column definitions.

use crate::catalog::{Datatype, quote_literal};
use crate::error::ValidationIssue;
use crate::id::{EntityId, Identified};

/// How a generated column's value is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Virtuality {
    /// Computed on read.
    Virtual,
    /// Computed on write and stored.
    Stored,
}

impl Virtuality {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Virtual => "VIRTUAL",
            Self::Stored => "STORED",
        }
    }
}

/// A column of a table.
///
/// Whether the column is part of the primary key or a unique key is not
/// stored here; see [`Table::is_primary_key`](super::Table::is_primary_key)
/// and [`Table::is_unique_key`](super::Table::is_unique_key).
#[derive(Debug, Clone)]
pub struct Column {
    /// Identity, stable across an edit session.
    pub id: EntityId,
    /// Zero-based ordinal within the owning table.
    pub position: usize,
    /// Column name.
    pub name: String,
    /// Scalar type.
    pub datatype: Datatype,
    /// Accepts NULL.
    pub is_nullable: bool,
    /// Default as a SQL expression (e.g. `'x'`, `0`, `CURRENT_TIMESTAMP`).
    pub server_default: Option<String>,
    /// Values are assigned by the database.
    pub is_auto_increment: bool,
    /// Length for types with `has_length`.
    pub length: Option<u32>,
    /// Precision for types with `has_precision`.
    pub numeric_precision: Option<u32>,
    /// Scale for types with `has_scale`.
    pub numeric_scale: Option<u32>,
    /// Allowed values for types with `has_set`.
    pub set: Vec<String>,
    /// `UNSIGNED` for types with `has_unsigned`.
    pub is_unsigned: bool,
    /// `ZEROFILL` for types with `has_zerofill`.
    pub is_zerofill: bool,
    /// Collation for types with `has_collation`.
    pub collation: Option<String>,
    /// Set for generated columns.
    pub virtuality: Option<Virtuality>,
    /// Generation expression.
    pub expression: Option<String>,
    /// Inline `CHECK` expression.
    pub check: Option<String>,
}

impl Column {
    /// Creates a nullable column with no default.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, datatype: Datatype) -> Self {
        Self {
            id,
            position: 0,
            name: name.into(),
            datatype,
            is_nullable: true,
            server_default: None,
            is_auto_increment: false,
            length: None,
            numeric_precision: None,
            numeric_scale: None,
            set: Vec::new(),
            is_unsigned: false,
            is_zerofill: false,
            collation: None,
            virtuality: None,
            expression: None,
            check: None,
        }
    }

    /// Returns a copy with a different name.
    #[must_use]
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns a copy with a different type; type parameters are cleared.
    #[must_use]
    pub fn retyped(mut self, datatype: Datatype) -> Self {
        self.datatype = datatype;
        self.length = None;
        self.numeric_precision = None;
        self.numeric_scale = None;
        self.set.clear();
        self
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    /// Sets the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.server_default = Some(expr.into());
        self
    }

    /// Sets a quoted string default.
    #[must_use]
    pub fn default_text(self, text: &str) -> Self {
        self.default_expr(quote_literal(text))
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    /// Sets the length.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets precision and scale.
    #[must_use]
    pub fn precision(mut self, precision: u32, scale: Option<u32>) -> Self {
        self.numeric_precision = Some(precision);
        self.numeric_scale = scale;
        self
    }

    /// Sets the allowed values.
    #[must_use]
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set = values.into_iter().map(Into::into).collect();
        self
    }

    /// Sets `UNSIGNED`.
    #[must_use]
    pub fn unsigned(mut self) -> Self {
        self.is_unsigned = true;
        self
    }

    /// Sets `ZEROFILL`.
    #[must_use]
    pub fn zerofill(mut self) -> Self {
        self.is_zerofill = true;
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collate(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Makes this a generated column.
    #[must_use]
    pub fn generated(mut self, virtuality: Virtuality, expression: impl Into<String>) -> Self {
        self.virtuality = Some(virtuality);
        self.expression = Some(expression.into());
        self
    }

    /// Sets an inline check constraint.
    #[must_use]
    pub fn check(mut self, expression: impl Into<String>) -> Self {
        self.check = Some(expression.into());
        self
    }

    /// Returns `true` for generated columns.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.virtuality.is_some()
    }

    /// Renders the type parameters: the length, else the precision, else the
    /// value set. `,scale` is appended whenever the type has a scale and one
    /// is set, whichever branch rendered; validation refuses a scale without a
    /// precision.
    ///
    /// Set values are kept bare and quoted here exactly once, so `'on'` and
    /// `on` both render as `'on'`. The surrounding quotes are stripped first
    /// because an unquoted member would not be a valid `ENUM`/`SET` item.
    #[must_use]
    pub fn length_scale_set(&self) -> String {
        let flags = self.datatype.flags;
        let mut out = if flags.has_length {
            self.length.map(|l| l.to_string()).unwrap_or_default()
        } else if flags.has_precision {
            self.numeric_precision
                .map(|p| p.to_string())
                .unwrap_or_default()
        } else if flags.has_set {
            self.set
                .iter()
                .map(|v| quote_literal(v.trim().trim_matches('\'').trim_matches('"')))
                .collect::<Vec<_>>()
                .join(",")
        } else {
            String::new()
        };
        if flags.has_scale {
            if let Some(scale) = self.numeric_scale {
                out.push(',');
                out.push_str(&scale.to_string());
            }
        }
        out
    }

    /// Renders the full type, e.g. `VARCHAR(255)` or `DECIMAL(10,2)`.
    #[must_use]
    pub fn type_sql(&self) -> String {
        let params = self.length_scale_set();
        if params.is_empty() {
            self.datatype.name.to_string()
        } else {
            format!("{}({})", self.datatype.name, params)
        }
    }

    /// Returns `true` if the type definition (type, parameters, modifiers,
    /// collation) differs from `other`.
    #[must_use]
    pub fn type_differs(&self, other: &Self) -> bool {
        self.datatype.name != other.datatype.name
            || self.length_scale_set() != other.length_scale_set()
            || self.is_unsigned != other.is_unsigned
            || self.is_zerofill != other.is_zerofill
            || self.collation != other.collation
    }

    /// Collects everything that keeps this column from being valid.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let entity = format!("column \"{}\"", self.name);
        let mut issues = Vec::new();
        let flags = self.datatype.flags;

        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::new(&entity, "name is empty"));
        } else if self.name.chars().any(char::is_whitespace) {
            issues.push(ValidationIssue::new(&entity, "name contains whitespace"));
        }
        let required = !flags.params_optional;
        if required && flags.has_length && self.length.is_none() {
            issues.push(ValidationIssue::new(
                &entity,
                format!("{} requires a length", self.datatype.name),
            ));
        }
        if required && flags.has_precision && self.numeric_precision.is_none() {
            issues.push(ValidationIssue::new(
                &entity,
                format!("{} requires a precision", self.datatype.name),
            ));
        }
        match (self.numeric_precision, self.numeric_scale) {
            (Some(p), Some(s)) if s > p => {
                issues.push(ValidationIssue::new(&entity, "scale exceeds precision"));
            }
            (None, Some(_)) => {
                issues.push(ValidationIssue::new(&entity, "scale given without a precision"));
            }
            _ => {}
        }
        if required && flags.has_set && self.set.is_empty() {
            issues.push(ValidationIssue::new(
                &entity,
                format!("{} requires a set of values", self.datatype.name),
            ));
        }
        if self.is_unsigned && !flags.has_unsigned {
            issues.push(ValidationIssue::new(
                &entity,
                format!("{} cannot be UNSIGNED", self.datatype.name),
            ));
        }
        if self.is_zerofill && !flags.has_zerofill {
            issues.push(ValidationIssue::new(
                &entity,
                format!("{} cannot be ZEROFILL", self.datatype.name),
            ));
        }
        if self.collation.is_some() && !flags.has_collation {
            issues.push(ValidationIssue::new(
                &entity,
                format!("{} does not take a collation", self.datatype.name),
            ));
        }
        if self.is_auto_increment && !self.datatype.is_integer() {
            issues.push(ValidationIssue::new(
                &entity,
                "only integer columns can auto-increment",
            ));
        }
        match (&self.virtuality, &self.expression) {
            (Some(_), None) => {
                issues.push(ValidationIssue::new(
                    &entity,
                    "generated column has no expression",
                ));
            }
            (None, Some(_)) => {
                issues.push(ValidationIssue::new(
                    &entity,
                    "expression given for a column that is not generated",
                ));
            }
            _ => {}
        }
        if self.is_generated() && (self.server_default.is_some() || self.is_auto_increment) {
            issues.push(ValidationIssue::new(
                &entity,
                "generated column cannot have a default or auto-increment",
            ));
        }
        issues
    }

    /// Returns `true` if the column is valid on its own.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Position is derived from the owning table's column order.
impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.datatype == other.datatype
            && self.is_nullable == other.is_nullable
            && self.server_default == other.server_default
            && self.is_auto_increment == other.is_auto_increment
            && self.length == other.length
            && self.numeric_precision == other.numeric_precision
            && self.numeric_scale == other.numeric_scale
            && self.set == other.set
            && self.is_unsigned == other.is_unsigned
            && self.is_zerofill == other.is_zerofill
            && self.collation == other.collation
            && self.virtuality == other.virtuality
            && self.expression == other.expression
            && self.check == other.check
    }
}

impl Eq for Column {}

impl Identified for Column {
    fn id(&self) -> EntityId {
        self.id
    }
}
