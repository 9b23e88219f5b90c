//! Scalar datatypes and literal formatting.

use chrono::{NaiveDate, NaiveDateTime};

use super::CatalogEntry;

/// Broad family a datatype belongs to. Declaration order is catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatatypeCategory {
    /// Character data.
    Text,
    /// Byte strings.
    Binary,
    /// Whole numbers.
    Integer,
    /// Floating point and fixed point numbers.
    Real,
    /// Geometry.
    Spatial,
    /// Dates, times and timestamps.
    Temporal,
    /// Everything else (booleans, JSON, UUID, enumerations).
    Other,
}

impl DatatypeCategory {
    /// Returns the category name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Binary => "BINARY",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Spatial => "SPATIAL",
            Self::Temporal => "TEMPORAL",
            Self::Other => "OTHER",
        }
    }

    const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }
}

/// Which optional parts a datatype's DDL rendering carries.
///
/// A type that has a part also requires it: a column of that type is not
/// valid until the corresponding field is populated, unless
/// `params_optional` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DatatypeFlags {
    /// `VARCHAR(255)`.
    pub has_length: bool,
    /// `DECIMAL(10)`.
    pub has_precision: bool,
    /// `DECIMAL(10,2)`.
    pub has_scale: bool,
    /// `ENUM('a','b')`.
    pub has_set: bool,
    /// Accepts `COLLATE`.
    pub has_collation: bool,
    /// Accepts `UNSIGNED`.
    pub has_unsigned: bool,
    /// Accepts `ZEROFILL`.
    pub has_zerofill: bool,
    /// Length, precision and value set may be left out (`VARCHAR` alone).
    pub params_optional: bool,
}

impl DatatypeFlags {
    /// Defaults implied by a category.
    #[must_use]
    pub const fn for_category(category: DatatypeCategory) -> Self {
        let numeric = category.is_numeric();
        Self {
            has_length: false,
            has_precision: false,
            has_scale: false,
            has_set: false,
            has_collation: matches!(category, DatatypeCategory::Text),
            has_unsigned: numeric,
            has_zerofill: numeric,
            params_optional: false,
        }
    }
}

/// How boolean values are written as literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanStyle {
    /// `1` / `0`.
    Digits,
    /// `TRUE` / `FALSE`.
    Keywords,
}

/// A scalar type registered in a dialect's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datatype {
    /// Canonical name as rendered in DDL.
    pub name: &'static str,
    /// Family.
    pub category: DatatypeCategory,
    /// Other names accepted on lookup.
    pub aliases: &'static [&'static str],
    /// Capability flags.
    pub flags: DatatypeFlags,
    /// Set for boolean types.
    pub boolean: Option<BooleanStyle>,
}

impl Datatype {
    /// Creates a datatype with the flags implied by its category.
    #[must_use]
    pub const fn new(name: &'static str, category: DatatypeCategory) -> Self {
        Self {
            name,
            category,
            aliases: &[],
            flags: DatatypeFlags::for_category(category),
            boolean: None,
        }
    }

    /// Sets the lookup aliases.
    #[must_use]
    pub const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    /// Requires a length.
    #[must_use]
    pub const fn with_length(mut self) -> Self {
        self.flags.has_length = true;
        self
    }

    /// Requires a precision and accepts a scale.
    #[must_use]
    pub const fn with_precision_scale(mut self) -> Self {
        self.flags.has_precision = true;
        self.flags.has_scale = true;
        self
    }

    /// Requires a set of allowed values.
    #[must_use]
    pub const fn with_set(mut self) -> Self {
        self.flags.has_set = true;
        self
    }

    /// Accepts `COLLATE` regardless of category.
    #[must_use]
    pub const fn with_collation(mut self) -> Self {
        self.flags.has_collation = true;
        self
    }

    /// Refuses `COLLATE`.
    #[must_use]
    pub const fn without_collation(mut self) -> Self {
        self.flags.has_collation = false;
        self
    }

    /// Refuses `UNSIGNED` and `ZEROFILL`.
    #[must_use]
    pub const fn signed_only(mut self) -> Self {
        self.flags.has_unsigned = false;
        self.flags.has_zerofill = false;
        self
    }

    /// Accepts the type without its length, precision or value set.
    #[must_use]
    pub const fn optional_params(mut self) -> Self {
        self.flags.params_optional = true;
        self
    }

    /// Marks the type as boolean.
    #[must_use]
    pub const fn boolean(mut self, style: BooleanStyle) -> Self {
        self.boolean = Some(style);
        self
    }

    /// Returns `true` for integer types (the only ones that can auto-increment).
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.category == DatatypeCategory::Integer && self.boolean.is_none()
    }

    /// Formats `value` as a SQL literal suitable for this type.
    ///
    /// Finite numbers pass through for numeric types, everything else is
    /// quoted. SQL has no literal for NaN or infinity, so a non-finite
    /// `Real` renders as `NULL`.
    /// Booleans are normalized to `1`/`0` unless the type spells them as
    /// keywords.
    #[must_use]
    pub fn format(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Raw(sql) => sql.clone(),
            Value::Bool(b) => match self.boolean {
                Some(BooleanStyle::Keywords) => if *b { "TRUE" } else { "FALSE" }.to_string(),
                _ => if *b { "1" } else { "0" }.to_string(),
            },
            Value::Integer(i) => {
                if self.boolean.is_some() {
                    return self.format(&Value::Bool(*i != 0));
                }
                if self.category.is_numeric() {
                    i.to_string()
                } else {
                    quote_literal(&i.to_string())
                }
            }
            Value::Real(f) if !f.is_finite() => "NULL".to_string(),
            Value::Real(f) => {
                if self.category.is_numeric() {
                    f.to_string()
                } else {
                    quote_literal(&f.to_string())
                }
            }
            Value::Text(s) => {
                if self.category.is_numeric() && s.trim().parse::<f64>().is_ok_and(f64::is_finite) {
                    s.trim().to_string()
                } else {
                    quote_literal(s)
                }
            }
            Value::Date(d) => quote_literal(&d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => quote_literal(&dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl CatalogEntry for Datatype {
    const KIND: &'static str = "datatype";

    fn name(&self) -> &'static str {
        self.name
    }

    fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    fn group(&self) -> u8 {
        self.category as u8
    }
}

/// A value to be rendered as a SQL literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `NULL`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Real(f64),
    /// Character data.
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without zone.
    DateTime(NaiveDateTime),
    /// SQL written verbatim (e.g. `CURRENT_TIMESTAMP`).
    Raw(String),
}

/// Quotes `s` as a single-quoted SQL string literal.
#[must_use]
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Types understood by every supported dialect.
#[must_use]
pub fn standard_datatypes() -> Vec<Datatype> {
    use DatatypeCategory::{Binary, Integer, Other, Real, Temporal, Text};
    vec![
        Datatype::new("VARCHAR", Text)
            .aliases(&["CHARACTER VARYING"])
            .with_length(),
        Datatype::new("CHAR", Text)
            .aliases(&["CHARACTER"])
            .with_length(),
        Datatype::new("TEXT", Text),
        Datatype::new("BLOB", Binary),
        Datatype::new("SMALLINT", Integer),
        Datatype::new("INTEGER", Integer).aliases(&["INT"]),
        Datatype::new("BIGINT", Integer),
        Datatype::new("REAL", Real),
        Datatype::new("DOUBLE PRECISION", Real).aliases(&["DOUBLE"]),
        Datatype::new("DECIMAL", Real).with_precision_scale(),
        Datatype::new("NUMERIC", Real).with_precision_scale(),
        Datatype::new("DATE", Temporal),
        Datatype::new("TIME", Temporal),
        Datatype::new("TIMESTAMP", Temporal),
        Datatype::new("BOOLEAN", Other)
            .aliases(&["BOOL"])
            .boolean(BooleanStyle::Digits),
    ]
}
