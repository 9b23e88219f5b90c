//! Index kinds.

use super::CatalogEntry;

/// A kind of index a dialect can create.
///
/// `enable_append` says whether an existing index of this kind may be
/// extended with one more column; `enable_condition` says whether it accepts
/// a `WHERE` predicate; `enable_expression` says whether its key parts may be
/// expressions instead of plain columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct IndexType {
    /// Name shown to users and used in definitions.
    pub name: &'static str,
    /// Word placed before `INDEX` in `CREATE ... INDEX` (may be empty).
    pub keyword: &'static str,
    /// Access method for `USING` (PostgreSQL).
    pub method: Option<&'static str>,
    /// The table's primary key.
    pub is_primary: bool,
    /// Enforces uniqueness.
    pub is_unique: bool,
    /// May be extended with another column.
    pub enable_append: bool,
    /// Accepts a partial-index predicate.
    pub enable_condition: bool,
    /// Accepts expression key parts.
    pub enable_expression: bool,
}

impl IndexType {
    const fn base(name: &'static str, keyword: &'static str) -> Self {
        Self {
            name,
            keyword,
            method: None,
            is_primary: false,
            is_unique: false,
            enable_append: false,
            enable_condition: false,
            enable_expression: false,
        }
    }

    /// The primary key.
    #[must_use]
    pub const fn primary() -> Self {
        let mut t = Self::base("PRIMARY", "UNIQUE");
        t.is_primary = true;
        t.is_unique = true;
        t.enable_append = true;
        t
    }

    /// A unique index.
    #[must_use]
    pub const fn unique() -> Self {
        let mut t = Self::base("UNIQUE", "UNIQUE");
        t.is_unique = true;
        t.enable_append = true;
        t
    }

    /// A plain index.
    #[must_use]
    pub const fn normal() -> Self {
        let mut t = Self::base("INDEX", "");
        t.enable_append = true;
        t
    }

    /// A plain index restricted by a predicate.
    #[must_use]
    pub const fn partial() -> Self {
        let mut t = Self::base("PARTIAL", "");
        t.enable_condition = true;
        t
    }

    /// An index over expressions.
    #[must_use]
    pub const fn expression() -> Self {
        let mut t = Self::base("EXPRESSION", "");
        t.enable_expression = true;
        t
    }

    /// A full-text index (MariaDB/MySQL).
    #[must_use]
    pub const fn fulltext() -> Self {
        Self::base("FULLTEXT", "FULLTEXT")
    }

    /// A spatial index (MariaDB/MySQL).
    #[must_use]
    pub const fn spatial() -> Self {
        Self::base("SPATIAL", "SPATIAL")
    }

    /// An index using a specific access method (PostgreSQL `USING`).
    #[must_use]
    pub const fn using(name: &'static str, method: &'static str) -> Self {
        let mut t = Self::base(name, "");
        t.method = Some(method);
        t.enable_condition = true;
        t.enable_expression = true;
        t
    }

    /// Allows a `WHERE` predicate.
    #[must_use]
    pub const fn with_condition(mut self) -> Self {
        self.enable_condition = true;
        self
    }

    /// Allows expression key parts.
    #[must_use]
    pub const fn with_expression(mut self) -> Self {
        self.enable_expression = true;
        self
    }
}

impl CatalogEntry for IndexType {
    const KIND: &'static str = "index type";

    fn name(&self) -> &'static str {
        self.name
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self.name {
            "PRIMARY" => &["PRIMARY KEY"],
            "INDEX" => &["NORMAL", "KEY"],
            _ => &[],
        }
    }
}

/// Index kinds shared by every dialect.
#[must_use]
pub fn standard_index_types() -> Vec<IndexType> {
    vec![
        IndexType::primary(),
        IndexType::unique(),
        IndexType::normal(),
    ]
}
