use std::collections::HashSet;

use crate::ir::ColumnType;

/// Rendering of a logical column type for a specific dialect: the DDL
/// fragment plus any trailing constraint a dialect needs to preserve the
/// semantics of a type it has no direct equivalent for (spec.md §4.C1:
/// `INT UNSIGNED` has no PostgreSQL equivalent and is mapped to
/// `INTEGER` with a `CHECK` on non-negative values).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRendering {
    pub sql: String,
    /// A trailing `CHECK (...)` clause. `__COLUMN__` is substituted with
    /// the column's quoted identifier when the DDL is assembled, since
    /// `map_type` has no column name to work with.
    pub trailing_check: Option<String>,
}

impl TypeRendering {
    #[must_use]
    pub fn plain(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), trailing_check: None }
    }

    #[must_use]
    pub fn with_check(sql: impl Into<String>, check: impl Into<String>) -> Self {
        Self { sql: sql.into(), trailing_check: Some(check.into()) }
    }
}

/// Parameterizes every SQL-emitting component with dialect-specific
/// identifier quoting, placeholder style, reserved words, identifier
/// limits, and type mapping. No other component may hard-code a quote
/// character or placeholder style (spec.md §4.C1).
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_ident(&self, identifier: &str) -> String;

    /// Placeholder for the `index`-th bound parameter (0-based). MySQL
    /// always renders `?`; PostgreSQL may render `$n` at render time if
    /// the driver requires positional markers.
    fn param_marker(&self, index: usize) -> String;

    fn reserved_words(&self) -> &HashSet<&'static str>;

    fn is_reserved_word(&self, identifier: &str) -> bool {
        let upper = identifier.to_ascii_uppercase();
        self.reserved_words().contains(upper.as_str())
    }

    fn max_identifier_len(&self) -> usize;

    fn map_type(&self, column_type: &ColumnType) -> TypeRendering;

    /// Spelling of the auto-increment clause for the given integer width
    /// (`AUTO_INCREMENT` for MySQL; `None` for dialects that express
    /// auto-increment entirely through [`Dialect::auto_increment_type_override`]).
    fn auto_increment_clause(&self) -> Option<&'static str>;

    /// Pseudo-type that replaces the rendered base type for an
    /// auto-increment integer column, for dialects with no trailing
    /// clause (spec.md §4.C1: PostgreSQL's `SERIAL`/`BIGSERIAL` replace
    /// `INTEGER`/`BIGINT` entirely rather than appending a keyword).
    fn auto_increment_type_override(&self, bits: &crate::ir::IntegerWidth) -> Option<&'static str> {
        let _ = bits;
        None
    }

    /// Render a string literal safely for embedding in a DDL default.
    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Render the `LIMIT`/`OFFSET` tail of a SELECT. MySQL favors the
    /// classic two-argument form (`LIMIT offset, count`); PostgreSQL
    /// renders the ANSI `LIMIT n OFFSET m` form, omitting `OFFSET` when
    /// it is zero.
    fn limit_offset_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        let limit = limit?;
        let offset = offset.unwrap_or(0);
        if offset > 0 {
            Some(format!("LIMIT {limit} OFFSET {offset}"))
        } else {
            Some(format!("LIMIT {limit}"))
        }
    }
}
