use std::collections::HashSet;
use std::sync::OnceLock;

use dbkit_core::dialect::{Dialect, TypeRendering};
use dbkit_core::ir::{ColumnType, IntegerWidth};

/// PostgreSQL `Dialect`: double-quoted identifiers, sequentially
/// numbered `$n` placeholders, `SERIAL`/`BIGSERIAL` pseudo-types in
/// place of a trailing auto-increment clause, and a `CHECK` constraint
/// standing in for MySQL's native unsigned integers (spec.md §4.C1).
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

const RESERVED_WORDS: &[&str] = &[
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC",
    "BOTH", "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE",
    "CURRENT_CATALOG", "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "DEFAULT", "DEFERRABLE", "DESC",
    "DISTINCT", "DO", "ELSE", "END", "EXCEPT", "FALSE", "FETCH", "FOR", "FOREIGN",
    "FROM", "GRANT", "GROUP", "HAVING", "IN", "INITIALLY", "INTERSECT", "INTO",
    "LATERAL", "LEADING", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NOT", "NULL",
    "OFFSET", "ON", "ONLY", "OR", "ORDER", "PLACING", "PRIMARY", "REFERENCES",
    "RETURNING", "SELECT", "SESSION_USER", "SOME", "SYMMETRIC", "TABLE", "THEN",
    "TO", "TRAILING", "TRUE", "UNION", "UNIQUE", "USER", "USING", "VARIADIC",
    "WHEN", "WHERE", "WINDOW", "WITH",
];

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_ident(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn param_marker(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn reserved_words(&self) -> &HashSet<&'static str> {
        static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
        WORDS.get_or_init(|| RESERVED_WORDS.iter().copied().collect())
    }

    fn max_identifier_len(&self) -> usize {
        63
    }

    fn map_type(&self, column_type: &ColumnType) -> TypeRendering {
        match column_type {
            ColumnType::Integer { bits, unsigned } => {
                let base = match bits {
                    IntegerWidth::TinyInt | IntegerWidth::SmallInt => "SMALLINT",
                    IntegerWidth::Int => "INTEGER",
                    IntegerWidth::BigInt => "BIGINT",
                };
                if *unsigned {
                    TypeRendering::with_check(base, "CHECK (\"__COLUMN__\" >= 0)")
                } else {
                    TypeRendering::plain(base)
                }
            }
            ColumnType::Varchar { length } => TypeRendering::plain(format!("VARCHAR({length})")),
            ColumnType::Char { length } => TypeRendering::plain(format!("CHAR({length})")),
            ColumnType::Text { .. } => TypeRendering::plain("TEXT"),
            ColumnType::Decimal { precision, scale } => {
                TypeRendering::plain(format!("NUMERIC({precision},{scale})"))
            }
            ColumnType::Float => TypeRendering::plain("REAL"),
            ColumnType::Double => TypeRendering::plain("DOUBLE PRECISION"),
            ColumnType::Boolean => TypeRendering::plain("BOOLEAN"),
            ColumnType::Date => TypeRendering::plain("DATE"),
            ColumnType::Time { precision } => TypeRendering::plain(match precision {
                Some(p) => format!("TIME({p})"),
                None => "TIME".to_string(),
            }),
            ColumnType::Timestamp { precision } => TypeRendering::plain(match precision {
                Some(p) => format!("TIMESTAMP({p})"),
                None => "TIMESTAMP".to_string(),
            }),
            ColumnType::Json => TypeRendering::plain("JSON"),
            ColumnType::Jsonb => TypeRendering::plain("JSONB"),
            ColumnType::Uuid => TypeRendering::plain("UUID"),
            ColumnType::Ip => TypeRendering::plain("INET"),
            ColumnType::Mac => TypeRendering::plain("MACADDR"),
            ColumnType::Binary { .. } => TypeRendering::plain("BYTEA"),
            ColumnType::Enum { values } | ColumnType::Set { values } => {
                // Postgres has no inline ENUM/SET literal syntax; callers
                // create a named enum type separately and reference it here.
                let _ = values;
                TypeRendering::plain("TEXT")
            }
            ColumnType::Array { element } => {
                let inner = self.map_type(element);
                TypeRendering::plain(format!("{}[]", inner.sql))
            }
        }
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        None
    }

    fn auto_increment_type_override(&self, bits: &IntegerWidth) -> Option<&'static str> {
        Some(match bits {
            IntegerWidth::TinyInt | IntegerWidth::SmallInt => "SMALLSERIAL",
            IntegerWidth::Int => "SERIAL",
            IntegerWidth::BigInt => "BIGSERIAL",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_with_double_quotes() {
        assert_eq!(PostgresDialect.quote_ident("order"), "\"order\"");
        assert_eq!(PostgresDialect.quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn placeholders_are_sequentially_numbered() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.param_marker(0), "$1");
        assert_eq!(dialect.param_marker(1), "$2");
    }

    #[test]
    fn unsigned_integer_gets_a_check_constraint() {
        let rendering = PostgresDialect.map_type(&ColumnType::Integer { bits: IntegerWidth::Int, unsigned: true });
        assert_eq!(rendering.sql, "INTEGER");
        assert!(rendering.trailing_check.is_some());
    }

    #[test]
    fn auto_increment_uses_serial_pseudo_type() {
        assert_eq!(PostgresDialect.auto_increment_clause(), None);
        assert_eq!(PostgresDialect.auto_increment_type_override(&IntegerWidth::BigInt), Some("BIGSERIAL"));
    }
}
