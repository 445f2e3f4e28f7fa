use std::collections::HashSet;
use std::sync::OnceLock;

use dbkit_core::dialect::{Dialect, TypeRendering};
use dbkit_core::ir::{ColumnType, IntegerWidth, TextSize};

/// MySQL 8.0+ `Dialect`: backtick identifiers, literal `?` placeholders,
/// `AUTO_INCREMENT`, native unsigned integer types (spec.md §4.C1).
#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlDialect;

const RESERVED_WORDS: &[&str] = &[
    "ACCESSIBLE", "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC", "ASENSITIVE",
    "BEFORE", "BETWEEN", "BIGINT", "BINARY", "BLOB", "BOTH", "BY", "CALL", "CASCADE",
    "CASE", "CHANGE", "CHAR", "CHARACTER", "CHECK", "COLLATE", "COLUMN", "CONDITION",
    "CONSTRAINT", "CONTINUE", "CONVERT", "CREATE", "CROSS", "CURRENT_DATE",
    "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR", "DATABASE",
    "DATABASES", "DAY_HOUR", "DAY_MICROSECOND", "DAY_MINUTE", "DAY_SECOND", "DEC",
    "DECIMAL", "DECLARE", "DEFAULT", "DELAYED", "DELETE", "DESC", "DESCRIBE",
    "DETERMINISTIC", "DISTINCT", "DISTINCTROW", "DIV", "DOUBLE", "DROP", "DUAL",
    "EACH", "ELSE", "ELSEIF", "ENCLOSED", "ESCAPED", "EXISTS", "EXIT", "EXPLAIN",
    "FALSE", "FETCH", "FLOAT", "FLOAT4", "FLOAT8", "FOR", "FORCE", "FOREIGN", "FROM",
    "FULLTEXT", "GENERATED", "GRANT", "GROUP", "HAVING", "HIGH_PRIORITY",
    "HOUR_MICROSECOND", "HOUR_MINUTE", "HOUR_SECOND", "IF", "IGNORE", "IN", "INDEX",
    "INFILE", "INNER", "INOUT", "INSENSITIVE", "INSERT", "INT", "INT1", "INT2",
    "INT3", "INT4", "INT8", "INTEGER", "INTERVAL", "INTO", "IS", "ITERATE", "JOIN",
    "KEY", "KEYS", "KILL", "LEADING", "LEAVE", "LEFT", "LIKE", "LIMIT", "LINEAR",
    "LINES", "LOAD", "LOCALTIME", "LOCALTIMESTAMP", "LOCK", "LONG", "LONGBLOB",
    "LONGTEXT", "LOOP", "LOW_PRIORITY", "MASTER_SSL_VERIFY_SERVER_CERT", "MATCH",
    "MAXVALUE", "MEDIUMBLOB", "MEDIUMINT", "MEDIUMTEXT", "MIDDLEINT",
    "MINUTE_MICROSECOND", "MINUTE_SECOND", "MOD", "MODIFIES", "NATURAL", "NOT",
    "NO_WRITE_TO_BINLOG", "NULL", "NUMERIC", "ON", "OPTIMIZE", "OPTIMIZER_COSTS",
    "OPTION", "OPTIONALLY", "OR", "ORDER", "OUT", "OUTER", "OUTFILE", "PRECISION",
    "PRIMARY", "PROCEDURE", "PURGE", "RANGE", "READ", "READS", "READ_WRITE", "REAL",
    "REFERENCES", "REGEXP", "RELEASE", "RENAME", "REPEAT", "REPLACE", "REQUIRE",
    "RESIGNAL", "RESTRICT", "RETURN", "REVOKE", "RIGHT", "RLIKE", "SCHEMA",
    "SCHEMAS", "SECOND_MICROSECOND", "SELECT", "SENSITIVE", "SEPARATOR", "SET",
    "SHOW", "SIGNAL", "SMALLINT", "SPATIAL", "SPECIFIC", "SQL", "SQLEXCEPTION",
    "SQLSTATE", "SQLWARNING", "SQL_BIG_RESULT", "SQL_CALC_FOUND_ROWS",
    "SQL_SMALL_RESULT", "SSL", "STARTING", "STORED", "STRAIGHT_JOIN", "TABLE",
    "TERMINATED", "THEN", "TINYBLOB", "TINYINT", "TINYTEXT", "TO", "TRAILING",
    "TRIGGER", "TRUE", "UNDO", "UNION", "UNIQUE", "UNLOCK", "UNSIGNED", "UPDATE",
    "USAGE", "USE", "USING", "UTC_DATE", "UTC_TIME", "UTC_TIMESTAMP", "VALUES",
    "VARBINARY", "VARCHAR", "VARCHARACTER", "VARYING", "VIRTUAL", "WHEN", "WHERE",
    "WHILE", "WITH", "WRITE", "XOR", "YEAR_MONTH", "ZEROFILL",
];

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    fn param_marker(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn reserved_words(&self) -> &HashSet<&'static str> {
        static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
        WORDS.get_or_init(|| RESERVED_WORDS.iter().copied().collect())
    }

    fn max_identifier_len(&self) -> usize {
        64
    }

    fn map_type(&self, column_type: &ColumnType) -> TypeRendering {
        match column_type {
            ColumnType::Integer { bits, unsigned } => {
                let base = match bits {
                    IntegerWidth::TinyInt => "TINYINT",
                    IntegerWidth::SmallInt => "SMALLINT",
                    IntegerWidth::Int => "INT",
                    IntegerWidth::BigInt => "BIGINT",
                };
                let sql = if *unsigned { format!("{base} UNSIGNED") } else { base.to_string() };
                TypeRendering::plain(sql)
            }
            ColumnType::Varchar { length } => TypeRendering::plain(format!("VARCHAR({length})")),
            ColumnType::Char { length } => TypeRendering::plain(format!("CHAR({length})")),
            ColumnType::Text { size } => TypeRendering::plain(match size {
                TextSize::Tiny => "TINYTEXT".to_string(),
                TextSize::Regular => "TEXT".to_string(),
                TextSize::Medium => "MEDIUMTEXT".to_string(),
                TextSize::Long => "LONGTEXT".to_string(),
            }),
            ColumnType::Decimal { precision, scale } => {
                TypeRendering::plain(format!("DECIMAL({precision},{scale})"))
            }
            ColumnType::Float => TypeRendering::plain("FLOAT"),
            ColumnType::Double => TypeRendering::plain("DOUBLE"),
            ColumnType::Boolean => TypeRendering::plain("TINYINT(1)"),
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
            ColumnType::Jsonb => TypeRendering::plain("JSON"),
            ColumnType::Uuid => TypeRendering::plain("CHAR(36)"),
            ColumnType::Ip => TypeRendering::plain("VARCHAR(45)"),
            ColumnType::Mac => TypeRendering::plain("VARCHAR(17)"),
            ColumnType::Binary { length } => TypeRendering::plain(match length {
                Some(length) => format!("VARBINARY({length})"),
                None => "BLOB".to_string(),
            }),
            ColumnType::Enum { values } => {
                let rendered = values.iter().map(|v| format!("'{}'", v.replace('\'', "''"))).collect::<Vec<_>>().join(", ");
                TypeRendering::plain(format!("ENUM({rendered})"))
            }
            ColumnType::Set { values } => {
                let rendered = values.iter().map(|v| format!("'{}'", v.replace('\'', "''"))).collect::<Vec<_>>().join(", ");
                TypeRendering::plain(format!("SET({rendered})"))
            }
            ColumnType::Array { element } => {
                // MySQL has no native array type; JSON is the closest lossless
                // storage and round-trips through the driver's JSON codec.
                let _ = element;
                TypeRendering::plain("JSON")
            }
        }
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    fn limit_offset_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        let limit = limit?;
        let offset = offset.unwrap_or(0);
        Some(format!("LIMIT {offset}, {limit}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_with_backticks_and_escapes_embedded_ones() {
        assert_eq!(MysqlDialect.quote_ident("order"), "`order`");
        assert_eq!(MysqlDialect.quote_ident("a`b"), "`a``b`");
    }

    #[test]
    fn unsigned_integer_renders_with_suffix() {
        let rendering = MysqlDialect.map_type(&ColumnType::Integer { bits: IntegerWidth::Int, unsigned: true });
        assert_eq!(rendering.sql, "INT UNSIGNED");
        assert!(rendering.trailing_check.is_none());
    }

    #[test]
    fn reserved_word_check_is_case_insensitive() {
        assert!(MysqlDialect.is_reserved_word("Select"));
        assert!(!MysqlDialect.is_reserved_word("widgets"));
    }
}
