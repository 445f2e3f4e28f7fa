use dbkit_core::dialect::Dialect;
use dbkit_core::ir::{ColumnType, IntegerWidth};
use dbkit_dialect_postgres::PostgresDialect;

#[test]
fn reserved_words_reject_common_keywords() {
    let dialect = PostgresDialect;
    for word in ["select", "Table", "WHERE", "group"] {
        assert!(dialect.is_reserved_word(word), "{word} should be reserved");
    }
    assert!(!dialect.is_reserved_word("widgets"));
}

#[test]
fn limit_offset_uses_ansi_form() {
    let dialect = PostgresDialect;
    assert_eq!(dialect.limit_offset_clause(Some(10), None).as_deref(), Some("LIMIT 10"));
    assert_eq!(dialect.limit_offset_clause(Some(10), Some(20)).as_deref(), Some("LIMIT 10 OFFSET 20"));
    assert_eq!(dialect.limit_offset_clause(None, Some(20)), None);
}

#[test]
fn unsigned_big_int_gets_a_check_constraint() {
    let dialect = PostgresDialect;
    let rendering = dialect.map_type(&ColumnType::Integer { bits: IntegerWidth::BigInt, unsigned: true });
    assert_eq!(rendering.sql, "BIGINT");
    assert_eq!(rendering.trailing_check.as_deref(), Some("CHECK (\"__COLUMN__\" >= 0)"));
}
