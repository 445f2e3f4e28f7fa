use dbkit_core::dialect::Dialect;
use dbkit_core::ir::{ColumnType, IntegerWidth};
use dbkit_dialect_mysql::MysqlDialect;

#[test]
fn reserved_words_reject_common_keywords() {
    let dialect = MysqlDialect;
    for word in ["select", "Table", "ORDER", "group"] {
        assert!(dialect.is_reserved_word(word), "{word} should be reserved");
    }
    assert!(!dialect.is_reserved_word("widgets"));
}

#[test]
fn limit_offset_uses_comma_form() {
    let dialect = MysqlDialect;
    assert_eq!(dialect.limit_offset_clause(Some(10), None).as_deref(), Some("LIMIT 0, 10"));
    assert_eq!(dialect.limit_offset_clause(Some(10), Some(20)).as_deref(), Some("LIMIT 20, 10"));
    assert_eq!(dialect.limit_offset_clause(None, Some(20)), None);
}

#[test]
fn big_int_unsigned_has_no_trailing_check() {
    let dialect = MysqlDialect;
    let rendering = dialect.map_type(&ColumnType::Integer { bits: IntegerWidth::BigInt, unsigned: true });
    assert_eq!(rendering.sql, "BIGINT UNSIGNED");
    assert!(rendering.trailing_check.is_none());
}
