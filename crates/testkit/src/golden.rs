//! Golden-DDL assertions: compare generated SQL against an expected
//! literal with whitespace normalized, so fixtures can be written on
//! multiple lines without chasing exact spacing.

/// Collapses runs of whitespace to a single space and trims the ends,
/// so `"CREATE TABLE  foo (\n  id BIGINT\n)"` compares equal to
/// `"CREATE TABLE foo (id BIGINT)"`.
#[must_use]
pub fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Asserts `actual` matches `expected` once both are whitespace-normalized,
/// panicking with both the raw and normalized forms on mismatch.
pub fn assert_ddl_eq(dialect: &str, actual: &str, expected: &str) {
    let actual_normalized = normalize_sql(actual);
    let expected_normalized = normalize_sql(expected);
    assert_eq!(
        actual_normalized, expected_normalized,
        "DDL mismatch for dialect `{dialect}`\n  actual:   {actual}\n  expected: {expected}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_sql_collapses_whitespace() {
        assert_eq!(normalize_sql("CREATE  TABLE\nfoo (\n id BIGINT\n)"), "CREATE TABLE foo ( id BIGINT )");
    }

    #[test]
    fn assert_ddl_eq_ignores_formatting_differences() {
        assert_ddl_eq("plain", "CREATE TABLE foo (id BIGINT)", "CREATE TABLE\nfoo (\n  id BIGINT\n)");
    }

    #[test]
    #[should_panic(expected = "DDL mismatch")]
    fn assert_ddl_eq_panics_on_real_mismatch() {
        assert_ddl_eq("plain", "CREATE TABLE foo (id BIGINT)", "CREATE TABLE bar (id BIGINT)");
    }
}
