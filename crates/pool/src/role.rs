/// Which half of a pool a statement should run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Read,
    Write,
}

const WRITE_VERBS: &[&str] =
    &["INSERT", "UPDATE", "DELETE", "REPLACE", "CREATE", "DROP", "ALTER", "TRUNCATE"];

/// Classifies `sql` by its leading verb (spec.md §4.C4). Anything not in
/// the write-verb set, including `SELECT`, `SHOW`, `EXPLAIN` and CTEs
/// that open with `WITH`, routes to a read connection.
#[must_use]
pub fn route(sql: &str) -> Role {
    let trimmed = sql.trim_start();
    let verb_end = trimmed.find(|c: char| c.is_whitespace() || c == '(').unwrap_or(trimmed.len());
    let verb = trimmed[..verb_end].to_ascii_uppercase();
    if WRITE_VERBS.contains(&verb.as_str()) {
        Role::Write
    } else {
        Role::Read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_and_with_route_to_read() {
        assert_eq!(route("SELECT * FROM widgets"), Role::Read);
        assert_eq!(route("  with cte as (select 1) select * from cte"), Role::Read);
        assert_eq!(route("SHOW TABLES"), Role::Read);
    }

    #[test]
    fn mutating_verbs_route_to_write() {
        for sql in ["INSERT INTO t VALUES (1)", "update t set a=1", "DELETE FROM t", "ALTER TABLE t ADD x INT"] {
            assert_eq!(route(sql), Role::Write, "{sql} should route to write");
        }
    }
}
