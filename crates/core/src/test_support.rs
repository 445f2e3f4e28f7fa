//! Test-only dialect fixtures shared across this crate's unit tests and,
//! via the `test-support` feature, the other workspace crates' tests.

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::dialect::{Dialect, TypeRendering};
use crate::ir::ColumnType;

/// A deliberately plain dialect: literal `?` markers, no identifier
/// quoting, MySQL-style comma `LIMIT offset, count`. Used by query
/// builder unit tests that only care about SQL shape, not a specific
/// real dialect's quoting rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainDialect;

impl Dialect for PlainDialect {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn quote_ident(&self, identifier: &str) -> String {
        identifier.to_string()
    }

    fn param_marker(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn reserved_words(&self) -> &HashSet<&'static str> {
        static EMPTY: OnceLock<HashSet<&'static str>> = OnceLock::new();
        EMPTY.get_or_init(HashSet::new)
    }

    fn max_identifier_len(&self) -> usize {
        64
    }

    fn map_type(&self, _column_type: &ColumnType) -> TypeRendering {
        TypeRendering::plain(String::new())
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
