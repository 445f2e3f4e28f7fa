use crate::dialect::Dialect;
use crate::row::Value;

/// A raw SQL fragment with its own positional bindings, in textual
/// order. The `?` characters in `sql` are placeholders consumed
/// left-to-right and are dialect-independent: every fragment (a WHERE
/// condition, a rendered CASE, a window function call, an inlined
/// subquery) is built once with literal `?` markers, and only the
/// top-level statement renderer (`RenderContext`) substitutes the
/// dialect's real marker style as it assembles the final statement.
/// This keeps global parameter numbering correct for dialects such as
/// PostgreSQL that number placeholders (`$1`, `$2`, ...) across the
/// whole statement rather than per-clause.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl SqlFragment {
    #[must_use]
    pub fn new(sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        Self { sql: sql.into(), bindings }
    }

    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), bindings: Vec::new() }
    }

    #[must_use]
    pub fn wrapped_in_parens(mut self) -> Self {
        self.sql = format!("({})", self.sql);
        self
    }
}

/// Builds a [`SqlFragment`] using literal `?` placeholders, independent
/// of any dialect. Used by CASE and window-function rendering, which
/// never need identifier quoting.
#[derive(Debug, Default)]
pub struct FragmentWriter {
    sql: String,
    bindings: Vec<Value>,
}

impl FragmentWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    pub fn push_param(&mut self, value: Value) -> &mut Self {
        self.sql.push('?');
        self.bindings.push(value);
        self
    }

    #[must_use]
    pub fn finish(self) -> SqlFragment {
        SqlFragment::new(self.sql, self.bindings)
    }
}

/// Accumulates the final rendered SQL text and bindings for one
/// top-level statement, re-numbering each `?` placeholder it consumes
/// through the dialect. Because every binding is pushed alongside the
/// marker that refers to it, the placeholder count and `bindings.len()`
/// can never drift apart (spec.md §8 testable property #2).
pub struct RenderContext<'a> {
    pub dialect: &'a dyn Dialect,
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl<'a> RenderContext<'a> {
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect, sql: String::new(), bindings: Vec::new() }
    }

    pub fn push_str(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    pub fn push_param(&mut self, value: Value) {
        let marker = self.dialect.param_marker(self.bindings.len());
        self.sql.push_str(&marker);
        self.bindings.push(value);
    }

    /// Appends a fragment, replacing its `?` placeholders with
    /// dialect-correct markers and appending its bindings in order.
    pub fn push_fragment(&mut self, fragment: &SqlFragment) {
        let mut bindings = fragment.bindings.iter();
        for ch in fragment.sql.chars() {
            if ch == '?' {
                if let Some(value) = bindings.next() {
                    let marker = self.dialect.param_marker(self.bindings.len());
                    self.sql.push_str(&marker);
                    self.bindings.push(value.clone());
                    continue;
                }
            }
            self.sql.push(ch);
        }
    }

    #[must_use]
    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.bindings)
    }
}
