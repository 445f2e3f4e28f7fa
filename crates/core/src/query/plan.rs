use std::collections::HashSet;

use crate::dialect::{Dialect, TypeRendering};
use crate::ir::ColumnType;
use crate::row::Value;

use super::delete::DeletePlan;
use super::fragment::{RenderContext, SqlFragment};
use super::insert::InsertPlan;
use super::select::SelectPlan;
use super::update::UpdatePlan;

/// Discriminated union of the four statement shapes the Query Builder
/// produces (spec.md §3 QueryPlan). `to_sql`/`bindings` are pure
/// functions of this state for a given dialect (spec.md §4.C5
/// determinism; §8 testable property #1).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    Select(SelectPlan),
    Insert(InsertPlan),
    Update(UpdatePlan),
    Delete(DeletePlan),
}

impl QueryPlan {
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let mut ctx = RenderContext::new(dialect);
        self.render_into(&mut ctx);
        ctx.finish().0
    }

    #[must_use]
    pub fn bindings(&self, dialect: &dyn Dialect) -> Vec<Value> {
        let mut ctx = RenderContext::new(dialect);
        self.render_into(&mut ctx);
        ctx.finish().1
    }

    pub(super) fn render_into(&self, ctx: &mut RenderContext<'_>) {
        match self {
            Self::Select(plan) => plan.render(ctx),
            Self::Insert(plan) => plan.render(ctx),
            Self::Update(plan) => plan.render(ctx),
            Self::Delete(plan) => plan.render(ctx),
        }
    }

    /// Renders this plan with literal `?` placeholders regardless of
    /// dialect, for embedding as a subquery fragment inside a WHERE/
    /// HAVING term that was already captured as a [`SqlFragment`]
    /// (spec.md §4.C5: "a subquery is rendered into the parent by
    /// inlining its SQL wrapped in parentheses and appending its
    /// bindings at the current position").
    #[must_use]
    pub fn to_raw_fragment(&self) -> SqlFragment {
        let dialect = RawMarkerDialect;
        let mut ctx = RenderContext::new(&dialect);
        self.render_into(&mut ctx);
        let (sql, bindings) = ctx.finish();
        SqlFragment::new(sql, bindings)
    }
}

/// Internal dialect stand-in used only to render a subquery with
/// literal `?` placeholders before it is spliced into a parent
/// fragment; never exposed outside this module.
struct RawMarkerDialect;

impl Dialect for RawMarkerDialect {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn quote_ident(&self, identifier: &str) -> String {
        identifier.to_string()
    }

    fn param_marker(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn reserved_words(&self) -> &HashSet<&'static str> {
        static EMPTY: std::sync::OnceLock<HashSet<&'static str>> = std::sync::OnceLock::new();
        EMPTY.get_or_init(HashSet::new)
    }

    fn max_identifier_len(&self) -> usize {
        usize::MAX
    }

    fn map_type(&self, _column_type: &ColumnType) -> TypeRendering {
        TypeRendering::plain(String::new())
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        None
    }

    fn limit_offset_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        let limit = limit?;
        match offset {
            Some(offset) if offset > 0 => Some(format!("LIMIT {limit} OFFSET {offset}")),
            _ => Some(format!("LIMIT {limit}")),
        }
    }
}
