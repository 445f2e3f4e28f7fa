use crate::row::Value;

use super::fragment::{RenderContext, SqlFragment};
use super::plan::QueryPlan;

/// `DELETE FROM table [WHERE ...]` (spec.md §4.C5).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeletePlan {
    pub table: String,
    pub wheres: Vec<SqlFragment>,
}

impl DeletePlan {
    pub(super) fn render(&self, ctx: &mut RenderContext<'_>) {
        ctx.push_str("DELETE FROM ");
        ctx.push_str(&self.table);
        super::select::render_conditions(ctx, " WHERE ", &self.wheres);
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeleteBuilder {
    plan: DeletePlan,
}

impl DeleteBuilder {
    #[must_use]
    pub fn from(table: impl Into<String>) -> Self {
        Self { plan: DeletePlan { table: table.into(), wheres: Vec::new() } }
    }

    #[must_use]
    pub fn where_raw(mut self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.plan.wheres.push(SqlFragment::new(sql, bindings));
        self
    }

    #[must_use]
    pub fn build(self) -> QueryPlan {
        QueryPlan::Delete(self.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::PlainDialect;

    #[test]
    fn renders_where_bindings() {
        let plan = DeleteBuilder::from("sessions")
            .where_raw("expires_at < ?", vec![Value::Text("now".to_string())])
            .build();
        assert_eq!(plan.to_sql(&PlainDialect), "DELETE FROM sessions WHERE expires_at < ?");
        assert_eq!(plan.bindings(&PlainDialect), vec![Value::Text("now".to_string())]);
    }

    #[test]
    fn without_where_deletes_everything() {
        let plan = DeleteBuilder::from("tmp").build();
        assert_eq!(plan.to_sql(&PlainDialect), "DELETE FROM tmp");
        assert!(plan.bindings(&PlainDialect).is_empty());
    }
}
