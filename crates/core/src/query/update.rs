use crate::row::Value;

use super::fragment::{RenderContext, SqlFragment};
use super::plan::QueryPlan;

/// `UPDATE table SET col = ?, ... [WHERE ...]` (spec.md §4.C5). Bindings
/// are the SET values in assignment order followed by the WHERE
/// bindings, matching the textual placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdatePlan {
    pub table: String,
    pub assignments: Vec<(String, Value)>,
    pub wheres: Vec<SqlFragment>,
}

impl UpdatePlan {
    pub(super) fn render(&self, ctx: &mut RenderContext<'_>) {
        ctx.push_str("UPDATE ");
        ctx.push_str(&self.table);
        ctx.push_str(" SET ");
        for (index, (column, value)) in self.assignments.iter().enumerate() {
            if index > 0 {
                ctx.push_str(", ");
            }
            ctx.push_str(column);
            ctx.push_str(" = ");
            ctx.push_param(value.clone());
        }
        super::select::render_conditions(ctx, " WHERE ", &self.wheres);
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBuilder {
    plan: UpdatePlan,
}

impl UpdateBuilder {
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self { plan: UpdatePlan { table: table.into(), assignments: Vec::new(), wheres: Vec::new() } }
    }

    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: Value) -> Self {
        self.plan.assignments.push((column.into(), value));
        self
    }

    #[must_use]
    pub fn where_raw(mut self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.plan.wheres.push(SqlFragment::new(sql, bindings));
        self
    }

    #[must_use]
    pub fn build(self) -> QueryPlan {
        QueryPlan::Update(self.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::PlainDialect;

    #[test]
    fn renders_assignments_then_where_bindings() {
        let plan = UpdateBuilder::table("users")
            .set("name", Value::Text("bob".to_string()))
            .set("active", Value::Bool(true))
            .where_raw("id = ?", vec![Value::Int(7)])
            .build();
        assert_eq!(
            plan.to_sql(&PlainDialect),
            "UPDATE users SET name = ?, active = ? WHERE id = ?"
        );
        assert_eq!(
            plan.bindings(&PlainDialect),
            vec![Value::Text("bob".to_string()), Value::Bool(true), Value::Int(7)]
        );
    }

    #[test]
    fn without_where_updates_unconditionally() {
        let plan = UpdateBuilder::table("flags").set("enabled", Value::Bool(false)).build();
        assert_eq!(plan.to_sql(&PlainDialect), "UPDATE flags SET enabled = ?");
    }
}
