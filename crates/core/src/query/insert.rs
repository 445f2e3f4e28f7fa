use crate::row::Value;

use super::fragment::RenderContext;
use super::plan::QueryPlan;

/// `INSERT INTO table (col, ...) VALUES (?, ...)` (spec.md §4.C5): data
/// columns are listed in insertion order, one row of bindings per
/// inserted row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertPlan {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl InsertPlan {
    pub(super) fn render(&self, ctx: &mut RenderContext<'_>) {
        ctx.push_str("INSERT INTO ");
        ctx.push_str(&self.table);
        ctx.push_str(" (");
        ctx.push_str(&self.columns.join(", "));
        ctx.push_str(") VALUES ");
        for (row_index, row) in self.rows.iter().enumerate() {
            if row_index > 0 {
                ctx.push_str(", ");
            }
            ctx.push_str("(");
            for (col_index, value) in row.iter().enumerate() {
                if col_index > 0 {
                    ctx.push_str(", ");
                }
                ctx.push_param(value.clone());
            }
            ctx.push_str(")");
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InsertBuilder {
    plan: InsertPlan,
}

impl InsertBuilder {
    #[must_use]
    pub fn into_table(table: impl Into<String>) -> Self {
        Self { plan: InsertPlan { table: table.into(), columns: Vec::new(), rows: Vec::new() } }
    }

    /// Sets the insertion-ordered column list. Must be called before
    /// `values`/`row` — each row's values are positionally matched
    /// against these columns.
    #[must_use]
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.plan.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.plan.rows.push(values);
        self
    }

    #[must_use]
    pub fn build(self) -> QueryPlan {
        QueryPlan::Insert(self.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::PlainDialect;

    #[test]
    fn renders_insertion_order_columns_and_positional_bindings() {
        let plan = InsertBuilder::into_table("users")
            .columns(["email", "created_at"])
            .row(vec![Value::Text("a@example.com".to_string()), Value::Text("now".to_string())])
            .build();
        assert_eq!(
            plan.to_sql(&PlainDialect),
            "INSERT INTO users (email, created_at) VALUES (?, ?)"
        );
        assert_eq!(
            plan.bindings(&PlainDialect),
            vec![Value::Text("a@example.com".to_string()), Value::Text("now".to_string())]
        );
    }

    #[test]
    fn renders_multiple_rows() {
        let plan = InsertBuilder::into_table("t")
            .columns(["a"])
            .row(vec![Value::Int(1)])
            .row(vec![Value::Int(2)])
            .build();
        assert_eq!(plan.to_sql(&PlainDialect), "INSERT INTO t (a) VALUES (?), (?)");
        assert_eq!(plan.bindings(&PlainDialect), vec![Value::Int(1), Value::Int(2)]);
    }
}
