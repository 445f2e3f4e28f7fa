use crate::row::Value;

use super::fragment::{RenderContext, SqlFragment};
use super::plan::QueryPlan;
use super::window::SortDirection;

#[derive(Debug, Clone, PartialEq)]
pub enum FromSource {
    Table(String),
    AliasedTable(String, String),
    Subquery(Box<QueryPlan>, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub target: FromSource,
    pub condition: SqlFragment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionItem {
    /// Plain projection text (`id`, `t.name`, `COUNT(*) AS total`),
    /// passed through unquoted — consistent with the rest of the Query
    /// Builder, which leaves identifier quoting to the Schema Builder.
    Column(String),
    Expr { fragment: SqlFragment, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedWindow {
    pub name: String,
    pub spec: super::window::WindowSpec,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectPlan {
    pub ctes: Vec<(String, Box<QueryPlan>)>,
    pub distinct: bool,
    pub projection: Vec<ProjectionItem>,
    pub from: Option<FromSource>,
    pub joins: Vec<Join>,
    pub wheres: Vec<SqlFragment>,
    pub group_by: Vec<String>,
    pub having: Vec<SqlFragment>,
    pub windows: Vec<NamedWindow>,
    pub order_by: Vec<(String, SortDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub union: Vec<(Box<QueryPlan>, bool)>,
}

impl SelectPlan {
    pub(super) fn render(&self, ctx: &mut RenderContext<'_>) {
        self.render_ctes(ctx);
        ctx.push_str("SELECT ");
        if self.distinct {
            ctx.push_str("DISTINCT ");
        }
        self.render_projection(ctx);
        if let Some(from) = &self.from {
            ctx.push_str(" FROM ");
            render_source(ctx, from);
        }
        for join in &self.joins {
            ctx.push_str(" ");
            ctx.push_str(join.kind.keyword());
            ctx.push_str(" ");
            render_source(ctx, &join.target);
            ctx.push_str(" ON ");
            ctx.push_fragment(&join.condition);
        }
        render_conditions(ctx, " WHERE ", &self.wheres);
        if !self.group_by.is_empty() {
            ctx.push_str(" GROUP BY ");
            ctx.push_str(&self.group_by.join(", "));
        }
        render_conditions(ctx, " HAVING ", &self.having);
        if !self.windows.is_empty() {
            ctx.push_str(" WINDOW ");
            let rendered = self
                .windows
                .iter()
                .map(|named| format!("{} AS ({})", named.name, named.spec.render()))
                .collect::<Vec<_>>()
                .join(", ");
            ctx.push_str(&rendered);
        }
        if !self.order_by.is_empty() {
            ctx.push_str(" ORDER BY ");
            let rendered = self
                .order_by
                .iter()
                .map(|(column, direction)| {
                    let suffix = match direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{column} {suffix}")
                })
                .collect::<Vec<_>>()
                .join(", ");
            ctx.push_str(&rendered);
        }
        if let Some(clause) = ctx.dialect.limit_offset_clause(self.limit, self.offset) {
            ctx.push_str(" ");
            ctx.push_str(&clause);
        }
        for (plan, all) in &self.union {
            ctx.push_str(if *all { " UNION ALL " } else { " UNION " });
            plan.render_into(ctx);
        }
    }

    fn render_ctes(&self, ctx: &mut RenderContext<'_>) {
        if self.ctes.is_empty() {
            return;
        }
        ctx.push_str("WITH ");
        for (index, (name, plan)) in self.ctes.iter().enumerate() {
            if index > 0 {
                ctx.push_str(", ");
            }
            ctx.push_str(name);
            ctx.push_str(" AS (");
            plan.render_into(ctx);
            ctx.push_str(")");
        }
        ctx.push_str(" ");
    }

    fn render_projection(&self, ctx: &mut RenderContext<'_>) {
        if self.projection.is_empty() {
            ctx.push_str("*");
            return;
        }
        for (index, item) in self.projection.iter().enumerate() {
            if index > 0 {
                ctx.push_str(", ");
            }
            match item {
                ProjectionItem::Column(text) => ctx.push_str(text),
                ProjectionItem::Expr { fragment, alias } => {
                    ctx.push_fragment(fragment);
                    if let Some(alias) = alias {
                        ctx.push_str(" AS ");
                        ctx.push_str(alias);
                    }
                }
            }
        }
    }
}

fn render_source(ctx: &mut RenderContext<'_>, source: &FromSource) {
    match source {
        FromSource::Table(name) => ctx.push_str(name),
        FromSource::AliasedTable(name, alias) => {
            ctx.push_str(name);
            ctx.push_str(" ");
            ctx.push_str(alias);
        }
        FromSource::Subquery(plan, alias) => {
            ctx.push_str("(");
            plan.render_into(ctx);
            ctx.push_str(") ");
            ctx.push_str(alias);
        }
    }
}

pub(super) fn render_conditions(ctx: &mut RenderContext<'_>, keyword: &str, conditions: &[SqlFragment]) {
    if conditions.is_empty() {
        return;
    }
    ctx.push_str(keyword);
    for (index, condition) in conditions.iter().enumerate() {
        if index > 0 {
            ctx.push_str(" AND ");
        }
        ctx.push_fragment(condition);
    }
}

/// Fluent SELECT assembly (spec.md §4.C5). `to_sql`/`bindings` on the
/// finished [`QueryPlan`] are pure functions of this state.
#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    plan: SelectPlan,
}

impl SelectBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, plan: QueryPlan) -> Self {
        self.plan.ctes.push((name.into(), Box::new(plan)));
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.plan.distinct = true;
        self
    }

    #[must_use]
    pub fn select(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.plan.projection.extend(columns.into_iter().map(|c| ProjectionItem::Column(c.into())));
        self
    }

    #[must_use]
    pub fn select_expr(mut self, fragment: SqlFragment, alias: Option<&str>) -> Self {
        self.plan.projection.push(ProjectionItem::Expr { fragment, alias: alias.map(str::to_string) });
        self
    }

    #[must_use]
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.plan.from = Some(FromSource::Table(table.into()));
        self
    }

    #[must_use]
    pub fn from_as(mut self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.plan.from = Some(FromSource::AliasedTable(table.into(), alias.into()));
        self
    }

    #[must_use]
    pub fn from_subquery(mut self, plan: QueryPlan, alias: impl Into<String>) -> Self {
        self.plan.from = Some(FromSource::Subquery(Box::new(plan), alias.into()));
        self
    }

    #[must_use]
    pub fn join(
        mut self,
        kind: JoinKind,
        target: impl Into<String>,
        condition_sql: impl Into<String>,
        bindings: Vec<Value>,
    ) -> Self {
        self.plan.joins.push(Join {
            kind,
            target: FromSource::Table(target.into()),
            condition: SqlFragment::new(condition_sql, bindings),
        });
        self
    }

    #[must_use]
    pub fn inner_join(self, target: impl Into<String>, condition: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.join(JoinKind::Inner, target, condition, bindings)
    }

    #[must_use]
    pub fn left_join(self, target: impl Into<String>, condition: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.join(JoinKind::Left, target, condition, bindings)
    }

    #[must_use]
    pub fn right_join(self, target: impl Into<String>, condition: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.join(JoinKind::Right, target, condition, bindings)
    }

    #[must_use]
    pub fn full_join(self, target: impl Into<String>, condition: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.join(JoinKind::Full, target, condition, bindings)
    }

    #[must_use]
    pub fn where_raw(mut self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.plan.wheres.push(SqlFragment::new(sql, bindings));
        self
    }

    /// Sugar over a single WHERE term: `column IN (?, ?, ...)`.
    #[must_use]
    pub fn where_in(self, column: &str, values: Vec<Value>) -> Self {
        if values.is_empty() {
            return self.where_raw("1 = 0", Vec::new());
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.where_raw(format!("{column} IN ({placeholders})"), values)
    }

    #[must_use]
    pub fn where_not_in(self, column: &str, values: Vec<Value>) -> Self {
        if values.is_empty() {
            return self.where_raw("1 = 1", Vec::new());
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.where_raw(format!("{column} NOT IN ({placeholders})"), values)
    }

    #[must_use]
    pub fn where_between(self, column: &str, low: Value, high: Value) -> Self {
        self.where_raw(format!("{column} BETWEEN ? AND ?"), vec![low, high])
    }

    #[must_use]
    pub fn where_null(self, column: &str) -> Self {
        self.where_raw(format!("{column} IS NULL"), Vec::new())
    }

    #[must_use]
    pub fn where_not_null(self, column: &str) -> Self {
        self.where_raw(format!("{column} IS NOT NULL"), Vec::new())
    }

    /// Sugar that folds into the previously pushed WHERE term as
    /// `(prev) OR (new)` — spec.md §4.C5: "disjunction is expressed by
    /// the caller inside a single condition term."
    #[must_use]
    pub fn or_where(mut self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        match self.plan.wheres.pop() {
            Some(previous) => {
                let merged_sql = format!("({}) OR ({})", previous.sql, sql.into());
                let mut merged_bindings = previous.bindings;
                merged_bindings.extend(bindings);
                self.plan.wheres.push(SqlFragment::new(merged_sql, merged_bindings));
            }
            None => self.plan.wheres.push(SqlFragment::new(sql, bindings)),
        }
        self
    }

    #[must_use]
    pub fn where_exists(self, subquery: QueryPlan) -> Self {
        self.where_subquery_exists(subquery, false)
    }

    #[must_use]
    pub fn where_not_exists(self, subquery: QueryPlan) -> Self {
        self.where_subquery_exists(subquery, true)
    }

    fn where_subquery_exists(mut self, subquery: QueryPlan, negate: bool) -> Self {
        let prefix = if negate { "NOT EXISTS " } else { "EXISTS " };
        let fragment = subquery.to_raw_fragment().wrapped_in_parens();
        self.plan.wheres.push(SqlFragment::new(format!("{prefix}{}", fragment.sql), fragment.bindings));
        self
    }

    #[must_use]
    pub fn group_by(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.plan.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn having_raw(mut self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.plan.having.push(SqlFragment::new(sql, bindings));
        self
    }

    #[must_use]
    pub fn window(mut self, name: impl Into<String>, spec: super::window::WindowSpec) -> Self {
        self.plan.windows.push(NamedWindow { name: name.into(), spec });
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.plan.order_by.push((column.into(), direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.plan.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.plan.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn union(mut self, other: QueryPlan) -> Self {
        self.plan.union.push((Box::new(other), false));
        self
    }

    #[must_use]
    pub fn union_all(mut self, other: QueryPlan) -> Self {
        self.plan.union.push((Box::new(other), true));
        self
    }

    #[must_use]
    pub fn build(self) -> QueryPlan {
        QueryPlan::Select(self.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::PlainDialect;

    #[test]
    fn scenario_s3_builder_rendering() {
        let plan = SelectBuilder::new()
            .select(["id", "name"])
            .from("u")
            .where_raw("status = ?", vec![Value::Text("active".to_string())])
            .order_by("id", SortDirection::Desc)
            .limit(10)
            .build();

        assert_eq!(
            plan.to_sql(&PlainDialect),
            "SELECT id, name FROM u WHERE status = ? ORDER BY id DESC LIMIT 0, 10"
        );
        assert_eq!(plan.bindings(&PlainDialect), vec![Value::Text("active".to_string())]);
    }

    #[test]
    fn marker_count_matches_binding_count() {
        let plan = SelectBuilder::new()
            .select(["id"])
            .from("t")
            .where_raw("a = ? AND b = ?", vec![Value::Int(1), Value::Int(2)])
            .having_raw("c = ?", vec![Value::Int(3)])
            .build();
        let sql = plan.to_sql(&PlainDialect);
        let marker_count = sql.matches('?').count();
        assert_eq!(marker_count, plan.bindings(&PlainDialect).len());
    }

    #[test]
    fn rendering_is_deterministic() {
        let build = || {
            SelectBuilder::new()
                .select(["id"])
                .from("t")
                .where_raw("a = ?", vec![Value::Int(1)])
                .build()
        };
        assert_eq!(build().to_sql(&PlainDialect), build().to_sql(&PlainDialect));
    }
}
