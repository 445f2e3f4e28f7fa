use crate::row::Value;

use super::fragment::{FragmentWriter, SqlFragment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A named or anonymous window definition: `PARTITION BY ... ORDER BY ...`.
/// Named definitions are emitted once before `ORDER BY` in the outer
/// SELECT; anonymous ones are inlined at the projection site (spec.md
/// §4.C5).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    pub partition_by: Vec<String>,
    pub order_by: Vec<(String, SortDirection)>,
}

impl WindowSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn partition_by(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.partition_by = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        if !self.partition_by.is_empty() {
            parts.push(format!("PARTITION BY {}", self.partition_by.join(", ")));
        }
        if !self.order_by.is_empty() {
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
            parts.push(format!("ORDER BY {rendered}"));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverClause {
    Named(String),
    Inline(WindowSpec),
}

/// Ranking (`ROW_NUMBER`, `RANK`, `DENSE_RANK`) and value-access (`LAG`,
/// `LEAD`, `FIRST_VALUE`, `LAST_VALUE`) window functions (spec.md
/// §4.C5). Each produces an expression holding its own bindings (the
/// optional `LAG`/`LEAD` default value).
#[derive(Debug, Clone, PartialEq)]
pub enum WindowFunction {
    RowNumber,
    Rank,
    DenseRank,
    Lag { column: String, offset: i64, default: Option<Value> },
    Lead { column: String, offset: i64, default: Option<Value> },
    FirstValue { column: String },
    LastValue { column: String },
}

impl WindowFunction {
    #[must_use]
    pub fn render_over(&self, over: &OverClause) -> SqlFragment {
        let mut writer = FragmentWriter::new();
        self.render_call(&mut writer);
        writer.push_str(" OVER ");
        match over {
            OverClause::Named(name) => {
                writer.push_str(name);
            }
            OverClause::Inline(spec) => {
                writer.push_str("(");
                writer.push_str(&spec.render());
                writer.push_str(")");
            }
        }
        writer.finish()
    }

    fn render_call(&self, writer: &mut FragmentWriter) {
        match self {
            Self::RowNumber => {
                writer.push_str("ROW_NUMBER()");
            }
            Self::Rank => {
                writer.push_str("RANK()");
            }
            Self::DenseRank => {
                writer.push_str("DENSE_RANK()");
            }
            Self::FirstValue { column } => {
                writer.push_str("FIRST_VALUE(").push_str(column).push_str(")");
            }
            Self::LastValue { column } => {
                writer.push_str("LAST_VALUE(").push_str(column).push_str(")");
            }
            Self::Lag { column, offset, default } => {
                render_offset_fn(writer, "LAG", column, *offset, default.as_ref());
            }
            Self::Lead { column, offset, default } => {
                render_offset_fn(writer, "LEAD", column, *offset, default.as_ref());
            }
        }
    }
}

fn render_offset_fn(writer: &mut FragmentWriter, name: &str, column: &str, offset: i64, default: Option<&Value>) {
    writer.push_str(name).push_str("(").push_str(column).push_str(", ").push_str(&offset.to_string());
    if let Some(default) = default {
        writer.push_str(", ").push_param(default.clone());
    }
    writer.push_str(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_number_over_inline_window() {
        let spec = WindowSpec::new().partition_by(["dept"]).order_by("salary", SortDirection::Desc);
        let fragment = WindowFunction::RowNumber.render_over(&OverClause::Inline(spec));
        assert_eq!(fragment.sql, "ROW_NUMBER() OVER (PARTITION BY dept ORDER BY salary DESC)");
        assert!(fragment.bindings.is_empty());
    }

    #[test]
    fn lag_binds_its_own_default() {
        let function = WindowFunction::Lag {
            column: "amount".to_string(),
            offset: 1,
            default: Some(Value::Int(0)),
        };
        let fragment = function.render_over(&OverClause::Named("w".to_string()));
        assert_eq!(fragment.sql, "LAG(amount, 1, ?) OVER w");
        assert_eq!(fragment.bindings, vec![Value::Int(0)]);
    }
}
