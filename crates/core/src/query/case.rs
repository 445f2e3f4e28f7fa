use crate::error::BuilderValidation;
use crate::row::Value;

use super::fragment::{FragmentWriter, SqlFragment};

/// How a CASE arm's result value renders. Spec.md §4.C5: "Non-literal,
/// non-NULL, non-column-reference result values are bound as
/// parameters; identifiers ... and function expressions ... pass
/// through as raw SQL." Rather than sniffing a stringly-typed value at
/// render time, the caller states the classification up front — the
/// tagged-union redesign spec.md §9 asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseResult {
    /// A bare numeric literal, rendered directly (e.g. `0`, `3.5`).
    Number(f64),
    Null,
    /// A column reference, rendered as-is (not quoted — consistent with
    /// the rest of the Query Builder's unquoted projection style).
    Column(String),
    /// A function call or other raw expression (must contain `(`).
    Function(String),
    /// Anything else: bound as a parameter.
    Value(Value),
}

impl CaseResult {
    fn render(&self, writer: &mut FragmentWriter) {
        match self {
            Self::Number(number) => {
                writer.push_str(&format_number(*number));
            }
            Self::Null => {
                writer.push_str("NULL");
            }
            Self::Column(name) => {
                writer.push_str(name);
            }
            Self::Function(expr) => {
                writer.push_str(expr);
            }
            Self::Value(value) => {
                writer.push_param(value.clone());
            }
        }
    }
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

/// `CASE [col] WHEN ... THEN ... ELSE ... END` (spec.md §3/§4.C5).
#[derive(Debug, Clone, PartialEq)]
pub enum CaseExpression {
    /// `CASE col WHEN literal THEN result ... END`. Matched literally
    /// against `anchor`.
    Simple { anchor: String, arms: Vec<(Value, CaseResult)>, else_value: Option<CaseResult> },
    /// `CASE WHEN condition THEN result ... END`. No anchor; each WHEN
    /// carries its own boolean condition (with its own bindings).
    Searched { arms: Vec<(SqlFragment, CaseResult)>, else_value: Option<CaseResult> },
}

impl CaseExpression {
    pub fn validate(&self) -> Result<(), BuilderValidation> {
        let (arms_empty, anchor_empty) = match self {
            Self::Simple { arms, anchor, .. } => (arms.is_empty(), anchor.trim().is_empty()),
            Self::Searched { arms, .. } => (arms.is_empty(), false),
        };
        if anchor_empty {
            return Err(BuilderValidation::EmptyCaseAnchor);
        }
        if arms_empty {
            return Err(BuilderValidation::MissingWhenClause);
        }
        Ok(())
    }

    #[must_use]
    pub fn render(&self) -> SqlFragment {
        let mut writer = FragmentWriter::new();
        writer.push_str("CASE ");
        match self {
            Self::Simple { anchor, arms, else_value } => {
                writer.push_str(anchor).push_str(" ");
                for (when_value, result) in arms {
                    writer.push_str("WHEN ").push_param(when_value.clone());
                    writer.push_str(" THEN ");
                    result.render(&mut writer);
                    writer.push_str(" ");
                }
                if let Some(else_value) = else_value {
                    writer.push_str("ELSE ");
                    else_value.render(&mut writer);
                    writer.push_str(" ");
                }
            }
            Self::Searched { arms, else_value } => {
                for (condition, result) in arms {
                    writer.push_str("WHEN ");
                    append_fragment(&mut writer, condition);
                    writer.push_str(" THEN ");
                    result.render(&mut writer);
                    writer.push_str(" ");
                }
                if let Some(else_value) = else_value {
                    writer.push_str("ELSE ");
                    else_value.render(&mut writer);
                    writer.push_str(" ");
                }
            }
        }
        writer.push_str("END");
        writer.finish()
    }
}

/// Splices a fragment's `?` markers into a fragment under construction,
/// preserving its bindings in order.
fn append_fragment(writer: &mut FragmentWriter, fragment: &SqlFragment) {
    let mut bindings = fragment.bindings.iter();
    for ch in fragment.sql.chars() {
        if ch == '?' {
            if let Some(value) = bindings.next() {
                writer.push_param(value.clone());
                continue;
            }
        }
        writer.push_str(&ch.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_when_is_fatal() {
        let expr = CaseExpression::Simple { anchor: "status".to_string(), arms: vec![], else_value: None };
        assert!(matches!(expr.validate(), Err(BuilderValidation::MissingWhenClause)));
    }

    #[test]
    fn simple_case_binds_when_values_and_literal_results_pass_through() {
        let expr = CaseExpression::Simple {
            anchor: "status".to_string(),
            arms: vec![
                (Value::Text("active".to_string()), CaseResult::Number(1.0)),
                (Value::Text("closed".to_string()), CaseResult::Number(0.0)),
            ],
            else_value: Some(CaseResult::Null),
        };
        let fragment = expr.render();
        assert_eq!(fragment.sql, "CASE status WHEN ? THEN 1 WHEN ? THEN 0 ELSE NULL END");
        assert_eq!(
            fragment.bindings,
            vec![Value::Text("active".to_string()), Value::Text("closed".to_string())]
        );
    }

    #[test]
    fn searched_case_binds_non_literal_results() {
        let expr = CaseExpression::Searched {
            arms: vec![(
                SqlFragment::new("age >= ?", vec![Value::Int(18)]),
                CaseResult::Value(Value::Text("adult".to_string())),
            )],
            else_value: Some(CaseResult::Value(Value::Text("minor".to_string()))),
        };
        let fragment = expr.render();
        assert_eq!(fragment.sql, "CASE WHEN age >= ? THEN ? ELSE ? END");
        assert_eq!(
            fragment.bindings,
            vec![Value::Int(18), Value::Text("adult".to_string()), Value::Text("minor".to_string())]
        );
    }
}
