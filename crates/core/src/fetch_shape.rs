use std::collections::BTreeMap;

use crate::fetch::FetchMode;
use crate::row::{Row, Value};

/// A single reshaped result, one variant per `FetchMode` (spec.md
/// §4.C2). Grouped modes key by the first selected column: `Grouped`
/// collects the *whole* row under that key (including the key column
/// itself, matching a generic `fetchAll(FETCH_GROUP)`-style contract);
/// `GroupedColumn` keeps only the second column's scalar value;
/// `GroupedObject` is the same grouping as `Grouped` with the intent
/// that a caller maps each member to a typed object.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Associative(Row),
    Positional(Vec<Value>),
    Object(Row),
    Column(Value),
    KeyPair(Value, Value),
    KeyPairArray(Value, Row),
    Grouped(Value, Row),
    GroupedColumn(Value, Value),
    GroupedObject(Value, Row),
}

fn value_key(value: &Value) -> String {
    match value {
        Value::Null => "\0NULL".to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Text(v) => v.clone(),
        Value::Bytes(v) => format!("{v:x?}"),
    }
}

/// Pure transform from raw rows to the shape requested by `mode`. Kept
/// dialect-independent so every Connection Driver shares identical
/// grouping/keying semantics (testable property: deterministic given
/// the same rows and mode).
#[must_use]
pub fn apply_mode(rows: &[Row], mode: FetchMode) -> Vec<Fetched> {
    match mode {
        FetchMode::Associative => rows.iter().cloned().map(Fetched::Associative).collect(),
        FetchMode::Object => rows.iter().cloned().map(Fetched::Object).collect(),
        FetchMode::Positional => rows
            .iter()
            .map(|row| Fetched::Positional(row.columns.iter().map(|(_, value)| value.clone()).collect()))
            .collect(),
        FetchMode::Column => rows
            .iter()
            .filter_map(|row| row.get_index(0).cloned())
            .map(Fetched::Column)
            .collect(),
        FetchMode::KeyPair => rows
            .iter()
            .filter_map(|row| Some((row.get_index(0)?.clone(), row.get_index(1)?.clone())))
            .map(|(key, value)| Fetched::KeyPair(key, value))
            .collect(),
        FetchMode::KeyPairArray => rows
            .iter()
            .filter_map(|row| {
                let key = row.get_index(0)?.clone();
                let rest = Row::new(row.columns.iter().skip(1).cloned().collect());
                Some(Fetched::KeyPairArray(key, rest))
            })
            .collect(),
        FetchMode::Grouped => group_rows(rows, Fetched::Grouped),
        FetchMode::GroupedObject => group_rows(rows, Fetched::GroupedObject),
        FetchMode::GroupedColumn => rows
            .iter()
            .filter_map(|row| Some((row.get_index(0)?.clone(), row.get_index(1)?.clone())))
            .map(|(key, value)| Fetched::GroupedColumn(key, value))
            .collect(),
    }
}

fn group_rows(rows: &[Row], variant: fn(Value, Row) -> Fetched) -> Vec<Fetched> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, (Value, Vec<Row>)> = BTreeMap::new();

    for row in rows {
        let Some(key) = row.get_index(0).cloned() else { continue };
        let key_string = value_key(&key);
        groups.entry(key_string.clone()).or_insert_with(|| {
            order.push(key_string.clone());
            (key, Vec::new())
        });
        if let Some(entry) = groups.get_mut(&key_string) {
            entry.1.push(row.clone());
        }
    }

    order
        .into_iter()
        .flat_map(|key_string| {
            let (key, member_rows) = groups.remove(&key_string).expect("key was just inserted");
            member_rows.into_iter().map(move |row| variant(key.clone(), row))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<Row> {
        vec![
            Row::new(vec![
                ("status".to_string(), Value::Text("active".to_string())),
                ("id".to_string(), Value::Int(1)),
            ]),
            Row::new(vec![
                ("status".to_string(), Value::Text("active".to_string())),
                ("id".to_string(), Value::Int(2)),
            ]),
            Row::new(vec![
                ("status".to_string(), Value::Text("closed".to_string())),
                ("id".to_string(), Value::Int(3)),
            ]),
        ]
    }

    #[test]
    fn grouped_preserves_first_seen_order_and_membership() {
        let shaped = apply_mode(&sample_rows(), FetchMode::Grouped);
        assert_eq!(shaped.len(), 3);
        let Fetched::Grouped(key, _) = &shaped[0] else { panic!("expected Grouped") };
        assert_eq!(*key, Value::Text("active".to_string()));
        let Fetched::Grouped(key, _) = &shaped[2] else { panic!("expected Grouped") };
        assert_eq!(*key, Value::Text("closed".to_string()));
    }

    #[test]
    fn key_pair_zips_first_two_columns() {
        let shaped = apply_mode(&sample_rows(), FetchMode::KeyPair);
        assert_eq!(
            shaped[0],
            Fetched::KeyPair(Value::Text("active".to_string()), Value::Int(1))
        );
    }

    #[test]
    fn column_takes_only_first_column() {
        let shaped = apply_mode(&sample_rows(), FetchMode::Column);
        assert_eq!(shaped, vec![
            Fetched::Column(Value::Text("active".to_string())),
            Fetched::Column(Value::Text("active".to_string())),
            Fetched::Column(Value::Text("closed".to_string())),
        ]);
    }
}
