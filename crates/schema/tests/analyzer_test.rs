use std::sync::Arc;

use dbkit_core::driver::{ConnectionDriver, ExecResult, PreparedStatement};
use dbkit_core::error::Result;
use dbkit_core::row::{Row, Value};
use dbkit_core::schema_builder::CatalogReader;
use dbkit_core::test_support::PlainDialect;
use dbkit_schema::SchemaAnalyzer;

/// Returns canned rows keyed by which catalog view the SQL text
/// touches, mimicking a MySQL `information_schema` reflection without a
/// live server.
struct FakeDriver;

impl ConnectionDriver for FakeDriver {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        Ok(PreparedStatement::new(sql))
    }

    fn execute(&mut self, stmt: &PreparedStatement, _params: &[Value]) -> Result<ExecResult> {
        let rows = if stmt.sql.contains("information_schema.tables") {
            vec![Row::new(vec![("table_name".to_string(), Value::Text("widgets".to_string()))])]
        } else if stmt.sql.contains("information_schema.columns") {
            vec![
                Row::new(vec![
                    ("column_name".to_string(), Value::Text("id".to_string())),
                    ("data_type".to_string(), Value::Text("int".to_string())),
                    ("is_nullable".to_string(), Value::Text("NO".to_string())),
                    ("column_default".to_string(), Value::Null),
                    ("character_maximum_length".to_string(), Value::Null),
                    ("numeric_precision".to_string(), Value::Null),
                    ("numeric_scale".to_string(), Value::Null),
                    ("datetime_precision".to_string(), Value::Null),
                    ("extra".to_string(), Value::Text("auto_increment".to_string())),
                ]),
                Row::new(vec![
                    ("column_name".to_string(), Value::Text("name".to_string())),
                    ("data_type".to_string(), Value::Text("varchar".to_string())),
                    ("is_nullable".to_string(), Value::Text("YES".to_string())),
                    ("column_default".to_string(), Value::Null),
                    ("character_maximum_length".to_string(), Value::Int(255)),
                    ("numeric_precision".to_string(), Value::Null),
                    ("numeric_scale".to_string(), Value::Null),
                    ("datetime_precision".to_string(), Value::Null),
                    ("extra".to_string(), Value::Text(String::new())),
                ]),
            ]
        } else {
            Vec::new()
        };
        Ok(ExecResult { rows, affected_rows: 0, last_insert_id: None })
    }

    fn begin_transaction(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn chunked_query(&mut self, _sql: &str, _params: &[Value], _chunk_size: usize) -> Result<Vec<Vec<Row>>> {
        Ok(Vec::new())
    }
}

#[test]
fn analyze_table_reflects_columns_and_auto_increment() {
    let analyzer = SchemaAnalyzer::new(FakeDriver, Arc::new(PlainDialect), "app");
    let table = analyzer.analyze_table("widgets").unwrap().expect("table exists");
    assert_eq!(table.columns.len(), 2);
    assert!(table.columns[0].auto_increment);
    assert!(!table.columns[1].auto_increment);
}

#[test]
fn analyze_table_returns_none_for_unknown_table() {
    let analyzer = SchemaAnalyzer::new(FakeDriver, Arc::new(PlainDialect), "app");
    assert!(analyzer.analyze_table("missing").unwrap().is_none());
}

#[test]
fn catalog_reader_reports_column_existence() {
    let analyzer = SchemaAnalyzer::new(FakeDriver, Arc::new(PlainDialect), "app");
    assert!(analyzer.column_exists("widgets", "name").unwrap());
    assert!(!analyzer.column_exists("widgets", "missing_column").unwrap());
}
