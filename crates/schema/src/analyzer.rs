use std::cell::RefCell;
use std::sync::Arc;

use dbkit_core::dialect::Dialect;
use dbkit_core::driver::ConnectionDriver;
use dbkit_core::error::Result;
use dbkit_core::ir::{
    ColumnDefault, ColumnSpec, ColumnType, ForeignKeyAction, ForeignKeySpec, IndexColumn,
    IndexKind, IndexSpec, IntegerWidth, TextSize,
};
use dbkit_core::row::{Row, Value};
use dbkit_core::schema_builder::CatalogReader;

use crate::analyzed::AnalyzedTable;

/// Reflects live schema state through `information_schema` (both
/// dialects expose it) plus the handful of dialect-specific catalog
/// views MySQL and PostgreSQL diverge on (spec.md §4.C8). Owns its
/// connection; wrapped in a `RefCell` so the `&self`-only
/// [`CatalogReader`] methods can still issue queries.
pub struct SchemaAnalyzer<D: ConnectionDriver> {
    driver: RefCell<D>,
    dialect: Arc<dyn Dialect>,
    database: String,
}

impl<D: ConnectionDriver> SchemaAnalyzer<D> {
    pub fn new(driver: D, dialect: Arc<dyn Dialect>, database: impl Into<String>) -> Self {
        Self { driver: RefCell::new(driver), dialect, database: database.into() }
    }

    fn is_postgres(&self) -> bool {
        self.dialect.name() == "postgres"
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut driver = self.driver.borrow_mut();
        let stmt = driver.prepare(sql)?;
        Ok(driver.execute(&stmt, params)?.rows)
    }

    fn schema_name(&self) -> String {
        if self.is_postgres() {
            "public".to_string()
        } else {
            self.database.clone()
        }
    }

    #[must_use]
    pub fn table_names(&self) -> Result<Vec<String>> {
        let schema = self.schema_name();
        let sql = format!(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = {} AND table_type = 'BASE TABLE' ORDER BY table_name",
            self.dialect.param_marker(0)
        );
        let rows = self.query(&sql, &[Value::Text(schema)])?;
        Ok(rows.iter().filter_map(|row| row.get("table_name").and_then(Value::as_str)).map(str::to_string).collect())
    }

    /// Reflects one table's full shape, or `None` if it does not exist.
    pub fn analyze_table(&self, table: &str) -> Result<Option<AnalyzedTable>> {
        if !self.table_names()?.iter().any(|name| name == table) {
            return Ok(None);
        }
        let schema = self.schema_name();
        let columns = self.columns(&schema, table)?;
        let primary_key = self.primary_key(&schema, table)?;
        let foreign_keys = self.foreign_keys(&schema, table)?;
        let indexes = self.indexes(&schema, table)?;
        let (engine, charset, collation) = self.table_options(&schema, table)?;
        Ok(Some(AnalyzedTable {
            name: table.to_string(),
            columns,
            indexes,
            foreign_keys,
            primary_key,
            engine,
            charset,
            collation,
        }))
    }

    pub fn analyze_all(&self) -> Result<Vec<AnalyzedTable>> {
        let mut tables = Vec::new();
        for name in self.table_names()? {
            if let Some(table) = self.analyze_table(&name)? {
                tables.push(table);
            }
        }
        Ok(tables)
    }

    fn columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnSpec>> {
        let sql = format!(
            "SELECT column_name, data_type, is_nullable, column_default, character_maximum_length, \
             numeric_precision, numeric_scale, datetime_precision, extra \
             FROM information_schema.columns WHERE table_schema = {} AND table_name = {} ORDER BY ordinal_position",
            self.dialect.param_marker(0),
            self.dialect.param_marker(1),
        );
        let rows = self.query(&sql, &[Value::Text(schema.to_string()), Value::Text(table.to_string())])?;
        Ok(rows.iter().map(|row| self.column_spec(row)).collect())
    }

    fn column_spec(&self, row: &Row) -> ColumnSpec {
        let name = row.get("column_name").and_then(Value::as_str).unwrap_or_default().to_string();
        let data_type = row.get("data_type").and_then(Value::as_str).unwrap_or_default().to_ascii_lowercase();
        let char_len = row.get("character_maximum_length").and_then(Value::as_i64);
        let precision = row.get("numeric_precision").and_then(Value::as_i64);
        let scale = row.get("numeric_scale").and_then(Value::as_i64);
        let datetime_precision = row.get("datetime_precision").and_then(Value::as_i64);
        let column_type = if self.is_postgres() {
            postgres_column_type(&data_type, char_len, precision, scale, datetime_precision)
        } else {
            mysql_column_type(&data_type, char_len, precision, scale, datetime_precision)
        };
        let nullable = row.get("is_nullable").and_then(Value::as_str).is_some_and(|v| v.eq_ignore_ascii_case("YES"));
        let default_raw = row.get("column_default").and_then(Value::as_str);
        let auto_increment = if self.is_postgres() {
            default_raw.is_some_and(|v| v.starts_with("nextval("))
        } else {
            row.get("extra").and_then(Value::as_str).is_some_and(|v| v.contains("auto_increment"))
        };
        let mut spec = ColumnSpec::new(name, column_type);
        spec.nullable = nullable;
        spec.auto_increment = auto_increment;
        if !auto_increment {
            spec.default = default_raw.map(classify_default);
        }
        spec
    }

    fn primary_key(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT kcu.column_name FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
             WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = {} AND tc.table_name = {} \
             ORDER BY kcu.ordinal_position",
            self.dialect.param_marker(0),
            self.dialect.param_marker(1),
        );
        let rows = self.query(&sql, &[Value::Text(schema.to_string()), Value::Text(table.to_string())])?;
        Ok(rows.iter().filter_map(|row| row.get("column_name").and_then(Value::as_str)).map(str::to_string).collect())
    }

    fn foreign_keys(&self, schema: &str, table: &str) -> Result<Vec<ForeignKeySpec>> {
        let sql = format!(
            "SELECT kcu.constraint_name, kcu.column_name, kcu.referenced_table_name, kcu.referenced_column_name, \
             rc.delete_rule, rc.update_rule \
             FROM information_schema.key_column_usage kcu \
             JOIN information_schema.referential_constraints rc \
               ON kcu.constraint_name = rc.constraint_name AND kcu.table_schema = rc.constraint_schema \
             WHERE kcu.table_schema = {} AND kcu.table_name = {} AND kcu.referenced_table_name IS NOT NULL \
             ORDER BY kcu.constraint_name, kcu.ordinal_position",
            self.dialect.param_marker(0),
            self.dialect.param_marker(1),
        );
        let rows = self.query(&sql, &[Value::Text(schema.to_string()), Value::Text(table.to_string())])?;

        let mut grouped: Vec<ForeignKeySpec> = Vec::new();
        for row in &rows {
            let name = row.get("constraint_name").and_then(Value::as_str).unwrap_or_default().to_string();
            let column = row.get("column_name").and_then(Value::as_str).unwrap_or_default().to_string();
            let referenced_table = row.get("referenced_table_name").and_then(Value::as_str).unwrap_or_default().to_string();
            let referenced_column = row.get("referenced_column_name").and_then(Value::as_str).unwrap_or_default().to_string();
            let on_delete = row.get("delete_rule").and_then(Value::as_str).map(parse_fk_action);
            let on_update = row.get("update_rule").and_then(Value::as_str).map(parse_fk_action);
            if let Some(existing) = grouped.iter_mut().find(|fk| fk.name == name) {
                existing.columns.push(column);
                existing.referenced_columns.push(referenced_column);
            } else {
                grouped.push(ForeignKeySpec {
                    name,
                    columns: vec![column],
                    referenced_table,
                    referenced_columns: vec![referenced_column],
                    on_delete,
                    on_update,
                });
            }
        }
        Ok(grouped)
    }

    /// Table-level options (spec.md §4.C8: engine, charset, collation).
    fn table_options(&self, schema: &str, table: &str) -> Result<(Option<String>, Option<String>, Option<String>)> {
        if self.is_postgres() {
            self.postgres_table_options(schema, table)
        } else {
            self.mysql_table_options(schema, table)
        }
    }

    fn mysql_table_options(&self, schema: &str, table: &str) -> Result<(Option<String>, Option<String>, Option<String>)> {
        let sql = format!(
            "SELECT engine, table_collation FROM information_schema.tables WHERE table_schema = {} AND table_name = {}",
            self.dialect.param_marker(0),
            self.dialect.param_marker(1),
        );
        let rows = self.query(&sql, &[Value::Text(schema.to_string()), Value::Text(table.to_string())])?;
        let Some(row) = rows.first() else { return Ok((None, None, None)) };
        let engine = row.get("engine").and_then(Value::as_str).map(str::to_string);
        let collation = row.get("table_collation").and_then(Value::as_str).map(str::to_string);
        let charset = collation.as_deref().and_then(|c| c.split_once('_')).map(|(charset, _)| charset.to_string());
        Ok((engine, charset, collation))
    }

    /// PostgreSQL has no per-table engine/charset: `engine` reflects the
    /// table's access method (always `heap` absent a pluggable storage
    /// extension), and charset/collation are database-wide settings.
    fn postgres_table_options(&self, schema: &str, table: &str) -> Result<(Option<String>, Option<String>, Option<String>)> {
        let engine_sql = format!(
            "SELECT am.amname AS engine FROM pg_class c \
             JOIN pg_am am ON c.relam = am.oid \
             JOIN pg_namespace n ON c.relnamespace = n.oid \
             WHERE n.nspname = {} AND c.relname = {}",
            self.dialect.param_marker(0),
            self.dialect.param_marker(1),
        );
        let engine_rows = self.query(&engine_sql, &[Value::Text(schema.to_string()), Value::Text(table.to_string())])?;
        let engine = engine_rows.first().and_then(|row| row.get("engine")).and_then(Value::as_str).map(str::to_string);

        let db_sql = "SELECT pg_encoding_to_char(encoding) AS charset, datcollate AS collation \
                      FROM pg_database WHERE datname = current_database()";
        let db_rows = self.query(db_sql, &[])?;
        let (charset, collation) = match db_rows.first() {
            Some(row) => (
                row.get("charset").and_then(Value::as_str).map(str::to_string),
                row.get("collation").and_then(Value::as_str).map(str::to_string),
            ),
            None => (None, None),
        };
        Ok((engine, charset, collation))
    }

    fn indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexSpec>> {
        if self.is_postgres() {
            self.postgres_indexes(schema, table)
        } else {
            self.mysql_indexes(schema, table)
        }
    }

    fn mysql_indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexSpec>> {
        let sql = format!(
            "SELECT index_name, column_name, non_unique, seq_in_index \
             FROM information_schema.statistics \
             WHERE table_schema = {} AND table_name = {} AND index_name <> 'PRIMARY' \
             ORDER BY index_name, seq_in_index",
            self.dialect.param_marker(0),
            self.dialect.param_marker(1),
        );
        let rows = self.query(&sql, &[Value::Text(schema.to_string()), Value::Text(table.to_string())])?;
        let mut grouped: Vec<IndexSpec> = Vec::new();
        for row in &rows {
            let name = row.get("index_name").and_then(Value::as_str).unwrap_or_default().to_string();
            let column = row.get("column_name").and_then(Value::as_str).unwrap_or_default().to_string();
            let unique = row.get("non_unique").and_then(Value::as_i64).is_some_and(|v| v == 0);
            if let Some(existing) = grouped.iter_mut().find(|ix| ix.name == name) {
                existing.columns.push(IndexColumn::new(column));
            } else {
                grouped.push(IndexSpec {
                    name,
                    kind: if unique { IndexKind::Unique } else { IndexKind::Index },
                    columns: vec![IndexColumn::new(column)],
                });
            }
        }
        Ok(grouped)
    }

    /// PostgreSQL exposes indexes as a rendered `CREATE INDEX` statement
    /// in `pg_indexes.indexdef` rather than a row-per-column catalog
    /// view; the column list is recovered from the parenthesized suffix.
    fn postgres_indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexSpec>> {
        let sql = format!(
            "SELECT indexname, indexdef FROM pg_indexes WHERE schemaname = {} AND tablename = {} AND indexname NOT LIKE '%_pkey'",
            self.dialect.param_marker(0),
            self.dialect.param_marker(1),
        );
        let rows = self.query(&sql, &[Value::Text(schema.to_string()), Value::Text(table.to_string())])?;
        let mut indexes = Vec::new();
        for row in &rows {
            let name = row.get("indexname").and_then(Value::as_str).unwrap_or_default().to_string();
            let def = row.get("indexdef").and_then(Value::as_str).unwrap_or_default();
            let unique = def.to_ascii_uppercase().contains("UNIQUE");
            let columns = def
                .split_once('(')
                .and_then(|(_, rest)| rest.rsplit_once(')'))
                .map(|(cols, _)| cols.split(',').map(|c| IndexColumn::new(c.trim().trim_matches('"'))).collect())
                .unwrap_or_default();
            indexes.push(IndexSpec { name, kind: if unique { IndexKind::Unique } else { IndexKind::Index }, columns });
        }
        Ok(indexes)
    }
}

impl<D: ConnectionDriver> CatalogReader for SchemaAnalyzer<D> {
    fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.table_names()?.iter().any(|name| name == table))
    }

    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self.analyze_table(table)?.is_some_and(|t| t.columns.iter().any(|c| c.name == column)))
    }

    fn index_exists(&self, table: &str, index: &str) -> Result<bool> {
        Ok(self.analyze_table(table)?.is_some_and(|t| t.indexes.iter().any(|i| i.name == index)))
    }

    fn foreign_key_exists(&self, table: &str, name: &str) -> Result<bool> {
        Ok(self.analyze_table(table)?.is_some_and(|t| t.foreign_keys.iter().any(|fk| fk.name == name)))
    }
}

fn parse_fk_action(rule: &str) -> ForeignKeyAction {
    match rule.to_ascii_uppercase().as_str() {
        "CASCADE" => ForeignKeyAction::Cascade,
        "SET NULL" => ForeignKeyAction::SetNull,
        "SET DEFAULT" => ForeignKeyAction::SetDefault,
        "RESTRICT" => ForeignKeyAction::Restrict,
        _ => ForeignKeyAction::NoAction,
    }
}

/// `CURRENT_TIMESTAMP`-style defaults are tagged `Function` rather than
/// a quoted literal (spec.md §4.C8); anything with a call or bare
/// keyword shape is treated as a function reference.
fn classify_default(raw: &str) -> ColumnDefault {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("null") {
        return ColumnDefault::Null;
    }
    let looks_like_function = trimmed.contains('(')
        || trimmed.eq_ignore_ascii_case("CURRENT_TIMESTAMP")
        || trimmed.eq_ignore_ascii_case("CURRENT_DATE")
        || trimmed.eq_ignore_ascii_case("CURRENT_TIME");
    if looks_like_function {
        ColumnDefault::Function(trimmed.to_string())
    } else {
        ColumnDefault::Literal(trimmed.trim_matches('\'').to_string())
    }
}

fn mysql_column_type(
    data_type: &str,
    char_len: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
    datetime_precision: Option<i64>,
) -> ColumnType {
    match data_type {
        "tinyint" => ColumnType::Integer { bits: IntegerWidth::TinyInt, unsigned: false },
        "smallint" | "mediumint" => ColumnType::Integer { bits: IntegerWidth::SmallInt, unsigned: false },
        "int" => ColumnType::Integer { bits: IntegerWidth::Int, unsigned: false },
        "bigint" => ColumnType::Integer { bits: IntegerWidth::BigInt, unsigned: false },
        "varchar" => ColumnType::Varchar { length: char_len.unwrap_or(255) as u32 },
        "char" => ColumnType::Char { length: char_len.unwrap_or(1) as u32 },
        "tinytext" => ColumnType::Text { size: TextSize::Tiny },
        "text" => ColumnType::Text { size: TextSize::Regular },
        "mediumtext" => ColumnType::Text { size: TextSize::Medium },
        "longtext" => ColumnType::Text { size: TextSize::Long },
        "decimal" | "numeric" => {
            ColumnType::Decimal { precision: precision.unwrap_or(10) as u8, scale: scale.unwrap_or(0) as u8 }
        }
        "float" => ColumnType::Float,
        "double" => ColumnType::Double,
        "tinyint(1)" | "bool" | "boolean" => ColumnType::Boolean,
        "date" => ColumnType::Date,
        "time" => ColumnType::Time { precision: datetime_precision.map(|p| p as u8) },
        "datetime" | "timestamp" => ColumnType::Timestamp { precision: datetime_precision.map(|p| p as u8) },
        "json" => ColumnType::Json,
        "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => {
            ColumnType::Binary { length: char_len.map(|l| l as u32) }
        }
        "enum" => ColumnType::Enum { values: Vec::new() },
        "set" => ColumnType::Set { values: Vec::new() },
        other => {
            log::warn!("unrecognized MySQL data type `{other}`, falling back to TEXT");
            ColumnType::Text { size: TextSize::Regular }
        }
    }
}

fn postgres_column_type(
    data_type: &str,
    char_len: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
    datetime_precision: Option<i64>,
) -> ColumnType {
    match data_type {
        "smallint" => ColumnType::Integer { bits: IntegerWidth::SmallInt, unsigned: false },
        "integer" => ColumnType::Integer { bits: IntegerWidth::Int, unsigned: false },
        "bigint" => ColumnType::Integer { bits: IntegerWidth::BigInt, unsigned: false },
        "character varying" => ColumnType::Varchar { length: char_len.unwrap_or(255) as u32 },
        "character" => ColumnType::Char { length: char_len.unwrap_or(1) as u32 },
        "text" => ColumnType::Text { size: TextSize::Regular },
        "numeric" => ColumnType::Decimal { precision: precision.unwrap_or(10) as u8, scale: scale.unwrap_or(0) as u8 },
        "real" => ColumnType::Float,
        "double precision" => ColumnType::Double,
        "boolean" => ColumnType::Boolean,
        "date" => ColumnType::Date,
        "time without time zone" | "time with time zone" => {
            ColumnType::Time { precision: datetime_precision.map(|p| p as u8) }
        }
        "timestamp without time zone" | "timestamp with time zone" => {
            ColumnType::Timestamp { precision: datetime_precision.map(|p| p as u8) }
        }
        "json" => ColumnType::Json,
        "jsonb" => ColumnType::Jsonb,
        "uuid" => ColumnType::Uuid,
        "inet" => ColumnType::Ip,
        "macaddr" => ColumnType::Mac,
        "bytea" => ColumnType::Binary { length: None },
        "USER-DEFINED" | "ARRAY" => {
            log::warn!("enum/array PostgreSQL type reflected as TEXT; named type is not resolved");
            ColumnType::Text { size: TextSize::Regular }
        }
        other => {
            log::warn!("unrecognized PostgreSQL data type `{other}`, falling back to TEXT");
            ColumnType::Text { size: TextSize::Regular }
        }
    }
}

