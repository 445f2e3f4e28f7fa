use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dbkit_core::cache::{Cache, CachedValue, MemoryCache};
use dbkit_core::dialect::Dialect;
use dbkit_core::driver::ConnectionDriver;
use dbkit_core::error::{MetadataError, Result};
use dbkit_core::ir::{ColumnSpec, ColumnType, IntegerWidth, TableSpec, TextSize};
use dbkit_core::row::{Row, Value};
use dbkit_core::schema_builder::SchemaBuilder;

use crate::types::{BackupRecord, BackupType, StorageKind};

const TABLE_NAME: &str = "dbkit_backups";
const LIST_CACHE_KEY: &str = "dbkit_backups::list";
const LIST_CACHE_TTL: Duration = Duration::from_secs(300);

/// Bookkeeping table for completed backups (spec.md §4.C10): created
/// idempotently on first use, `list()` cached in memory the same way
/// the Result Cache caches query output, invalidated on every write.
pub struct MetadataStore<D: ConnectionDriver> {
    driver: RefCell<D>,
    dialect: Arc<dyn Dialect>,
    cache: MemoryCache,
    ensured: RefCell<bool>,
}

impl<D: ConnectionDriver> MetadataStore<D> {
    pub fn new(driver: D, dialect: Arc<dyn Dialect>) -> Self {
        Self { driver: RefCell::new(driver), dialect, cache: MemoryCache::new(), ensured: RefCell::new(false) }
    }

    fn table_spec() -> TableSpec {
        let mut spec = TableSpec::new(TABLE_NAME);
        spec.if_not_exists = true;
        spec.columns = vec![
            ColumnSpec::new("id", ColumnType::Varchar { length: 64 }),
            ColumnSpec::new("name", ColumnType::Varchar { length: 255 }),
            ColumnSpec::new("database_name", ColumnType::Varchar { length: 255 }),
            ColumnSpec::new("backup_type", ColumnType::Varchar { length: 32 }),
            ColumnSpec::new("size_bytes", ColumnType::Integer { bits: IntegerWidth::BigInt, unsigned: false }),
            ColumnSpec::new("checksum", ColumnType::Varchar { length: 64 }),
            ColumnSpec::new("storage_kind", ColumnType::Varchar { length: 16 }),
            ColumnSpec::new("storage_path", ColumnType::Varchar { length: 1024 }),
            ColumnSpec::new("metadata", ColumnType::Text { size: TextSize::Regular }),
            ColumnSpec::new("created_at", ColumnType::Integer { bits: IntegerWidth::BigInt, unsigned: false }),
        ];
        spec.primary_key = vec!["id".to_string()];
        spec
    }

    /// Creates the metadata table if it doesn't exist yet. Cheap to call
    /// on every orchestrator operation: guarded by `ensured` so a
    /// connection only ever issues the DDL once.
    pub fn ensure_table(&self) -> Result<()> {
        if *self.ensured.borrow() {
            return Ok(());
        }
        let builder = SchemaBuilder::new(self.dialect.as_ref());
        let sql = builder.create_table_sql(&Self::table_spec());
        self.raw_execute(&sql, &[])?;
        *self.ensured.borrow_mut() = true;
        Ok(())
    }

    fn raw_execute(&self, sql: &str, params: &[Value]) -> Result<dbkit_core::driver::ExecResult> {
        let mut driver = self.driver.borrow_mut();
        let stmt = driver.prepare(sql)?;
        driver.execute(&stmt, params)
    }

    pub fn insert(&self, record: &BackupRecord) -> Result<()> {
        self.ensure_table()?;
        let sql = format!(
            "INSERT INTO {table} (id, name, database_name, backup_type, size_bytes, checksum, storage_kind, storage_path, metadata, created_at) VALUES ({p0}, {p1}, {p2}, {p3}, {p4}, {p5}, {p6}, {p7}, {p8}, {p9})",
            table = self.dialect.quote_ident(TABLE_NAME),
            p0 = self.dialect.param_marker(0),
            p1 = self.dialect.param_marker(1),
            p2 = self.dialect.param_marker(2),
            p3 = self.dialect.param_marker(3),
            p4 = self.dialect.param_marker(4),
            p5 = self.dialect.param_marker(5),
            p6 = self.dialect.param_marker(6),
            p7 = self.dialect.param_marker(7),
            p8 = self.dialect.param_marker(8),
            p9 = self.dialect.param_marker(9),
        );
        let params = vec![
            Value::Text(record.id.clone()),
            Value::Text(record.name.clone()),
            Value::Text(record.database.clone()),
            Value::Text(record.backup_type.as_str().to_string()),
            Value::Int(record.size_bytes as i64),
            Value::Text(record.checksum.clone()),
            Value::Text(record.storage_kind.as_str().to_string()),
            Value::Text(record.storage_path.clone()),
            Value::Text(encode_metadata(&record.metadata)),
            Value::Int(record.created_at as i64),
        ];
        self.raw_execute(&sql, &params)?;
        self.cache.delete(LIST_CACHE_KEY)?;
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.ensure_table()?;
        let sql = format!(
            "DELETE FROM {table} WHERE id = {p0}",
            table = self.dialect.quote_ident(TABLE_NAME),
            p0 = self.dialect.param_marker(0)
        );
        self.raw_execute(&sql, &[Value::Text(id.to_string())])?;
        self.cache.delete(LIST_CACHE_KEY)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<BackupRecord>> {
        self.ensure_table()?;
        let sql = format!(
            "SELECT * FROM {table} WHERE id = {p0}",
            table = self.dialect.quote_ident(TABLE_NAME),
            p0 = self.dialect.param_marker(0)
        );
        let result = self.raw_execute(&sql, &[Value::Text(id.to_string())])?;
        Ok(result.rows.first().map(row_to_record).transpose()?)
    }

    pub fn list(&self) -> Result<Vec<BackupRecord>> {
        self.ensure_table()?;
        if let Some(cached) = self.cache.get(LIST_CACHE_KEY)? {
            return decode_cached_records(&cached);
        }
        let sql = format!(
            "SELECT * FROM {table} ORDER BY created_at DESC",
            table = self.dialect.quote_ident(TABLE_NAME)
        );
        let result = self.raw_execute(&sql, &[])?;
        let records: Vec<BackupRecord> = result.rows.iter().map(row_to_record).collect::<Result<_>>()?;
        self.cache.set(LIST_CACHE_KEY, encode_cached_records(&records), LIST_CACHE_TTL)?;
        Ok(records)
    }
}

fn encode_metadata(metadata: &BTreeMap<String, String>) -> String {
    metadata
        .iter()
        .map(|(key, value)| format!("{}={}", key.replace([';', '='], "_"), value.replace([';', '='], "_")))
        .collect::<Vec<_>>()
        .join(";")
}

fn decode_metadata(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn row_to_record(row: &Row) -> Result<BackupRecord> {
    let text = |column: &str| -> String {
        row.get(column).and_then(Value::as_str).map(str::to_string).unwrap_or_default()
    };
    let int = |column: &str| -> i64 { row.get(column).and_then(Value::as_i64).unwrap_or_default() };

    let backup_type = BackupType::parse(&text("backup_type")).ok_or_else(|| MetadataError {
        message: format!("unrecognized backup_type `{}`", text("backup_type")),
    })?;
    let storage_kind = StorageKind::parse(&text("storage_kind")).ok_or_else(|| MetadataError {
        message: format!("unrecognized storage_kind `{}`", text("storage_kind")),
    })?;

    Ok(BackupRecord {
        id: text("id"),
        name: text("name"),
        database: text("database_name"),
        backup_type,
        size_bytes: int("size_bytes") as u64,
        checksum: text("checksum"),
        storage_kind,
        storage_path: text("storage_path"),
        metadata: decode_metadata(&text("metadata")),
        created_at: int("created_at") as u64,
    })
}

/// Flattens a record list into the `Vec<Value>` shape `MemoryCache`
/// stores (spec.md §4.C6's `CachedValue`): a leading count followed by
/// ten `Value`s per record, in the same column order as the table.
fn encode_cached_records(records: &[BackupRecord]) -> CachedValue {
    let mut values = vec![Value::Int(records.len() as i64)];
    for record in records {
        values.push(Value::Text(record.id.clone()));
        values.push(Value::Text(record.name.clone()));
        values.push(Value::Text(record.database.clone()));
        values.push(Value::Text(record.backup_type.as_str().to_string()));
        values.push(Value::Int(record.size_bytes as i64));
        values.push(Value::Text(record.checksum.clone()));
        values.push(Value::Text(record.storage_kind.as_str().to_string()));
        values.push(Value::Text(record.storage_path.clone()));
        values.push(Value::Text(encode_metadata(&record.metadata)));
        values.push(Value::Int(record.created_at as i64));
    }
    values
}

fn decode_cached_records(values: &[Value]) -> Result<Vec<BackupRecord>> {
    const FIELDS: usize = 10;
    let count = values.first().and_then(Value::as_i64).unwrap_or(0) as usize;
    let mut records = Vec::with_capacity(count);
    for chunk in values[1..].chunks(FIELDS).take(count) {
        let as_text = |index: usize| chunk[index].as_str().unwrap_or_default().to_string();
        let as_int = |index: usize| chunk[index].as_i64().unwrap_or_default();
        let backup_type = BackupType::parse(&as_text(3))
            .ok_or_else(|| MetadataError { message: "corrupt cached backup_type".to_string() })?;
        let storage_kind = StorageKind::parse(&as_text(6))
            .ok_or_else(|| MetadataError { message: "corrupt cached storage_kind".to_string() })?;
        records.push(BackupRecord {
            id: as_text(0),
            name: as_text(1),
            database: as_text(2),
            backup_type,
            size_bytes: as_int(4) as u64,
            checksum: as_text(5),
            storage_kind,
            storage_path: as_text(7),
            metadata: decode_metadata(&as_text(8)),
            created_at: as_int(9) as u64,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbkit_core::driver::{ExecResult, PreparedStatement};
    use dbkit_core::test_support::PlainDialect;
    use std::cell::RefCell as StdRefCell;

    struct FakeDriver {
        rows: StdRefCell<Vec<Row>>,
    }

    impl ConnectionDriver for FakeDriver {
        fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
            Ok(PreparedStatement::new(sql))
        }

        fn execute(&mut self, stmt: &PreparedStatement, _params: &[Value]) -> Result<ExecResult> {
            if stmt.sql.starts_with("INSERT") {
                return Ok(ExecResult { rows: Vec::new(), affected_rows: 1, last_insert_id: None });
            }
            if stmt.sql.starts_with("DELETE") {
                return Ok(ExecResult { rows: Vec::new(), affected_rows: 1, last_insert_id: None });
            }
            Ok(ExecResult { rows: self.rows.borrow().clone(), affected_rows: 0, last_insert_id: None })
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

    fn sample_row() -> Row {
        Row::new(vec![
            ("id".to_string(), Value::Text("bkp_1".to_string())),
            ("name".to_string(), Value::Text("nightly".to_string())),
            ("database_name".to_string(), Value::Text("app".to_string())),
            ("backup_type".to_string(), Value::Text("full".to_string())),
            ("size_bytes".to_string(), Value::Int(1024)),
            ("checksum".to_string(), Value::Text("abc123".to_string())),
            ("storage_kind".to_string(), Value::Text("local".to_string())),
            ("storage_path".to_string(), Value::Text("/backups/bkp_1".to_string())),
            ("metadata".to_string(), Value::Text("env=prod".to_string())),
            ("created_at".to_string(), Value::Int(1_700_000_000)),
        ])
    }

    #[test]
    fn list_is_cached_until_the_next_write() {
        let driver = FakeDriver { rows: StdRefCell::new(vec![sample_row()]) };
        let store = MetadataStore::new(driver, Arc::new(PlainDialect));
        let first = store.list().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "nightly");

        store.driver.borrow_mut().rows = StdRefCell::new(Vec::new());
        let cached = store.list().unwrap();
        assert_eq!(cached.len(), 1, "cached list must not observe the underlying rows changing");

        let record = BackupRecord {
            id: "bkp_2".to_string(),
            name: "manual".to_string(),
            database: "app".to_string(),
            backup_type: BackupType::Full,
            size_bytes: 1,
            checksum: "x".to_string(),
            storage_kind: StorageKind::Local,
            storage_path: "/backups/bkp_2".to_string(),
            metadata: BTreeMap::new(),
            created_at: 1,
        };
        store.insert(&record).unwrap();
        let after_write = store.list().unwrap();
        assert_eq!(after_write.len(), 0, "insert must invalidate the cached list");
    }
}
