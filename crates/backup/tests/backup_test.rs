use std::sync::Arc;

use dbkit_backup::{BackupConfig, BackupOrchestrator, BackupType, LocalStorage};
use dbkit_core::driver::{ConnectionDriver, ExecResult, PreparedStatement};
use dbkit_core::error::Result;
use dbkit_core::row::{Row, Value};
use dbkit_core::test_support::PlainDialect;

/// Fakes a single `widgets` table with two rows, enough for the
/// orchestrator to exercise schema reflection, dump assembly, and
/// parameterized restore without a live server.
#[derive(Default)]
struct FakeDriver;

impl ConnectionDriver for FakeDriver {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        Ok(PreparedStatement::new(sql))
    }

    fn execute(&mut self, stmt: &PreparedStatement, _params: &[Value]) -> Result<ExecResult> {
        let rows = if stmt.sql.contains("information_schema.tables") {
            vec![Row::new(vec![("table_name".to_string(), Value::Text("widgets".to_string()))])]
        } else if stmt.sql.starts_with("SELECT * FROM") {
            vec![
                Row::new(vec![
                    ("id".to_string(), Value::Int(1)),
                    ("label".to_string(), Value::Text("alpha".to_string())),
                ]),
                Row::new(vec![
                    ("id".to_string(), Value::Int(2)),
                    ("label".to_string(), Value::Text("beta".to_string())),
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

    fn chunked_query(&mut self, sql: &str, params: &[Value], chunk_size: usize) -> Result<Vec<Vec<Row>>> {
        let mut driver = FakeDriver;
        let stmt = driver.prepare(sql)?;
        let rows = driver.execute(&stmt, params)?.rows;
        Ok(rows.chunks(chunk_size.max(1)).map(<[Row]>::to_vec).collect())
    }
}

fn orchestrator(dir: &std::path::Path) -> BackupOrchestrator<FakeDriver> {
    let storage = LocalStorage::new(dir).unwrap();
    BackupOrchestrator::new(Box::new(|| Ok(FakeDriver)), Arc::new(PlainDialect), Box::new(storage)).unwrap()
}

fn temp_dir(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("dbkit-backup-test-{label}-{:x}", rand::random::<u64>()))
}

#[test]
fn full_backup_round_trips_through_restore() {
    let dir = temp_dir("full");
    let orchestrator = orchestrator(&dir);
    let config = BackupConfig::new("nightly", "app", BackupType::Full);

    let result = orchestrator.backup(&config);
    assert!(result.success, "{:?}", result.error);
    let record = result.record.unwrap();

    let restore = orchestrator.restore(record.id.as_str()).target_database("app_restored").execute();
    assert!(restore.success, "{:?}", restore.error);
    assert_eq!(restore.tables_restored, vec!["widgets".to_string()]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn schema_only_backup_restores_ddl_but_no_table_data() {
    let dir = temp_dir("schema-only");
    let orchestrator = orchestrator(&dir);
    let config = BackupConfig::new("ddl-only", "app", BackupType::SchemaOnly);

    let result = orchestrator.backup(&config);
    assert!(result.success, "{:?}", result.error);
    let record = result.record.unwrap();

    let restore = orchestrator.restore(record.id.as_str()).execute();
    assert!(restore.success, "{:?}", restore.error);
    assert!(restore.tables_restored.is_empty(), "schema-only backups carry no table data to restore");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn compressed_and_encrypted_backup_still_verifies() {
    let dir = temp_dir("crypto");
    let orchestrator = orchestrator(&dir);
    let mut config = BackupConfig::new("secure", "app", BackupType::Full);
    config.compression = dbkit_backup::Compression::Gzip;
    config.encryption = dbkit_backup::Encryption::Aes256Cbc { key: [11u8; 32] };
    config.verify_after_backup = true;

    let result = orchestrator.backup(&config);
    assert!(result.success, "{:?}", result.error);
    let record = result.record.unwrap();
    assert!(orchestrator.verify(&record.id).unwrap());

    let restore = orchestrator.restore(record.id.as_str()).encryption_key([11u8; 32]).execute();
    assert!(restore.success, "{:?}", restore.error);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn renamed_restore_targets_the_renamed_table() {
    let dir = temp_dir("rename");
    let orchestrator = orchestrator(&dir);
    let config = BackupConfig::new("nightly", "app", BackupType::Full);
    let record = orchestrator.backup(&config).record.unwrap();

    let restore = orchestrator.restore(record.id.as_str()).rename_table("widgets", "widgets_archive").execute();
    assert!(restore.success, "{:?}", restore.error);
    assert_eq!(restore.tables_restored, vec!["widgets_archive".to_string()]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn incremental_backup_uses_the_streaming_strategy() {
    let dir = temp_dir("incremental");
    let orchestrator = orchestrator(&dir);
    let mut config = BackupConfig::new("delta", "app", BackupType::Incremental);
    config.chunk_size = 1;
    assert!(config.uses_streaming());

    let result = orchestrator.backup(&config);
    assert!(result.success, "{:?}", result.error);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn deleting_a_backup_removes_it_from_subsequent_listings() {
    let dir = temp_dir("delete");
    let orchestrator = orchestrator(&dir);
    let config = BackupConfig::new("temp", "app", BackupType::Full);
    let record = orchestrator.backup(&config).record.unwrap();
    assert_eq!(orchestrator.list().unwrap().len(), 1);

    orchestrator.delete(&record.id).unwrap();
    assert!(orchestrator.list().unwrap().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}
