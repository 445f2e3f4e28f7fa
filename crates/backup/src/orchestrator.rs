use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dbkit_core::dialect::Dialect;
use dbkit_core::driver::ConnectionDriver;
use dbkit_core::error::{MetadataError, Result};
use dbkit_schema::{AnalyzedTable, SchemaAnalyzer};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::compression;
use crate::crypto;
use crate::dump::{self, Dump};
use crate::metadata::MetadataStore;
use crate::restore::RestoreBuilder;
use crate::storage::StorageAdapter;
use crate::types::{BackupConfig, BackupRecord, BackupResult, Encryption};

/// Opens a fresh driver connection. Mirrors the pool crate's
/// `DriverFactory`: the orchestrator needs independent connections for
/// schema reflection, data dumping, and metadata bookkeeping, the same
/// way a pooled application would check out separate connections for
/// concurrent concerns rather than serialize them on one handle.
pub type DriverFactory<D> = Box<dyn Fn() -> Result<D> + Send + Sync>;

/// Coordinates backup/restore over a database (spec.md §4.C10): schema
/// reflection via [`dbkit_schema`], dump assembly, compression,
/// encryption, storage, and a metadata table recording what was taken.
pub struct BackupOrchestrator<D: ConnectionDriver> {
    factory: DriverFactory<D>,
    dialect: Arc<dyn Dialect>,
    storage: Box<dyn StorageAdapter>,
    metadata: MetadataStore<D>,
}

impl<D: ConnectionDriver> BackupOrchestrator<D> {
    pub fn new(factory: DriverFactory<D>, dialect: Arc<dyn Dialect>, storage: Box<dyn StorageAdapter>) -> Result<Self> {
        let metadata_driver = factory()?;
        let metadata = MetadataStore::new(metadata_driver, dialect.clone());
        Ok(Self { factory, dialect, storage, metadata })
    }

    pub fn list(&self) -> Result<Vec<BackupRecord>> {
        self.metadata.list()
    }

    pub fn get(&self, id: &str) -> Result<Option<BackupRecord>> {
        self.metadata.get(id)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.storage.delete(id)?;
        self.metadata.delete(id)
    }

    pub fn restore(&self, backup_id: impl Into<String>) -> RestoreBuilder<'_, D> {
        RestoreBuilder::new(self, backup_id.into())
    }

    pub(crate) fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub(crate) fn open_connection(&self) -> Result<D> {
        (self.factory)()
    }

    /// Recomputes the SHA-256 of the artifact exactly as stored (after
    /// compression and encryption) and compares it to the recorded
    /// checksum. Never needs the encryption key (spec.md §4.C10).
    pub fn verify(&self, id: &str) -> Result<bool> {
        let record = self
            .metadata
            .get(id)?
            .ok_or_else(|| MetadataError { message: format!("no backup record for `{id}`") })?;
        self.verify_stored(id, &record.checksum)
    }

    fn verify_stored(&self, id: &str, expected_checksum: &str) -> Result<bool> {
        if !self.storage.exists(id)? {
            return Ok(false);
        }
        let bytes = self.storage.retrieve(id)?;
        Ok(sha256_hex(&bytes) == expected_checksum)
    }

    pub fn backup(&self, config: &BackupConfig) -> BackupResult {
        let mut stored_id: Option<String> = None;
        match self.try_backup(config, &mut stored_id) {
            Ok(record) => BackupResult::ok(record),
            Err(e) => {
                if let Some(id) = stored_id {
                    if let Err(cleanup_err) = self.storage.delete(&id) {
                        log::warn!("failed to clean up partial backup artifact `{id}`: {cleanup_err}");
                    }
                }
                BackupResult::failed(e.to_string())
            }
        }
    }

    fn try_backup(&self, config: &BackupConfig, stored_id: &mut Option<String>) -> Result<BackupRecord> {
        let tables = self.analyze_tables(config)?;

        let mut data_driver = self.open_connection()?;
        let dump = dump::build(&mut data_driver, self.dialect.as_ref(), &tables, config)?;
        let raw = dump.to_bytes();

        let compressed = compression::compress(config.compression, &raw)?;
        let final_bytes = match &config.encryption {
            Encryption::None => compressed,
            Encryption::Aes256Cbc { key } => crypto::encrypt(key, &compressed),
        };
        let checksum = sha256_hex(&final_bytes);
        let id = generate_id(&config.name);

        self.storage.store(&id, &final_bytes)?;
        *stored_id = Some(id.clone());

        if config.verify_after_backup && !self.verify_stored(&id, &checksum)? {
            return Err(MetadataError { message: format!("backup `{id}` failed verification after write") }.into());
        }

        if config.generate_migrations {
            self.try_generate_migrations(&id, &tables);
        }

        let record = BackupRecord {
            id,
            name: config.name.clone(),
            database: config.database.clone(),
            backup_type: config.backup_type,
            size_bytes: final_bytes.len() as u64,
            checksum,
            storage_kind: config.storage,
            storage_path: stored_id.clone().expect("id was just set"),
            metadata: backup_metadata(config),
            created_at: now_unix(),
        };
        self.metadata.insert(&record)?;
        Ok(record)
    }

    fn analyze_tables(&self, config: &BackupConfig) -> Result<Vec<AnalyzedTable>> {
        let analyzer_driver = self.open_connection()?;
        let analyzer = SchemaAnalyzer::new(analyzer_driver, self.dialect.clone(), config.database.clone());
        Ok(analyzer.analyze_all()?.into_iter().filter(|table| config.wants_table(&table.name)).collect())
    }

    /// Generates migration files (C9) alongside the backup. Failures are
    /// logged, never propagated: a backup that otherwise succeeded must
    /// not be thrown away because its optional migration export failed
    /// to persist (spec.md §4.C10).
    fn try_generate_migrations(&self, backup_id: &str, tables: &[AnalyzedTable]) {
        let artifacts = dbkit_schema::generate(tables, self.dialect.as_ref(), &dbkit_schema::GeneratorOptions::default());
        let mut rendered = String::new();
        for artifact in &artifacts {
            rendered.push_str(&format!("-- up: {}\n", artifact.name));
            for statement in &artifact.up {
                rendered.push_str(statement);
                rendered.push_str(";\n");
            }
            rendered.push_str(&format!("-- down: {}\n", artifact.name));
            for statement in &artifact.down {
                rendered.push_str(statement);
                rendered.push_str(";\n");
            }
        }
        if let Err(e) = self.storage.store(&format!("{backup_id}.migrations"), rendered.as_bytes()) {
            log::warn!("migration generation for backup `{backup_id}` failed to persist: {e}");
        }
    }

    pub(crate) fn load_dump(&self, record: &BackupRecord, encryption_key: Option<&[u8; 32]>) -> Result<Dump> {
        let stored = self.storage.retrieve(&record.id)?;
        let decrypted = match encryption_key {
            Some(key) => crypto::decrypt(key, &stored)?,
            None => stored,
        };
        let compression = record
            .metadata
            .get("compression")
            .and_then(|raw| match raw.as_str() {
                "gzip" => Some(crate::types::Compression::Gzip),
                "bzip2" => Some(crate::types::Compression::Bzip2),
                _ => Some(crate::types::Compression::None),
            })
            .unwrap_or_default();
        let raw = compression::decompress(compression, &decrypted)?;
        Dump::from_bytes(&raw)
    }
}

fn backup_metadata(config: &BackupConfig) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("compression".to_string(), config.compression.as_str().to_string());
    metadata.insert("encryption".to_string(), config.encryption.as_str().to_string());
    if let Some(description) = &config.description {
        metadata.insert("description".to_string(), description.clone());
    }
    if !config.tags.is_empty() {
        metadata.insert("tags".to_string(), config.tags.join(","));
    }
    metadata
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn generate_id(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let mut suffix = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut suffix);
    let suffix = suffix.iter().map(|byte| format!("{byte:02x}")).collect::<String>();
    format!("{slug}-{}-{suffix}", now_unix())
}

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackupConfig, BackupType};
    use dbkit_core::driver::{ExecResult, PreparedStatement};
    use dbkit_core::row::{Row, Value};
    use dbkit_core::test_support::PlainDialect;

    #[derive(Default)]
    struct FakeDriver;

    impl ConnectionDriver for FakeDriver {
        fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
            Ok(PreparedStatement::new(sql))
        }

        fn execute(&mut self, stmt: &PreparedStatement, _params: &[Value]) -> Result<ExecResult> {
            if stmt.sql.contains("information_schema.tables") {
                return Ok(ExecResult {
                    rows: vec![Row::new(vec![("table_name".to_string(), Value::Text("widgets".to_string()))])],
                    affected_rows: 0,
                    last_insert_id: None,
                });
            }
            if stmt.sql.starts_with("SELECT * FROM") {
                return Ok(ExecResult {
                    rows: vec![Row::new(vec![
                        ("id".to_string(), Value::Int(1)),
                        ("label".to_string(), Value::Text("alpha".to_string())),
                    ])],
                    affected_rows: 0,
                    last_insert_id: None,
                });
            }
            Ok(ExecResult { rows: Vec::new(), affected_rows: 0, last_insert_id: None })
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

    fn orchestrator(dir: &std::path::Path) -> BackupOrchestrator<FakeDriver> {
        let storage = crate::storage::LocalStorage::new(dir).unwrap();
        BackupOrchestrator::new(
            Box::new(|| Ok(FakeDriver::default())),
            Arc::new(PlainDialect),
            Box::new(storage),
        )
        .unwrap()
    }

    #[test]
    fn backup_writes_an_artifact_and_a_metadata_record() {
        let dir = std::env::temp_dir().join(format!("dbkit-backup-orch-{:x}", std::process::id()));
        let orchestrator = orchestrator(&dir);
        let config = BackupConfig::new("nightly", "app", BackupType::Full);
        let result = orchestrator.backup(&config);
        assert!(result.success, "{:?}", result.error);
        let record = result.record.unwrap();
        assert!(orchestrator.verify(&record.id).unwrap());
        assert_eq!(orchestrator.list().unwrap().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    /// Stores bytes untouched but hands back corrupted bytes on
    /// `retrieve`, standing in for an artifact that was damaged in
    /// transit to storage.
    struct TamperingStorage {
        inner: crate::storage::LocalStorage,
    }

    impl StorageAdapter for TamperingStorage {
        fn store(&self, id: &str, bytes: &[u8]) -> Result<()> {
            self.inner.store(id, bytes)
        }

        fn retrieve(&self, id: &str) -> Result<Vec<u8>> {
            let mut bytes = self.inner.retrieve(id)?;
            if let Some(first) = bytes.first_mut() {
                *first ^= 0xff;
            }
            Ok(bytes)
        }

        fn exists(&self, id: &str) -> Result<bool> {
            self.inner.exists(id)
        }

        fn delete(&self, id: &str) -> Result<()> {
            self.inner.delete(id)
        }
    }

    #[test]
    fn failed_verification_deletes_the_partial_artifact_and_writes_no_record() {
        let dir = std::env::temp_dir().join(format!("dbkit-backup-orch-verify-{:x}", std::process::id()));
        let storage = TamperingStorage { inner: crate::storage::LocalStorage::new(&dir).unwrap() };
        let orchestrator = BackupOrchestrator::new(
            Box::new(|| Ok(FakeDriver::default())),
            Arc::new(PlainDialect),
            Box::new(storage),
        )
        .unwrap();

        let mut config = BackupConfig::new("nightly", "app", BackupType::Full);
        config.verify_after_backup = true;
        let result = orchestrator.backup(&config);

        assert!(!result.success);
        assert!(result.record.is_none());
        assert!(orchestrator.list().unwrap().is_empty(), "no record should be written on verification failure");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
