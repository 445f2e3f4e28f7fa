use std::collections::BTreeMap;

use dbkit_core::driver::ConnectionDriver;
use dbkit_core::error::{MetadataError, Result};
use dbkit_core::row::Value;
use dbkit_core::schema_builder::SchemaBuilder;

use crate::orchestrator::BackupOrchestrator;
use crate::types::RestoreResult;

type Hook = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// Fluent restore configuration over a previously taken backup (spec.md
/// §4.C10). Built up with `with_*`-free setter methods the way
/// `dbkit_core::schema_builder::TableBuilder` chains column modifiers,
/// then consumed by [`RestoreBuilder::execute`].
pub struct RestoreBuilder<'a, D: ConnectionDriver> {
    orchestrator: &'a BackupOrchestrator<D>,
    backup_id: String,
    target_database: Option<String>,
    include_tables: Option<Vec<String>>,
    exclude_tables: Vec<String>,
    skip_schema: bool,
    skip_data: bool,
    drop_existing: bool,
    rename: BTreeMap<String, String>,
    pre_hook: Option<Hook>,
    post_hook: Option<Hook>,
    snapshot_before_restore: bool,
    encryption_key: Option<[u8; 32]>,
    point_in_time: Option<u64>,
    binlog_path: Option<String>,
}

impl<'a, D: ConnectionDriver> RestoreBuilder<'a, D> {
    pub(crate) fn new(orchestrator: &'a BackupOrchestrator<D>, backup_id: String) -> Self {
        Self {
            orchestrator,
            backup_id,
            target_database: None,
            include_tables: None,
            exclude_tables: Vec::new(),
            skip_schema: false,
            skip_data: false,
            drop_existing: false,
            rename: BTreeMap::new(),
            pre_hook: None,
            post_hook: None,
            snapshot_before_restore: false,
            encryption_key: None,
            point_in_time: None,
            binlog_path: None,
        }
    }

    #[must_use]
    pub fn target_database(mut self, database: impl Into<String>) -> Self {
        self.target_database = Some(database.into());
        self
    }

    #[must_use]
    pub fn include_tables(mut self, tables: Vec<String>) -> Self {
        self.include_tables = Some(tables);
        self
    }

    #[must_use]
    pub fn exclude_table(mut self, table: impl Into<String>) -> Self {
        self.exclude_tables.push(table.into());
        self
    }

    #[must_use]
    pub fn skip_schema(mut self) -> Self {
        self.skip_schema = true;
        self
    }

    #[must_use]
    pub fn skip_data(mut self) -> Self {
        self.skip_data = true;
        self
    }

    #[must_use]
    pub fn drop_existing(mut self) -> Self {
        self.drop_existing = true;
        self
    }

    #[must_use]
    pub fn rename_table(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.insert(from.into(), to.into());
        self
    }

    #[must_use]
    pub fn before(mut self, hook: impl Fn() -> Result<()> + Send + Sync + 'static) -> Self {
        self.pre_hook = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn after(mut self, hook: impl Fn() -> Result<()> + Send + Sync + 'static) -> Self {
        self.post_hook = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn snapshot_before_restore(mut self) -> Self {
        self.snapshot_before_restore = true;
        self
    }

    #[must_use]
    pub fn encryption_key(mut self, key: [u8; 32]) -> Self {
        self.encryption_key = Some(key);
        self
    }

    /// Replays `binlog_path` up to `unix_timestamp` after the base
    /// restore completes. Recorded on the builder; actual binlog replay
    /// is outside this crate's scope (see DESIGN.md) and callers drive
    /// it themselves with the recorded path and cutoff.
    #[must_use]
    pub fn point_in_time(mut self, unix_timestamp: u64, binlog_path: impl Into<String>) -> Self {
        self.point_in_time = Some(unix_timestamp);
        self.binlog_path = Some(binlog_path.into());
        self
    }

    fn wants_table(&self, table: &str) -> bool {
        if self.exclude_tables.iter().any(|excluded| excluded == table) {
            return false;
        }
        match &self.include_tables {
            Some(included) => included.iter().any(|name| name == table),
            None => true,
        }
    }

    fn target_name(&self, table: &str) -> String {
        self.rename.get(table).cloned().unwrap_or_else(|| table.to_string())
    }

    pub fn execute(self) -> RestoreResult {
        match self.try_execute() {
            Ok(result) => result,
            Err(e) => RestoreResult { success: false, tables_restored: Vec::new(), error: Some(e.to_string()) },
        }
    }

    fn try_execute(&self) -> Result<RestoreResult> {
        let record = self
            .orchestrator
            .get(&self.backup_id)?
            .ok_or_else(|| MetadataError { message: format!("no backup record for `{}`", self.backup_id) })?;

        if self.snapshot_before_restore {
            let snapshot_config = crate::types::BackupConfig::new(
                format!("{}-pre-restore-snapshot", record.name),
                self.target_database.clone().unwrap_or_else(|| record.database.clone()),
                crate::types::BackupType::Full,
            );
            let snapshot = self.orchestrator.backup(&snapshot_config);
            if !snapshot.success {
                log::warn!(
                    "pre-restore snapshot for `{}` failed: {}",
                    self.backup_id,
                    snapshot.error.unwrap_or_default()
                );
            }
        }

        if let Some(hook) = &self.pre_hook {
            hook()?;
        }

        let dump = self.orchestrator.load_dump(&record, self.encryption_key.as_ref())?;
        let dialect = self.orchestrator.dialect().clone();
        let mut driver = self.orchestrator.open_connection()?;

        if self.drop_existing {
            let builder = SchemaBuilder::new(dialect.as_ref());
            for table in dump.tables.iter().rev() {
                if !self.wants_table(&table.name) {
                    continue;
                }
                let sql = builder.drop_table_sql(&self.target_name(&table.name));
                let stmt = driver.prepare(&sql)?;
                driver.execute(&stmt, &[])?;
            }
        }

        if !self.skip_schema {
            for statement in &dump.ddl {
                let stmt = driver.prepare(statement)?;
                driver.execute(&stmt, &[])?;
            }
        }

        let mut tables_restored = Vec::new();
        if !self.skip_data {
            for table in &dump.tables {
                if !self.wants_table(&table.name) {
                    continue;
                }
                self.restore_table(&mut driver, dialect.as_ref(), table)?;
                tables_restored.push(self.target_name(&table.name));
            }
        }

        if let Some(hook) = &self.post_hook {
            hook()?;
        }

        if self.point_in_time.is_some() {
            log::info!(
                "point-in-time replay for `{}` up to binlog `{}` is left to the caller",
                self.backup_id,
                self.binlog_path.as_deref().unwrap_or("")
            );
        }

        Ok(RestoreResult { success: true, tables_restored, error: None })
    }

    fn restore_table(&self, driver: &mut D, dialect: &dyn dbkit_core::dialect::Dialect, table: &crate::dump::TableDump) -> Result<()> {
        if table.rows.is_empty() {
            return Ok(());
        }
        let target = self.target_name(&table.name);
        let columns = table.columns.iter().map(|c| dialect.quote_ident(c)).collect::<Vec<_>>().join(", ");
        let placeholders =
            (0..table.columns.len()).map(|i| dialect.param_marker(i)).collect::<Vec<_>>().join(", ");
        let sql = format!("INSERT INTO {} ({columns}) VALUES ({placeholders})", dialect.quote_ident(&target));
        let stmt = driver.prepare(&sql)?;
        for row in &table.rows {
            let params: Vec<Value> = row.clone();
            driver.execute(&stmt, &params)?;
        }
        Ok(())
    }
}
