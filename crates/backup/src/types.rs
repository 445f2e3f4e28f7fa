use std::collections::BTreeMap;

/// What a backup captures (spec.md §4.C10). `Incremental`/`Differential`
/// select the streaming strategy by default; `Full`/`SchemaOnly`/`DataOnly`
/// select the full-dump strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupType {
    Full,
    SchemaOnly,
    DataOnly,
    Incremental,
    Differential,
}

impl BackupType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::SchemaOnly => "schema_only",
            Self::DataOnly => "data_only",
            Self::Incremental => "incremental",
            Self::Differential => "differential",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "full" => Some(Self::Full),
            "schema_only" => Some(Self::SchemaOnly),
            "data_only" => Some(Self::DataOnly),
            "incremental" => Some(Self::Incremental),
            "differential" => Some(Self::Differential),
            _ => None,
        }
    }

    /// Whether this type streams table data in chunks rather than
    /// buffering a single dump (spec.md §4.C10: incremental/differential
    /// backups use the streaming strategy unless overridden).
    #[must_use]
    pub fn streams_by_default(self) -> bool {
        matches!(self, Self::Incremental | Self::Differential)
    }
}

/// Where a backup artifact lives. Only `Local` has a concrete adapter;
/// `S3`/`Ftp` are recorded so `BackupRecord::storage_kind` round-trips
/// through the metadata table even though this crate ships no remote
/// adapter for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    S3,
    Ftp,
}

impl StorageKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
            Self::Ftp => "ftp",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "local" => Some(Self::Local),
            "s3" => Some(Self::S3),
            "ftp" => Some(Self::Ftp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
        }
    }
}

/// Symmetric encryption applied to an artifact before storage. The key
/// is never persisted in `BackupRecord`; callers supply it again at
/// restore/verify time.
#[derive(Debug, Clone, Default)]
pub enum Encryption {
    #[default]
    None,
    Aes256Cbc {
        key: [u8; 32],
    },
}

impl Encryption {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Aes256Cbc { .. } => "aes-256-cbc",
        }
    }
}

/// Inputs for a single backup run (spec.md §4.C10).
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub name: String,
    pub database: String,
    pub backup_type: BackupType,
    pub include_tables: Option<Vec<String>>,
    pub exclude_tables: Vec<String>,
    pub compression: Compression,
    pub encryption: Encryption,
    pub storage: StorageKind,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub verify_after_backup: bool,
    pub generate_migrations: bool,
    pub chunk_size: usize,
    /// Force the streaming strategy regardless of `backup_type`.
    pub force_streaming: bool,
}

impl BackupConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, database: impl Into<String>, backup_type: BackupType) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            backup_type,
            include_tables: None,
            exclude_tables: Vec::new(),
            compression: Compression::None,
            encryption: Encryption::None,
            storage: StorageKind::Local,
            description: None,
            tags: Vec::new(),
            verify_after_backup: false,
            generate_migrations: false,
            chunk_size: 500,
            force_streaming: false,
        }
    }

    #[must_use]
    pub fn uses_streaming(&self) -> bool {
        self.force_streaming || self.backup_type.streams_by_default()
    }

    pub(crate) fn wants_table(&self, table: &str) -> bool {
        if self.exclude_tables.iter().any(|excluded| excluded == table) {
            return false;
        }
        match &self.include_tables {
            Some(included) => included.iter().any(|name| name == table),
            None => true,
        }
    }
}

/// A completed backup's bookkeeping row (spec.md §4.C10). `checksum` is
/// a SHA-256 hex digest of the artifact exactly as stored, i.e. after
/// compression and encryption, so `verify` never needs the encryption
/// key to detect corruption.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupRecord {
    pub id: String,
    pub name: String,
    pub database: String,
    pub backup_type: BackupType,
    pub size_bytes: u64,
    pub checksum: String,
    pub storage_kind: StorageKind,
    pub storage_path: String,
    pub metadata: BTreeMap<String, String>,
    pub created_at: u64,
}

/// Outcome of a single `backup`/`restore` call. Callers inspect `success`
/// rather than matching on `Result`, since a partial failure is reported
/// alongside whatever progress was made rather than unwound.
#[derive(Debug, Clone)]
pub struct BackupResult {
    pub success: bool,
    pub record: Option<BackupRecord>,
    pub error: Option<String>,
}

impl BackupResult {
    #[must_use]
    pub fn ok(record: BackupRecord) -> Self {
        Self { success: true, record: Some(record), error: None }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, record: None, error: Some(message.into()) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestoreResult {
    pub success: bool,
    pub tables_restored: Vec<String>,
    pub error: Option<String>,
}
