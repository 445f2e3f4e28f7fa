//! Backup/restore orchestration: schema+data dump assembly, compression,
//! AES-256-CBC encryption, pluggable storage, and a metadata table of
//! completed backups (spec.md §4.C10).

mod compression;
mod crypto;
mod dump;
mod metadata;
mod orchestrator;
mod restore;
mod storage;
mod types;

pub use dump::{Dump, TableDump};
pub use orchestrator::{BackupOrchestrator, DriverFactory};
pub use restore::RestoreBuilder;
pub use storage::{EncryptingStorage, LocalStorage, StorageAdapter};
pub use types::{
    BackupConfig, BackupRecord, BackupResult, BackupType, Compression, Encryption, RestoreResult, StorageKind,
};
