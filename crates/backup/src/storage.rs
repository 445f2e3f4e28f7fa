use std::fs;
use std::path::PathBuf;

use dbkit_core::error::{Result, StorageError};

use crate::crypto;

/// Persists and retrieves backup artifacts by id (spec.md §4.C10).
/// Composable: [`EncryptingStorage`] wraps any `StorageAdapter` the same
/// way the Result Cache's [`dbkit_core::cache::TaggedCache`] wraps any
/// `Cache`.
pub trait StorageAdapter: Send + Sync {
    fn store(&self, id: &str, bytes: &[u8]) -> Result<()>;
    fn retrieve(&self, id: &str) -> Result<Vec<u8>>;
    fn exists(&self, id: &str) -> Result<bool>;
    fn delete(&self, id: &str) -> Result<()>;
}

/// Flat-directory adapter: one file per backup, named by its id.
pub struct LocalStorage {
    directory: PathBuf,
}

impl LocalStorage {
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)
            .map_err(|e| StorageError { operation: "create_backup_dir".to_string(), message: e.to_string() })?;
        Ok(Self { directory })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.directory.join(id)
    }
}

impl StorageAdapter for LocalStorage {
    fn store(&self, id: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.path_for(id), bytes)
            .map_err(|e| StorageError { operation: "store".to_string(), message: e.to_string() }.into())
    }

    fn retrieve(&self, id: &str) -> Result<Vec<u8>> {
        fs::read(self.path_for(id))
            .map_err(|e| StorageError { operation: "retrieve".to_string(), message: e.to_string() }.into())
    }

    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.path_for(id).exists())
    }

    fn delete(&self, id: &str) -> Result<()> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError { operation: "delete".to_string(), message: e.to_string() }.into()),
        }
    }
}

/// Wraps another adapter with AES-256-CBC: a fresh random IV is
/// generated per artifact and prepended to the ciphertext on disk, so
/// `retrieve` can decrypt without a side channel for the IV (spec.md
/// §4.C10).
pub struct EncryptingStorage<S: StorageAdapter> {
    inner: S,
    key: [u8; 32],
}

impl<S: StorageAdapter> EncryptingStorage<S> {
    pub fn new(inner: S, key: [u8; 32]) -> Self {
        Self { inner, key }
    }
}

impl<S: StorageAdapter> StorageAdapter for EncryptingStorage<S> {
    fn store(&self, id: &str, bytes: &[u8]) -> Result<()> {
        self.inner.store(id, &crypto::encrypt(&self.key, bytes))
    }

    fn retrieve(&self, id: &str) -> Result<Vec<u8>> {
        crypto::decrypt(&self.key, &self.inner.retrieve(id)?)
    }

    fn exists(&self, id: &str) -> Result<bool> {
        self.inner.exists(id)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn local_storage_round_trips_bytes() {
        let dir = std::env::temp_dir().join(format!("dbkit-backup-test-{:x}", rand_marker()));
        let storage = LocalStorage::new(&dir).unwrap();
        storage.store("abc", b"hello").unwrap();
        assert!(storage.exists("abc").unwrap());
        assert_eq!(storage.retrieve("abc").unwrap(), b"hello");
        storage.delete("abc").unwrap();
        assert!(!storage.exists("abc").unwrap());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn encrypting_storage_round_trips_and_varies_ciphertext() {
        let dir = std::env::temp_dir().join(format!("dbkit-backup-test-{:x}", rand_marker()));
        let inner = LocalStorage::new(&dir).unwrap();
        let key = [7u8; 32];
        let storage = EncryptingStorage::new(inner, key);
        storage.store("x", b"top secret payload").unwrap();
        storage.store("y", b"top secret payload").unwrap();
        assert_eq!(storage.retrieve("x").unwrap(), b"top secret payload");

        let inner_for_reads = LocalStorage::new(&dir).unwrap();
        let x_raw = inner_for_reads.retrieve("x").unwrap();
        let y_raw = inner_for_reads.retrieve("y").unwrap();
        assert_ne!(x_raw, y_raw, "fresh IV per artifact must change the ciphertext");
        let _ = fs::remove_dir_all(&dir);
    }

    fn rand_marker() -> u64 {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }
}
