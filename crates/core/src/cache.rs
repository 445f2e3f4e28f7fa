use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::{Result, StorageError};
use crate::row::Value;

/// A cached value: any row-compatible value, so callers can cache a
/// single scalar, a `Row`, or a whole result set by serializing it
/// through `Value` (spec.md §4.C6).
pub type CachedValue = Vec<Value>;

/// Storage abstraction for the Result Cache (spec.md §4.C6). Every
/// method takes `&self`: implementations guard their state behind their
/// own interior mutability so `TaggedCache` can wrap either backend
/// without knowing which one it holds.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CachedValue>>;
    fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
    fn has(&self, key: &str) -> Result<bool>;
    fn clear(&self) -> Result<()>;
}

struct Entry {
    value: CachedValue,
    expires_at: Instant,
}

/// In-process cache backend; a single mutex guards the whole map,
/// matching the Connection Driver's own guarded-handle style.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<CachedValue>> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().expect("cache mutex poisoned").remove(key);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn clear(&self) -> Result<()> {
        self.entries.lock().expect("cache mutex poisoned").clear();
        Ok(())
    }
}

/// On-disk cache backend: one file per key, named by a 128-bit FNV-1a
/// digest of the key so arbitrary cache keys never collide with the
/// filesystem's naming rules (spec.md §4.C6).
pub struct FileCache {
    directory: PathBuf,
}

impl FileCache {
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|e| StorageError {
            operation: "create_cache_dir".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { directory })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{:032x}.cache", digest128(key)))
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Result<Option<CachedValue>> {
        let path = self.path_for(key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError { operation: "cache_read".to_string(), message: e.to_string() }.into()),
        };
        let (expires_at, value) = decode_entry(&raw)
            .map_err(|message| StorageError { operation: "cache_decode".to_string(), message })?;
        if expires_at <= now_unix() {
            let _ = fs::remove_file(&path);
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> Result<()> {
        let expires_at = now_unix() + ttl.as_secs();
        let encoded = encode_entry(expires_at, &value);
        fs::write(self.path_for(key), encoded)
            .map_err(|e| StorageError { operation: "cache_write".to_string(), message: e.to_string() }.into())
    }

    fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) | Err(_) => Ok(()),
        }
    }

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn clear(&self) -> Result<()> {
        let Ok(dir) = fs::read_dir(&self.directory) else { return Ok(()) };
        for entry in dir.flatten() {
            let _ = fs::remove_file(entry.path());
        }
        Ok(())
    }
}

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn digest128(key: &str) -> u128 {
    // FNV-1a, run twice over disjoint odd seeds and concatenated, kept
    // dependency-free since this only needs uniform filename spread, not
    // cryptographic strength.
    fn fnv1a(data: &[u8], seed: u64) -> u64 {
        let mut hash = seed;
        for &byte in data {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
        }
        hash
    }
    let low = fnv1a(key.as_bytes(), 0xcbf2_9ce4_8422_2325);
    let high = fnv1a(key.as_bytes(), 0x9e37_79b9_7f4a_7c15);
    (u128::from(high) << 64) | u128::from(low)
}

fn encode_entry(expires_at: u64, value: &CachedValue) -> Vec<u8> {
    let mut out = expires_at.to_le_bytes().to_vec();
    out.extend((value.len() as u64).to_le_bytes());
    for item in value {
        encode_value(item, &mut out);
    }
    out
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(0),
        Value::Bool(v) => {
            out.push(1);
            out.push(u8::from(*v));
        }
        Value::Int(v) => {
            out.push(2);
            out.extend(v.to_le_bytes());
        }
        Value::Float(v) => {
            out.push(3);
            out.extend(v.to_le_bytes());
        }
        Value::Text(v) => {
            out.push(4);
            out.extend((v.len() as u64).to_le_bytes());
            out.extend(v.as_bytes());
        }
        Value::Bytes(v) => {
            out.push(5);
            out.extend((v.len() as u64).to_le_bytes());
            out.extend(v);
        }
    }
}

fn decode_entry(raw: &[u8]) -> std::result::Result<(u64, CachedValue), String> {
    if raw.len() < 16 {
        return Err("truncated cache entry".to_string());
    }
    let expires_at = u64::from_le_bytes(raw[0..8].try_into().unwrap());
    let count = u64::from_le_bytes(raw[8..16].try_into().unwrap()) as usize;
    let mut cursor = 16;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let (value, next) = decode_value(raw, cursor)?;
        values.push(value);
        cursor = next;
    }
    Ok((expires_at, values))
}

fn decode_value(raw: &[u8], at: usize) -> std::result::Result<(Value, usize), String> {
    let tag = *raw.get(at).ok_or("truncated cache entry")?;
    match tag {
        0 => Ok((Value::Null, at + 1)),
        1 => {
            let byte = *raw.get(at + 1).ok_or("truncated cache entry")?;
            Ok((Value::Bool(byte != 0), at + 2))
        }
        2 => {
            let bytes: [u8; 8] = raw.get(at + 1..at + 9).ok_or("truncated cache entry")?.try_into().unwrap();
            Ok((Value::Int(i64::from_le_bytes(bytes)), at + 9))
        }
        3 => {
            let bytes: [u8; 8] = raw.get(at + 1..at + 9).ok_or("truncated cache entry")?.try_into().unwrap();
            Ok((Value::Float(f64::from_le_bytes(bytes)), at + 9))
        }
        4 | 5 => {
            let len_bytes: [u8; 8] = raw.get(at + 1..at + 9).ok_or("truncated cache entry")?.try_into().unwrap();
            let len = u64::from_le_bytes(len_bytes) as usize;
            let start = at + 9;
            let slice = raw.get(start..start + len).ok_or("truncated cache entry")?;
            let value = if tag == 4 {
                Value::Text(String::from_utf8_lossy(slice).into_owned())
            } else {
                Value::Bytes(slice.to_vec())
            };
            Ok((value, start + len))
        }
        other => Err(format!("unknown cache value tag {other}")),
    }
}

/// Wraps any [`Cache`] with a tag↔key many-to-many index so a whole set
/// of entries sharing a tag can be dropped in one call (spec.md §4.C6).
/// The index lives behind its own mutex, separate from the backend's
/// storage, so `invalidate_tag` is atomic with respect to concurrent
/// tagging but never blocks on the backend's own lock.
pub struct TaggedCache<C: Cache> {
    backend: C,
    tags_by_key: Mutex<BTreeMap<String, HashSet<String>>>,
    keys_by_tag: Mutex<BTreeMap<String, HashSet<String>>>,
}

impl<C: Cache> TaggedCache<C> {
    pub fn new(backend: C) -> Self {
        Self { backend, tags_by_key: Mutex::new(BTreeMap::new()), keys_by_tag: Mutex::new(BTreeMap::new()) }
    }

    pub fn set_tagged(&self, key: &str, value: CachedValue, ttl: Duration, tags: &[&str]) -> Result<()> {
        self.backend.set(key, value, ttl)?;
        let mut tags_by_key = self.tags_by_key.lock().expect("tag index mutex poisoned");
        let mut keys_by_tag = self.keys_by_tag.lock().expect("tag index mutex poisoned");
        let entry = tags_by_key.entry(key.to_string()).or_default();
        for tag in tags {
            entry.insert((*tag).to_string());
            keys_by_tag.entry((*tag).to_string()).or_default().insert(key.to_string());
        }
        Ok(())
    }

    /// Deletes every key tagged `tag`. Holds both index mutexes for the
    /// duration so a concurrent `set_tagged` cannot observe a partially
    /// invalidated tag (spec.md §8 testable property #3).
    pub fn invalidate_tag(&self, tag: &str) -> Result<()> {
        let mut keys_by_tag = self.keys_by_tag.lock().expect("tag index mutex poisoned");
        let mut tags_by_key = self.tags_by_key.lock().expect("tag index mutex poisoned");
        let Some(keys) = keys_by_tag.remove(tag) else { return Ok(()) };
        for key in &keys {
            self.backend.delete(key)?;
            if let Some(tags) = tags_by_key.get_mut(key) {
                tags.remove(tag);
                if tags.is_empty() {
                    tags_by_key.remove(key);
                }
            }
        }
        Ok(())
    }

    pub fn inner(&self) -> &C {
        &self.backend
    }
}

impl<C: Cache> Cache for TaggedCache<C> {
    fn get(&self, key: &str) -> Result<Option<CachedValue>> {
        self.backend.get(key)
    }

    fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> Result<()> {
        self.backend.set(key, value, ttl)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.backend.delete(key)?;
        let mut tags_by_key = self.tags_by_key.lock().expect("tag index mutex poisoned");
        let mut keys_by_tag = self.keys_by_tag.lock().expect("tag index mutex poisoned");
        if let Some(tags) = tags_by_key.remove(key) {
            for tag in tags {
                if let Some(keys) = keys_by_tag.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        keys_by_tag.remove(&tag);
                    }
                }
            }
        }
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool> {
        self.backend.has(key)
    }

    fn clear(&self) -> Result<()> {
        self.backend.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cache_expires_entries() {
        let cache = MemoryCache::new();
        cache.set("k", vec![Value::Int(1)], Duration::from_millis(0)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn tagged_cache_invalidates_by_tag() {
        let cache = TaggedCache::new(MemoryCache::new());
        cache.set_tagged("a", vec![Value::Int(1)], Duration::from_secs(60), &["users"]).unwrap();
        cache.set_tagged("b", vec![Value::Int(2)], Duration::from_secs(60), &["users", "admins"]).unwrap();
        cache.set_tagged("c", vec![Value::Int(3)], Duration::from_secs(60), &["admins"]).unwrap();

        cache.invalidate_tag("users").unwrap();

        assert_eq!(cache.get("a").unwrap(), None);
        assert_eq!(cache.get("b").unwrap(), None);
        assert_eq!(cache.get("c").unwrap(), Some(vec![Value::Int(3)]));
    }

    #[test]
    fn file_cache_round_trips_a_value() {
        let dir = std::env::temp_dir().join(format!("dbkit-cache-test-{:x}", digest128("dbkit-cache-test")));
        let cache = FileCache::new(&dir).unwrap();
        cache.set("k", vec![Value::Text("hi".to_string())], Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(vec![Value::Text("hi".to_string())]));
        cache.clear().unwrap();
        assert!(cache.get("k").unwrap().is_none());
    }
}
