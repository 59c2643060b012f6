//! Storage collaborators: durable options and TTL-bound cache.
//!
//! Both stores are consumed as black boxes. The option store holds durable
//! state (activation records); the TTL cache holds ephemeral payloads and
//! throttle markers. Hosts embed their own implementations; the in-memory
//! and file-backed ones here cover tests and simple embedders.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Durable key/value store, "last writer wins".
pub trait OptionStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> Option<String>;

    /// Set a value by key. Returns false if the write was rejected.
    fn set(&self, key: &str, value: &str) -> bool;

    /// Remove a value by key.
    fn delete(&self, key: &str) -> bool;
}

/// Transient key/value cache with per-entry TTL.
///
/// Expired entries behave as absent. Existence of a throttle marker is
/// meaningful on its own, so `get` must never resurrect expired entries.
pub trait TtlCache: Send + Sync {
    /// Get a live (unexpired) value by key.
    fn get(&self, key: &str) -> Option<String>;

    /// Set a value with a time-to-live.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> bool;

    /// Remove a value by key.
    fn delete(&self, key: &str) -> bool;
}

/// In-memory option store.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OptionStore for MemoryOptionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value.to_string());
                true
            }
            Err(_) => false,
        }
    }

    fn delete(&self, key: &str) -> bool {
        match self.entries.write() {
            Ok(mut entries) => entries.remove(key).is_some(),
            Err(_) => false,
        }
    }
}

/// File-backed option store.
///
/// Persists all keys as one JSON object in `premia.json` within the given
/// directory.
pub struct FileOptionStore {
    path: std::path::PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileOptionStore {
    /// Create a store in the given directory.
    ///
    /// The directory must exist and be writable. Returns `None` if it is
    /// not accessible.
    pub fn new(storage_dir: &Path) -> Option<Self> {
        if !storage_dir.is_dir() {
            return None;
        }

        let path = storage_dir.join("premia.json");

        let cache = if path.exists() {
            let contents = std::fs::read_to_string(&path).ok()?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Some(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    fn save(&self) -> bool {
        if let Ok(cache) = self.cache.read()
            && let Ok(contents) = serde_json::to_string_pretty(&*cache)
        {
            return std::fs::write(&self.path, contents).is_ok();
        }
        false
    }
}

impl OptionStore for FileOptionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.to_string(), value.to_string());
        } else {
            return false;
        }
        self.save()
    }

    fn delete(&self, key: &str) -> bool {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(key);
        } else {
            return false;
        }
        self.save()
    }
}

impl std::fmt::Debug for FileOptionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileOptionStore")
            .field("path", &self.path)
            .finish()
    }
}

/// In-memory TTL cache with lazy expiry.
#[derive(Debug, Default)]
pub struct MemoryTtlCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryTtlCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TtlCache for MemoryTtlCache {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        let (value, expires_at) = entries.get(key)?;
        if *expires_at <= Instant::now() {
            return None;
        }
        Some(value.clone())
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
                true
            }
            Err(_) => false,
        }
    }

    fn delete(&self, key: &str) -> bool {
        match self.entries.write() {
            Ok(mut entries) => entries.remove(key).is_some(),
            Err(_) => false,
        }
    }
}
