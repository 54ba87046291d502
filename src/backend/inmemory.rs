//! In-memory cache storage (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Nothing survives the process; use it for tests and short-lived hosts.

use super::{CacheStorage, CacheStore};
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe in-memory set of named stores.
///
/// Cloning shares the same underlying stores.
///
/// # Example
///
/// ```no_run
/// use offline_kit::backend::{CacheStorage, CacheStore, InMemoryStorage};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let storage = InMemoryStorage::new();
///
///     let store = storage.open("static-v1.0.0").await?;
///     store.put("GET https://example.com/", b"snapshot".to_vec()).await?;
///
///     assert_eq!(storage.keys().await?, vec!["static-v1.0.0".to_string()]);
///     Ok(())
/// }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    stores: Arc<DashMap<String, InMemoryStore>>,
}

impl InMemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        InMemoryStorage {
            stores: Arc::new(DashMap::new()),
        }
    }

    /// Number of named stores.
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Memory statistics across every store.
    pub fn stats(&self) -> StorageStats {
        let mut stats = StorageStats {
            stores: self.stores.len(),
            ..StorageStats::default()
        };
        for store in self.stores.iter() {
            stats.entries += store.entries.len();
            stats.total_bytes += store
                .entries
                .iter()
                .map(|entry| entry.value().len())
                .sum::<usize>();
        }
        stats
    }

    /// Print storage statistics to debug log.
    pub fn log_stats(&self) {
        let stats = self.stats();
        debug!(
            "Storage Stats: {} stores, {} entries, {} bytes",
            stats.stores, stats.entries, stats.total_bytes
        );
    }
}

impl CacheStorage for InMemoryStorage {
    type Store = InMemoryStore;

    async fn open(&self, name: &str) -> Result<InMemoryStore> {
        let store = self
            .stores
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("✓ InMemory OPEN {} (created)", name);
                InMemoryStore::new(name)
            })
            .clone();
        Ok(store)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.stores.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let removed = self.stores.remove(name).is_some();
        debug!("✓ InMemory DELETE STORE {} -> {}", name, removed);
        Ok(removed)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.stores.iter().map(|s| s.key().clone()).collect();
        names.sort();
        Ok(names)
    }
}

/// One in-memory named store.
///
/// A handle keeps working after its store is deleted from the storage, but
/// it is detached: writes through it are no longer visible to `open`.
#[derive(Clone)]
pub struct InMemoryStore {
    name: Arc<str>,
    entries: Arc<DashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    fn new(name: &str) -> Self {
        InMemoryStore {
            name: Arc::from(name),
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for InMemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.entries.get(key).map(|entry| entry.value().clone());
        if value.is_some() {
            debug!("✓ InMemory GET {}/{} -> HIT", self.name, key);
        } else {
            debug!("✓ InMemory GET {}/{} -> MISS", self.name, key);
        }
        Ok(value)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        debug!("✓ InMemory PUT {}/{}", self.name, key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.entries.remove(key).is_some();
        debug!("✓ InMemory DELETE {}/{}", self.name, key);
        Ok(removed)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}

/// Storage statistics.
#[derive(Clone, Debug, Default)]
pub struct StorageStats {
    pub stores: usize,
    pub entries: usize,
    pub total_bytes: usize,
}
