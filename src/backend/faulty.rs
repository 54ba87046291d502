//! Storage wrapper that fails on demand, for exercising error paths.

use super::{CacheStorage, CacheStore, InMemoryStorage, InMemoryStore};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory storage whose `keys()` and `put` can be made to fail.
#[derive(Clone)]
pub(crate) struct FaultyStorage {
    inner: InMemoryStorage,
    fail_listing: Arc<AtomicBool>,
    puts_left: Arc<AtomicUsize>,
}

impl FaultyStorage {
    pub(crate) fn new() -> Self {
        FaultyStorage {
            inner: InMemoryStorage::new(),
            fail_listing: Arc::new(AtomicBool::new(false)),
            puts_left: Arc::new(AtomicUsize::new(usize::MAX)),
        }
    }

    /// Make `CacheStorage::keys` fail until reset.
    pub(crate) fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Let `n` more puts succeed; every later one fails.
    pub(crate) fn fail_puts_after(&self, n: usize) {
        self.puts_left.store(n, Ordering::SeqCst);
    }
}

impl CacheStorage for FaultyStorage {
    type Store = FaultyStore;

    async fn open(&self, name: &str) -> Result<FaultyStore> {
        Ok(FaultyStore {
            inner: self.inner.open(name).await?,
            puts_left: Arc::clone(&self.puts_left),
        })
    }

    async fn has(&self, name: &str) -> Result<bool> {
        self.inner.has(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        CacheStorage::delete(&self.inner, name).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(Error::Store("listing unavailable".to_string()));
        }
        CacheStorage::keys(&self.inner).await
    }
}

#[derive(Clone)]
pub(crate) struct FaultyStore {
    inner: InMemoryStore,
    puts_left: Arc<AtomicUsize>,
}

impl CacheStore for FaultyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let allowed = self
            .puts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(Error::Store(format!("write refused for {}", key)));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        CacheStore::delete(&self.inner, key).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        CacheStore::keys(&self.inner).await
    }
}
