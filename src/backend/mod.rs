//! Named cache store backends.
//!
//! Two levels, mirroring the host cache API:
//!
//! - [`CacheStorage`]: the set of named stores for one origin (open, list,
//!   delete a whole store).
//! - [`CacheStore`]: one named store mapping a normalized request key to
//!   encoded response bytes.
//!
//! Storage is injected into the worker rather than reached through a global,
//! so tests swap in [`InMemoryStorage`] and deployments can keep entries
//! across restarts with the Redis backend.
//!
//! No locking, versioning or compare-and-swap is layered on top of a backend:
//! the backend is trusted to make a single `get`/`put` atomic, and the last
//! writer to a key wins.

use crate::error::Result;
use std::future::Future;

#[cfg(test)]
pub(crate) mod faulty;
pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

pub use inmemory::{InMemoryStorage, InMemoryStore};
#[cfg(feature = "redis")]
pub use redis::{PoolStats, RedisConfig, RedisStorage, RedisStore};

/// The collection of named cache stores.
///
/// **IMPORTANT:** All methods take `&self`. Implementations use interior
/// mutability or external storage, and handles are cheap to clone so they
/// can move into background tasks.
pub trait CacheStorage: Send + Sync + Clone + 'static {
    /// Handle type for one named store.
    type Store: CacheStore;

    /// Open the named store, creating it if it does not exist.
    ///
    /// # Errors
    /// Returns `Err` if the backend is unreachable.
    fn open(&self, name: &str) -> impl Future<Output = Result<Self::Store>> + Send;

    /// Whether a store with this name exists.
    ///
    /// # Errors
    /// Returns `Err` if the backend is unreachable.
    fn has(&self, name: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Delete the named store and every entry in it.
    ///
    /// # Returns
    /// - `Ok(true)` - the store existed and was removed
    /// - `Ok(false)` - there was no such store
    ///
    /// # Errors
    /// Returns `Err` if the backend is unreachable.
    fn delete(&self, name: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Names of every existing store, sorted.
    ///
    /// # Errors
    /// Returns `Err` if the backend is unreachable.
    fn keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// One named cache store.
pub trait CacheStore: Send + Sync + Clone + 'static {
    /// Name this store was opened under.
    fn name(&self) -> &str;

    /// Retrieve the encoded response stored under `key`.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))` - entry found
    /// - `Ok(None)` - no entry for this key
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs (connection lost, etc.)
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store (or overwrite) the entry under `key`.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn put(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    /// Remove the entry under `key`. Returns whether one was removed.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// All keys in this store, sorted.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Number of entries.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn len(&self) -> impl Future<Output = Result<usize>> + Send {
        async move { Ok(self.keys().await?.len()) }
    }
}
