//! Redis-backed durable cache storage.
//!
//! Layout, for a namespace `ns`:
//!
//! ```text
//! {ns}:stores          SET   names of every named store
//! {ns}:store:{name}    HASH  request key -> encoded response snapshot
//! ```
//!
//! Entries survive worker restarts, so a new generation sees the old
//! generation's stores until activation deletes them.

use super::{CacheStorage, CacheStore};
use crate::error::{Error, Result};
use deadpool_redis::{redis::AsyncCommands, Config as PoolConfig, Connection, Pool, Runtime};
use std::sync::Arc;
use std::time::Duration;

/// Pool statistics information.
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub connections: u32,
    pub idle_connections: u32,
}

/// Default Redis connection pool size.
/// Override with REDIS_POOL_SIZE environment variable
const DEFAULT_POOL_SIZE: u32 = 16;

/// Default time to wait for, or to open, a pooled connection.
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default key namespace.
const DEFAULT_NAMESPACE: &str = "offline-kit";

/// Configuration for Redis storage.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: u32,
    pub pool_size: u32,
    /// Upper bound for waiting on a free connection and for opening a new one.
    pub connection_timeout: Duration,
    /// Prefix for every key this storage touches (one per site origin).
    pub namespace: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            host: "localhost".to_string(),
            port: 6379,
            username: None,
            password: None,
            database: 0,
            pool_size: DEFAULT_POOL_SIZE,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl RedisConfig {
    /// Build Redis connection string.
    pub fn connection_string(&self) -> String {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => format!(
                "redis://{}:{}@{}:{}/{}",
                username, password, self.host, self.port, self.database
            ),
            (None, Some(password)) => format!(
                "redis://default:{}@{}:{}/{}",
                password, self.host, self.port, self.database
            ),
            _ => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

/// Pool sizing and timeouts for deadpool.
fn pool_config(size: u32, timeout: Duration) -> deadpool_redis::PoolConfig {
    let mut pool = deadpool_redis::PoolConfig::new(size as usize);
    pool.timeouts.wait = Some(timeout);
    pool.timeouts.create = Some(timeout);
    pool
}

async fn connection(pool: &Pool) -> Result<Connection> {
    pool.get()
        .await
        .map_err(|e| Error::Store(format!("Failed to get Redis connection: {}", e)))
}

/// Redis storage with connection pooling.
///
/// # Example
///
/// ```no_run
/// # use offline_kit::backend::{CacheStorage, CacheStore, RedisConfig, RedisStorage};
/// # use offline_kit::error::Result;
/// # async fn example() -> Result<()> {
/// let storage = RedisStorage::new(RedisConfig::default()).await?;
///
/// let store = storage.open("static-v1.0.0").await?;
/// store.put("GET https://example.com/", b"snapshot".to_vec()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisStorage {
    pool: Pool,
    namespace: Arc<str>,
}

impl RedisStorage {
    /// Create storage from configuration.
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let mut cfg = PoolConfig::from_url(config.connection_string());
        cfg.pool = Some(pool_config(config.pool_size, config.connection_timeout));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Store(format!("Failed to create Redis pool: {}", e)))?;

        info!(
            "✓ Redis storage initialized: {}:{} (namespace: {})",
            config.host, config.port, config.namespace
        );

        Ok(RedisStorage {
            pool,
            namespace: Arc::from(config.namespace.as_str()),
        })
    }

    /// Create from connection string directly, with the default namespace.
    ///
    /// Pool size comes from `REDIS_POOL_SIZE` if set, else 16. Connection
    /// timeouts use the default of five seconds.
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails.
    pub async fn from_connection_string(conn_str: &str) -> Result<Self> {
        let pool_size = std::env::var("REDIS_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        let mut cfg = PoolConfig::from_url(conn_str);
        cfg.pool = Some(pool_config(pool_size, DEFAULT_CONNECTION_TIMEOUT));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Store(format!("Failed to create Redis pool: {}", e)))?;

        info!(
            "✓ Redis storage initialized from connection string (pool size: {})",
            pool_size
        );

        Ok(RedisStorage {
            pool,
            namespace: Arc::from(DEFAULT_NAMESPACE),
        })
    }

    /// Use a different key namespace over the same pool.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Arc::from(namespace);
        self
    }

    /// Get current pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            connections: status.size as u32,
            idle_connections: status.available as u32,
        }
    }

    /// Health check - PING the server.
    ///
    /// # Errors
    /// Returns `Err` if no connection can be obtained or PING fails.
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = connection(&self.pool).await?;

        let pong: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::Store(format!("Redis PING failed: {}", e)))?;

        Ok(pong.contains("PONG"))
    }

    fn index_key(&self) -> String {
        format!("{}:stores", self.namespace)
    }

    fn store_key(&self, name: &str) -> String {
        format!("{}:store:{}", self.namespace, name)
    }
}

impl CacheStorage for RedisStorage {
    type Store = RedisStore;

    async fn open(&self, name: &str) -> Result<RedisStore> {
        let mut conn = connection(&self.pool).await?;

        let added: i64 = conn.sadd(self.index_key(), name).await.map_err(|e| {
            Error::Store(format!("Redis SADD failed for store {}: {}", name, e))
        })?;
        if added > 0 {
            debug!("✓ Redis OPEN {} (created)", name);
        }

        Ok(RedisStore {
            pool: self.pool.clone(),
            name: Arc::from(name),
            hash_key: Arc::from(self.store_key(name).as_str()),
        })
    }

    async fn has(&self, name: &str) -> Result<bool> {
        let mut conn = connection(&self.pool).await?;

        let exists: bool = conn.sismember(self.index_key(), name).await.map_err(|e| {
            Error::Store(format!("Redis SISMEMBER failed for store {}: {}", name, e))
        })?;
        Ok(exists)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut conn = connection(&self.pool).await?;

        let (_, removed): (i64, i64) = deadpool_redis::redis::pipe()
            .atomic()
            .del(self.store_key(name))
            .srem(self.index_key(), name)
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::Store(format!("Redis delete failed for store {}: {}", name, e)))?;

        debug!("✓ Redis DELETE STORE {} -> {}", name, removed > 0);
        Ok(removed > 0)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut conn = connection(&self.pool).await?;

        let mut names: Vec<String> = conn
            .smembers(self.index_key())
            .await
            .map_err(|e| Error::Store(format!("Redis SMEMBERS failed: {}", e)))?;
        names.sort();
        Ok(names)
    }
}

/// One named store, held as a Redis hash.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    name: Arc<str>,
    hash_key: Arc<str>,
}

impl CacheStore for RedisStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = connection(&self.pool).await?;

        let value: Option<Vec<u8>> = conn
            .hget(&*self.hash_key, key)
            .await
            .map_err(|e| Error::Store(format!("Redis HGET failed for key {}: {}", key, e)))?;

        if value.is_some() {
            debug!("✓ Redis GET {}/{} -> HIT", self.name, key);
        } else {
            debug!("✓ Redis GET {}/{} -> MISS", self.name, key);
        }

        Ok(value)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut conn = connection(&self.pool).await?;

        conn.hset::<_, _, _, ()>(&*self.hash_key, key, value)
            .await
            .map_err(|e| Error::Store(format!("Redis HSET failed for key {}: {}", key, e)))?;

        debug!("✓ Redis PUT {}/{}", self.name, key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = connection(&self.pool).await?;

        let removed: i64 = conn
            .hdel(&*self.hash_key, key)
            .await
            .map_err(|e| Error::Store(format!("Redis HDEL failed for key {}: {}", key, e)))?;

        debug!("✓ Redis DELETE {}/{}", self.name, key);
        Ok(removed > 0)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut conn = connection(&self.pool).await?;

        let mut keys: Vec<String> = conn
            .hkeys(&*self.hash_key)
            .await
            .map_err(|e| Error::Store(format!("Redis HKEYS failed: {}", e)))?;
        keys.sort();
        Ok(keys)
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = connection(&self.pool).await?;

        let len: usize = conn
            .hlen(&*self.hash_key)
            .await
            .map_err(|e| Error::Store(format!("Redis HLEN failed: {}", e)))?;
        Ok(len)
    }
}
