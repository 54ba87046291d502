//! Metrics hooks for the worker.
//!
//! Implement [`WorkerMetrics`] to feed your monitoring system:
//!
//! ```ignore
//! use offline_kit::observability::WorkerMetrics;
//!
//! struct PrometheusMetrics;
//!
//! impl WorkerMetrics for PrometheusMetrics {
//!     fn record_cache_hit(&self, store: &str, _key: &str) {
//!         // counter!("offline_cache_hits", "store" => store).increment(1);
//!     }
//!     // ... other methods keep their logging defaults
//! }
//!
//! // let worker = OfflineWorker::builder(config)
//! //     .metrics(Arc::new(PrometheusMetrics))
//! //     .build(storage, fetcher)?;
//! ```
//!
//! Every method has a default body that logs through the `log` crate, so an
//! implementation only overrides what it cares about. [`NoOpMetrics`] is the
//! silent default. [`CountingMetrics`] keeps atomic counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Trait for worker metrics collection.
pub trait WorkerMetrics: Send + Sync {
    /// A store lookup found an entry.
    fn record_cache_hit(&self, store: &str, key: &str) {
        debug!("Cache HIT: {}/{}", store, key);
    }

    /// A store lookup found nothing.
    fn record_cache_miss(&self, store: &str, key: &str) {
        debug!("Cache MISS: {}/{}", store, key);
    }

    /// A fetch completed (any status).
    fn record_network(&self, key: &str, status: u16, duration: Duration) {
        debug!("Network {}: {} in {:?}", status, key, duration);
    }

    /// A fetch threw.
    fn record_network_error(&self, key: &str, error: &str) {
        warn!("Network ERROR for {}: {}", key, error);
    }

    /// A synthetic or offline-page response was served.
    fn record_fallback(&self, key: &str, status: u16) {
        info!("Fallback {} served for {}", status, key);
    }

    /// A background revalidation finished.
    fn record_revalidation(&self, key: &str, updated: bool) {
        debug!("Revalidated {} (updated: {})", key, updated);
    }

    /// A stale store was deleted on activation.
    fn record_store_deleted(&self, name: &str) {
        info!("Deleted stale store {}", name);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl WorkerMetrics for NoOpMetrics {
    fn record_cache_hit(&self, _store: &str, _key: &str) {}
    fn record_cache_miss(&self, _store: &str, _key: &str) {}
    fn record_network(&self, _key: &str, _status: u16, _duration: Duration) {}
    fn record_network_error(&self, _key: &str, _error: &str) {}
    fn record_fallback(&self, _key: &str, _status: u16) {}
    fn record_revalidation(&self, _key: &str, _updated: bool) {}
    fn record_store_deleted(&self, _name: &str) {}
}

/// Metrics implementation backed by atomic counters.
#[derive(Default)]
pub struct CountingMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    network_responses: AtomicU64,
    network_errors: AtomicU64,
    fallbacks: AtomicU64,
    revalidations: AtomicU64,
    stores_deleted: AtomicU64,
}

/// Point-in-time copy of [`CountingMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub network_responses: u64,
    pub network_errors: u64,
    pub fallbacks: u64,
    pub revalidations: u64,
    pub stores_deleted: u64,
}

impl MetricsSnapshot {
    /// Share of lookups that hit.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / total as f64
    }
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            network_responses: self.network_responses.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            revalidations: self.revalidations.load(Ordering::Relaxed),
            stores_deleted: self.stores_deleted.load(Ordering::Relaxed),
        }
    }
}

impl WorkerMetrics for CountingMetrics {
    fn record_cache_hit(&self, _store: &str, _key: &str) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cache_miss(&self, _store: &str, _key: &str) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_network(&self, _key: &str, _status: u16, _duration: Duration) {
        self.network_responses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_network_error(&self, _key: &str, _error: &str) {
        self.network_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_fallback(&self, _key: &str, _status: u16) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    fn record_revalidation(&self, _key: &str, _updated: bool) {
        self.revalidations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_store_deleted(&self, _name: &str) {
        self.stores_deleted.fetch_add(1, Ordering::Relaxed);
    }
}
