//! Caching strategies.
//!
//! Every request the worker handles is served by one of three strategies.
//! Which one is decided by the [`router`](crate::router); how it runs is in
//! [`responder`](crate::responder).
//!
//! ```
//! use offline_kit::strategy::{CacheStrategy, StoreKind};
//!
//! // Images: permanent local copy, one network attempt on miss
//! assert_eq!(CacheStrategy::CacheFirst.store(), StoreKind::Dynamic);
//!
//! // API: always live when possible, cache only as a fallback
//! assert_eq!(CacheStrategy::NetworkFirst.store(), StoreKind::Dynamic);
//!
//! // Pages: instant from cache, refreshed in the background
//! assert_eq!(CacheStrategy::StaleWhileRevalidate.store(), StoreKind::Static);
//! ```
//!
//! # When each strategy touches the network
//!
//! | Strategy | Cache hit | Cache miss | Network throws |
//! |----------|-----------|------------|----------------|
//! | **CacheFirst** | Return, no fetch | Fetch, store 2xx | 404 `Image not available` |
//! | **NetworkFirst** | Fetch anyway | Fetch, store 2xx | Cached copy, else 503 JSON |
//! | **StaleWhileRevalidate** | Return, refetch in background | Fetch, store 2xx | Offline page, else 404 |
//!
//! Non-2xx network answers are handed back as they are and never stored.

use crate::response::Response;
use serde::{Deserialize, Serialize};

/// Strategy enum controlling how one request is answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheStrategy {
    /// **CacheFirst**: serve from the dynamic store; fetch only on miss.
    ///
    /// Flow:
    /// 1. Check dynamic store
    /// 2. If hit: return cached response (no network)
    /// 3. If miss: fetch once; store a 2xx copy before returning
    /// 4. If the fetch throws: 404 "Image not available"
    CacheFirst,

    /// **NetworkFirst**: always try the network; the cache is a safety net.
    ///
    /// Flow:
    /// 1. Fetch
    /// 2. If 2xx: store a copy in the dynamic store, return live response
    /// 3. If the fetch throws: cached copy if any, else 503 JSON error
    NetworkFirst,

    /// **StaleWhileRevalidate**: answer from the static store immediately
    /// and refresh it in the background.
    ///
    /// Flow:
    /// 1. Check static store
    /// 2. If hit: return it; spawn a detached refetch that overwrites on 2xx
    /// 3. If miss: fetch inline; store 2xx
    /// 4. If the fetch throws: offline page if cached, else 404
    StaleWhileRevalidate,
}

/// Which of the generation's two stores a strategy reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    /// Install-time assets and pages.
    Static,
    /// Everything fetched at runtime.
    Dynamic,
}

impl CacheStrategy {
    /// Store this strategy reads from and writes to.
    pub fn store(&self) -> StoreKind {
        match self {
            CacheStrategy::CacheFirst | CacheStrategy::NetworkFirst => StoreKind::Dynamic,
            CacheStrategy::StaleWhileRevalidate => StoreKind::Static,
        }
    }

    /// Synthetic response when neither cache nor network can answer.
    ///
    /// For `StaleWhileRevalidate` this is the last resort, used only after
    /// the offline page lookup also misses.
    pub fn fallback(&self) -> Response {
        match self {
            CacheStrategy::CacheFirst => Response::image_unavailable(),
            CacheStrategy::NetworkFirst => Response::network_unavailable(),
            CacheStrategy::StaleWhileRevalidate => Response::page_unavailable(),
        }
    }
}

impl std::fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheStrategy::CacheFirst => write!(f, "CacheFirst"),
            CacheStrategy::NetworkFirst => write!(f, "NetworkFirst"),
            CacheStrategy::StaleWhileRevalidate => write!(f, "StaleWhileRevalidate"),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Static => write!(f, "static"),
            StoreKind::Dynamic => write!(f, "dynamic"),
        }
    }
}
