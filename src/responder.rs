//! Strategy execution: answering one routed request.
//!
//! [`Responder`] owns the injected storage and fetcher for one worker
//! generation and runs a [`CacheStrategy`] against them. Network failures
//! never escape: every strategy turns them into a cached copy or a
//! synthetic fallback. Store failures do escape, as `Error::Store`.

use crate::backend::{CacheStorage, CacheStore};
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::observability::WorkerMetrics;
use crate::request::{Request, RequestKey};
use crate::response::Response;
use crate::serialization::{decode_snapshot, encode_snapshot};
use crate::strategy::{CacheStrategy, StoreKind};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use url::Url;

/// Where a served response came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseSource {
    /// A stored entry.
    Cache,
    /// A live network response (any status).
    Network,
    /// The offline page or a synthetic error response.
    Fallback,
}

/// A response ready for the page, plus any background work it started.
#[derive(Debug)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
    /// Background revalidation started by a stale-while-revalidate hit.
    ///
    /// The response path never awaits it. Dropping the handle detaches the
    /// task: it keeps running, cannot be cancelled through the worker, and may
    /// outlive the request that started it. A request for the same resource
    /// issued before it finishes can still see the old entry.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Served {
    fn new(response: Response, source: ResponseSource) -> Self {
        Served {
            response,
            source,
            revalidation: None,
        }
    }
}

/// Runs caching strategies for one worker generation.
pub struct Responder<S: CacheStorage, F: Fetcher> {
    storage: S,
    fetcher: F,
    static_name: String,
    dynamic_name: String,
    offline_page: Option<Url>,
    metrics: Arc<dyn WorkerMetrics>,
}

impl<S: CacheStorage, F: Fetcher> Responder<S, F> {
    pub fn new(
        storage: S,
        fetcher: F,
        static_name: String,
        dynamic_name: String,
        offline_page: Option<Url>,
        metrics: Arc<dyn WorkerMetrics>,
    ) -> Self {
        Responder {
            storage,
            fetcher,
            static_name,
            dynamic_name,
            offline_page,
            metrics,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Name of the store backing `kind` for this generation.
    pub fn store_name(&self, kind: StoreKind) -> &str {
        match kind {
            StoreKind::Static => &self.static_name,
            StoreKind::Dynamic => &self.dynamic_name,
        }
    }

    /// Open the store backing `kind`.
    ///
    /// # Errors
    /// `Error::Store` if the backend is unreachable.
    pub async fn open(&self, kind: StoreKind) -> Result<S::Store> {
        self.storage.open(self.store_name(kind)).await
    }

    /// Serve `request` with `strategy`.
    ///
    /// # Errors
    ///
    /// Only store failures (`Error::Store`) and snapshot encoding failures.
    /// Network failures are always answered with a fallback.
    pub async fn respond(&self, strategy: CacheStrategy, request: &Request) -> Result<Served> {
        debug!("» {} {}", strategy, request.url());
        match strategy {
            CacheStrategy::CacheFirst => self.cache_first(request).await,
            CacheStrategy::NetworkFirst => self.network_first(request).await,
            CacheStrategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    /// Cache-first: dynamic store, then exactly one fetch.
    pub async fn cache_first(&self, request: &Request) -> Result<Served> {
        let key = request.key();
        let store = self.open(CacheStrategy::CacheFirst.store()).await?;

        if let Some(cached) = self.lookup(&store, &key).await? {
            return Ok(Served::new(cached, ResponseSource::Cache));
        }

        match self.network(request, &key).await {
            Ok(response) => {
                if response.is_ok() {
                    remember(&store, &key, &response).await?;
                }
                Ok(Served::new(response, ResponseSource::Network))
            }
            Err(_) => Ok(self.fallback(&key, CacheStrategy::CacheFirst)),
        }
    }

    /// Network-first: live answer, dynamic store only when the fetch throws.
    pub async fn network_first(&self, request: &Request) -> Result<Served> {
        let key = request.key();
        let store = self.open(CacheStrategy::NetworkFirst.store()).await?;

        match self.network(request, &key).await {
            Ok(response) => {
                if response.is_ok() {
                    remember(&store, &key, &response).await?;
                }
                Ok(Served::new(response, ResponseSource::Network))
            }
            Err(_) => match self.lookup(&store, &key).await? {
                Some(cached) => {
                    info!("Serving cached copy of {} while offline", key);
                    Ok(Served::new(cached, ResponseSource::Cache))
                }
                None => Ok(self.fallback(&key, CacheStrategy::NetworkFirst)),
            },
        }
    }

    /// Stale-while-revalidate: static store now, network in the background.
    pub async fn stale_while_revalidate(&self, request: &Request) -> Result<Served> {
        let key = request.key();
        let store = self.open(CacheStrategy::StaleWhileRevalidate.store()).await?;

        if let Some(cached) = self.lookup(&store, &key).await? {
            let revalidation = tokio::spawn(revalidate(
                store,
                self.fetcher.clone(),
                request.clone(),
                key,
                Arc::clone(&self.metrics),
            ));
            return Ok(Served {
                response: cached,
                source: ResponseSource::Cache,
                revalidation: Some(revalidation),
            });
        }

        match self.network(request, &key).await {
            Ok(response) => {
                if response.is_ok() {
                    remember(&store, &key, &response).await?;
                }
                Ok(Served::new(response, ResponseSource::Network))
            }
            Err(_) => {
                if let Some(page) = &self.offline_page {
                    let offline_key = RequestKey::get(page);
                    if let Some(offline) = self.lookup(&store, &offline_key).await? {
                        self.metrics.record_fallback(key.as_str(), offline.status);
                        return Ok(Served::new(offline, ResponseSource::Fallback));
                    }
                }
                Ok(self.fallback(&key, CacheStrategy::StaleWhileRevalidate))
            }
        }
    }

    /// Fetch once, recording the outcome.
    async fn network(&self, request: &Request, key: &RequestKey) -> Result<Response> {
        let timer = Instant::now();
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.metrics
                    .record_network(key.as_str(), response.status, timer.elapsed());
                Ok(response)
            }
            Err(e) => {
                warn!("Network request failed for {}: {}", key, e);
                self.metrics.record_network_error(key.as_str(), &e.to_string());
                Err(e)
            }
        }
    }

    /// Read and decode an entry. Corrupt entries are evicted and read as a
    /// miss.
    async fn lookup(&self, store: &S::Store, key: &RequestKey) -> Result<Option<Response>> {
        let Some(bytes) = store.get(key.as_str()).await? else {
            self.metrics.record_cache_miss(store.name(), key.as_str());
            return Ok(None);
        };

        match decode_snapshot::<Response>(&bytes) {
            Ok(response) => {
                self.metrics.record_cache_hit(store.name(), key.as_str());
                Ok(Some(response))
            }
            Err(e) if e.is_corrupt_entry() => {
                warn!("Evicting unreadable entry {}/{}: {}", store.name(), key, e);
                store.delete(key.as_str()).await?;
                self.metrics.record_cache_miss(store.name(), key.as_str());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn fallback(&self, key: &RequestKey, strategy: CacheStrategy) -> Served {
        let response = strategy.fallback();
        self.metrics.record_fallback(key.as_str(), response.status);
        Served::new(response, ResponseSource::Fallback)
    }
}

/// Encode and store a response.
pub(crate) async fn remember<T: CacheStore>(
    store: &T,
    key: &RequestKey,
    response: &Response,
) -> Result<()> {
    let bytes = encode_snapshot(response)?;
    store.put(key.as_str(), bytes).await
}

/// Background half of stale-while-revalidate. Failures leave the stale
/// entry in place and are only logged.
async fn revalidate<T: CacheStore, F: Fetcher>(
    store: T,
    fetcher: F,
    request: Request,
    key: RequestKey,
    metrics: Arc<dyn WorkerMetrics>,
) {
    let updated = match fetcher.fetch(&request).await {
        Ok(response) if response.is_ok() => match remember(&store, &key, &response).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Revalidation of {} fetched but could not store: {}", key, e);
                false
            }
        },
        Ok(response) => {
            debug!("Revalidation of {} kept stale copy (status {})", key, response.status);
            false
        }
        Err(e) => {
            debug!("Revalidation of {} failed, keeping stale copy: {}", key, e);
            false
        }
    };
    metrics.record_revalidation(key.as_str(), updated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryStorage;
    use crate::fetcher::InMemoryFetcher;
    use crate::observability::{CountingMetrics, NoOpMetrics};
    use crate::request::Destination;
    use crate::serialization::SnapshotEnvelope;

    const ORIGIN: &str = "https://example.com";

    fn responder(
        storage: &InMemoryStorage,
        fetcher: &InMemoryFetcher,
    ) -> Responder<InMemoryStorage, InMemoryFetcher> {
        Responder::new(
            storage.clone(),
            fetcher.clone(),
            "static-vtest".to_string(),
            "dynamic-vtest".to_string(),
            Some(Url::parse("https://example.com/offline.html").unwrap()),
            Arc::new(NoOpMetrics),
        )
    }

    fn url(path: &str) -> String {
        format!("{}{}", ORIGIN, path)
    }

    async fn stored(storage: &InMemoryStorage, store: &str, path: &str) -> Option<Response> {
        let store = storage.open(store).await.unwrap();
        let key = Request::get(&url(path)).unwrap().key();
        store
            .get(key.as_str())
            .await
            .unwrap()
            .map(|bytes| decode_snapshot(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_each_strategy_writes_its_own_store() {
        for strategy in [
            CacheStrategy::CacheFirst,
            CacheStrategy::NetworkFirst,
            CacheStrategy::StaleWhileRevalidate,
        ] {
            let storage = InMemoryStorage::new();
            let fetcher = InMemoryFetcher::new();
            fetcher.respond(&url("/page"), Response::ok("body"));
            let responder = responder(&storage, &fetcher);

            let served = responder
                .respond(strategy, &Request::get(&url("/page")).unwrap())
                .await
                .unwrap();
            assert_eq!(served.source, ResponseSource::Network);

            let (written, untouched) = match strategy.store() {
                StoreKind::Static => ("static-vtest", "dynamic-vtest"),
                StoreKind::Dynamic => ("dynamic-vtest", "static-vtest"),
            };
            assert_eq!(responder.store_name(strategy.store()), written);
            assert_eq!(
                stored(&storage, written, "/page").await,
                Some(Response::ok("body")),
                "{} should write {}",
                strategy,
                written
            );
            assert_eq!(stored(&storage, untouched, "/page").await, None);
        }
    }

    // ------------------------------------------------------------------
    // Cache-first
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_cache_first_second_request_skips_network() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        fetcher.respond(&url("/img/me.png"), Response::ok(vec![0x89, 0x50]));
        let responder = responder(&storage, &fetcher);
        let request = Request::get(&url("/img/me.png"))
            .unwrap()
            .with_destination(Destination::Image);

        let first = responder.cache_first(&request).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);

        let second = responder.cache_first(&request).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response, first.response);
        assert_eq!(fetcher.calls(&url("/img/me.png")), 1);
    }

    #[tokio::test]
    async fn test_cache_first_stores_before_returning() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        fetcher.respond(&url("/img/a.png"), Response::ok("png"));
        let responder = responder(&storage, &fetcher);

        responder
            .cache_first(&Request::get(&url("/img/a.png")).unwrap())
            .await
            .unwrap();

        assert_eq!(
            stored(&storage, "dynamic-vtest", "/img/a.png").await,
            Some(Response::ok("png"))
        );
    }

    #[tokio::test]
    async fn test_cache_first_does_not_cache_errors() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        fetcher.respond(&url("/img/missing.png"), Response::new(404, "nope"));
        let responder = responder(&storage, &fetcher);
        let request = Request::get(&url("/img/missing.png")).unwrap();

        let served = responder.cache_first(&request).await.unwrap();
        assert_eq!(served.response.status, 404);
        assert_eq!(served.source, ResponseSource::Network);
        assert!(stored(&storage, "dynamic-vtest", "/img/missing.png")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_cache_first_network_failure_fallback() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        let responder = responder(&storage, &fetcher);

        let served = responder
            .cache_first(&Request::get(&url("/img/x.png")).unwrap())
            .await
            .unwrap();

        assert_eq!(served.source, ResponseSource::Fallback);
        assert_eq!(served.response, Response::image_unavailable());
        assert_eq!(fetcher.total_calls(), 1);
    }

    // ------------------------------------------------------------------
    // Network-first
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_network_first_returns_live_and_updates_store() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        let responder = responder(&storage, &fetcher);
        let request = Request::get(&url("/api/projects")).unwrap();

        fetcher.respond(&url("/api/projects"), Response::ok("[1]"));
        responder.network_first(&request).await.unwrap();

        fetcher.respond(&url("/api/projects"), Response::ok("[1,2]"));
        let served = responder.network_first(&request).await.unwrap();

        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.text(), "[1,2]");
        assert_eq!(
            stored(&storage, "dynamic-vtest", "/api/projects").await,
            Some(Response::ok("[1,2]"))
        );
    }

    #[tokio::test]
    async fn test_network_first_offline_uses_cache() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        let responder = responder(&storage, &fetcher);
        let request = Request::get(&url("/api/skills")).unwrap();

        fetcher.respond(&url("/api/skills"), Response::ok("[\"rust\"]"));
        responder.network_first(&request).await.unwrap();

        fetcher.set_offline(true);
        let served = responder.network_first(&request).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "[\"rust\"]");
    }

    #[tokio::test]
    async fn test_network_first_offline_without_cache_is_503() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        fetcher.set_offline(true);
        let responder = responder(&storage, &fetcher);

        let served = responder
            .network_first(&Request::get(&url("/api/skills")).unwrap())
            .await
            .unwrap();

        assert_eq!(served.response.status, 503);
        let body: serde_json::Value = served.response.json().unwrap();
        assert_eq!(body["error"], "Network unavailable");
    }

    #[tokio::test]
    async fn test_network_first_server_error_is_returned_not_cached() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        let responder = responder(&storage, &fetcher);
        let request = Request::get(&url("/api/skills")).unwrap();

        fetcher.respond(&url("/api/skills"), Response::ok("old"));
        responder.network_first(&request).await.unwrap();
        fetcher.respond(&url("/api/skills"), Response::new(500, "boom"));

        let served = responder.network_first(&request).await.unwrap();
        assert_eq!(served.response.status, 500);
        assert_eq!(
            stored(&storage, "dynamic-vtest", "/api/skills").await,
            Some(Response::ok("old"))
        );
    }

    // ------------------------------------------------------------------
    // Stale-while-revalidate
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_swr_hit_returns_stale_then_updates() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        let responder = responder(&storage, &fetcher);
        let request = Request::get(&url("/about")).unwrap();

        fetcher.respond(&url("/about"), Response::ok("v1"));
        let first = responder.stale_while_revalidate(&request).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert!(first.revalidation.is_none());

        fetcher.respond(&url("/about"), Response::ok("v2"));
        let second = responder.stale_while_revalidate(&request).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response.text(), "v1");

        second
            .revalidation
            .expect("hit should start a revalidation")
            .await
            .unwrap();
        assert_eq!(
            stored(&storage, "static-vtest", "/about").await,
            Some(Response::ok("v2"))
        );
    }

    #[tokio::test]
    async fn test_swr_failed_revalidation_keeps_stale() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        let responder = responder(&storage, &fetcher);
        let request = Request::get(&url("/about")).unwrap();

        fetcher.respond(&url("/about"), Response::ok("v1"));
        responder.stale_while_revalidate(&request).await.unwrap();

        fetcher.set_offline(true);
        let served = responder.stale_while_revalidate(&request).await.unwrap();
        served.revalidation.unwrap().await.unwrap();

        assert_eq!(served.response.text(), "v1");
        assert_eq!(
            stored(&storage, "static-vtest", "/about").await,
            Some(Response::ok("v1"))
        );
    }

    #[tokio::test]
    async fn test_swr_offline_page_fallback() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        let responder = responder(&storage, &fetcher);

        let offline = Response::ok("<h1>Offline</h1>");
        let store = storage.open("static-vtest").await.unwrap();
        remember(
            &store,
            &Request::get(&url("/offline.html")).unwrap().key(),
            &offline,
        )
        .await
        .unwrap();

        fetcher.set_offline(true);
        let served = responder
            .stale_while_revalidate(&Request::get(&url("/contact")).unwrap())
            .await
            .unwrap();

        assert_eq!(served.source, ResponseSource::Fallback);
        assert_eq!(served.response, offline);
    }

    #[tokio::test]
    async fn test_swr_without_offline_page_is_404() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        fetcher.set_offline(true);
        let responder = responder(&storage, &fetcher);

        let served = responder
            .stale_while_revalidate(&Request::get(&url("/contact")).unwrap())
            .await
            .unwrap();

        assert_eq!(served.response, Response::page_unavailable());
    }

    // ------------------------------------------------------------------
    // Store hygiene
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_corrupt_entry_is_evicted_and_refetched() {
        let storage = InMemoryStorage::new();
        let fetcher = InMemoryFetcher::new();
        fetcher.respond(&url("/img/a.png"), Response::ok("fresh"));
        let metrics = Arc::new(CountingMetrics::new());
        let responder = Responder::new(
            storage.clone(),
            fetcher.clone(),
            "static-vtest".to_string(),
            "dynamic-vtest".to_string(),
            None,
            metrics.clone(),
        );
        let request = Request::get(&url("/img/a.png")).unwrap();

        let mut stale = SnapshotEnvelope::new(Response::ok("old"));
        stale.version = 0;
        let store = storage.open("dynamic-vtest").await.unwrap();
        store
            .put(request.key().as_str(), postcard::to_allocvec(&stale).unwrap())
            .await
            .unwrap();

        let served = responder.cache_first(&request).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.text(), "fresh");
        assert_eq!(metrics.snapshot().cache_misses, 1);
    }
}
