//! The offline worker: one generation of cache policy bound to an origin.
//!
//! Wraps routing, strategy execution and the lifecycle in an `Arc` so a
//! worker can be cloned into every task that handles a request.

use crate::backend::CacheStorage;
use crate::config::WorkerConfig;
use crate::error::Result;
use crate::events::{ControlMessage, Event, EventKind, EventOutcome};
use crate::fetcher::Fetcher;
use crate::lifecycle::{self, ActivationReport, Lifecycle, WorkerState};
use crate::notification;
use crate::observability::{NoOpMetrics, WorkerMetrics};
use crate::request::Request;
use crate::responder::Responder;
use crate::router::{Route, RouteDecision, Router};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

struct WorkerInner<S: CacheStorage, F: Fetcher> {
    config: WorkerConfig,
    router: Router,
    responder: Responder<S, F>,
    lifecycle: Lifecycle,
    listens: HashSet<EventKind>,
    metrics: Arc<dyn WorkerMetrics>,
}

/// One worker generation.
///
/// # Example
///
/// ```ignore
/// use offline_kit::{OfflineWorker, WorkerConfig, Request};
/// use offline_kit::backend::InMemoryStorage;
/// use offline_kit::fetcher::HttpFetcher;
///
/// let config = WorkerConfig::for_origin("https://example.com")?;
/// let worker = OfflineWorker::new(config, InMemoryStorage::new(), HttpFetcher::new(Default::default())?)?;
///
/// worker.install().await?;
/// worker.activate().await?;
///
/// let outcome = worker.fetch(Request::get("https://example.com/")?).await?;
/// ```
pub struct OfflineWorker<S: CacheStorage, F: Fetcher> {
    inner: Arc<WorkerInner<S, F>>,
}

impl<S: CacheStorage, F: Fetcher> Clone for OfflineWorker<S, F> {
    fn clone(&self) -> Self {
        OfflineWorker {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CacheStorage, F: Fetcher> std::fmt::Debug for OfflineWorker<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineWorker")
            .field("version", &self.inner.config.version)
            .field("state", &self.state())
            .finish()
    }
}

impl<S: CacheStorage, F: Fetcher> OfflineWorker<S, F> {
    /// Worker with default metrics and every event kind.
    ///
    /// # Errors
    /// `Error::Config` if `config` does not validate.
    pub fn new(config: WorkerConfig, storage: S, fetcher: F) -> Result<Self> {
        WorkerBuilder::new(config).build(storage, fetcher)
    }

    pub fn builder(config: WorkerConfig) -> WorkerBuilder {
        WorkerBuilder::new(config)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.inner.config
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    pub fn responder(&self) -> &Responder<S, F> {
        &self.inner.responder
    }

    pub fn state(&self) -> WorkerState {
        self.inner.lifecycle.state()
    }

    /// Follow state changes of this generation.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.inner.lifecycle.subscribe()
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.inner.lifecycle.skip_waiting_requested()
    }

    pub fn clients_claimed(&self) -> bool {
        self.inner.lifecycle.clients_claimed()
    }

    pub fn listens_to(&self, kind: EventKind) -> bool {
        self.inner.listens.contains(&kind)
    }

    /// Dispatch one event.
    ///
    /// Kinds this worker does not listen to give `EventOutcome::Unhandled`.
    ///
    /// # Errors
    ///
    /// - `Error::InstallFailed`: install could not precache every asset
    /// - `Error::InvalidState`: the event does not fit the current state
    /// - `Error::Store`: the backend failed
    /// - `Error::Deserialization`: a push payload was not JSON
    pub async fn handle(&self, event: Event) -> Result<EventOutcome> {
        let kind = event.kind();
        if !self.listens_to(kind) {
            debug!("No {} handler registered", kind);
            return Ok(EventOutcome::Unhandled);
        }

        match event {
            Event::Install => self.install().await.map(|_| EventOutcome::Installed),
            Event::Activate => self.activate().await.map(EventOutcome::Activated),
            Event::Fetch(request) => self.fetch(request).await,
            Event::Message(message) => Ok(self.message(&message)),
            Event::Sync { tag } => Ok(self.sync(&tag)),
            Event::Push(data) => self.push(data.as_deref()),
            Event::NotificationClick { action } => Ok(self.notification_click(action.as_deref())),
        }
    }

    /// Precache the static assets and move to `Installed`.
    ///
    /// Returns the number of assets cached. On failure the generation is
    /// left in `InstallFailed`.
    ///
    /// # Errors
    /// `Error::InstallFailed`, `Error::InvalidState` or `Error::Store`.
    pub async fn install(&self) -> Result<usize> {
        let inner = &self.inner;
        inner.lifecycle.transition(WorkerState::Installing)?;

        match lifecycle::install(&inner.config, inner.responder.storage(), inner.responder.fetcher())
            .await
        {
            Ok(count) => {
                inner.lifecycle.transition(WorkerState::Installed)?;
                if inner.config.skip_waiting_on_install {
                    inner.lifecycle.request_skip_waiting();
                }
                Ok(count)
            }
            Err(e) => {
                inner.lifecycle.transition(WorkerState::InstallFailed)?;
                Err(e)
            }
        }
    }

    /// Drop stale stores, claim clients and move to `Active`.
    ///
    /// A generation left in `Activating` by a failed cleanup can call this
    /// again to retry.
    ///
    /// # Errors
    /// `Error::InvalidState` unless installed or activating, or `Error::Store`.
    pub async fn activate(&self) -> Result<ActivationReport> {
        let inner = &self.inner;
        if inner.lifecycle.state() == WorkerState::Activating {
            info!("Retrying activation of {}", inner.config.version);
        } else {
            inner.lifecycle.transition(WorkerState::Activating)?;
        }

        let report = match lifecycle::cleanup(
            &inner.config,
            inner.responder.storage(),
            inner.metrics.as_ref(),
        )
        .await
        {
            Ok(report) => report,
            Err(e) => {
                error!("Activation of {} failed: {}", inner.config.version, e);
                return Err(e);
            }
        };

        inner.lifecycle.claim_clients();
        inner.lifecycle.transition(WorkerState::Active)?;
        info!(
            "Worker {} active ({} stale stores removed)",
            inner.config.version,
            report.deleted.len()
        );
        Ok(report)
    }

    /// Route and answer one request.
    ///
    /// # Errors
    /// Only `Error::Store` (and snapshot encoding failures). Network failures
    /// are answered with a fallback response.
    pub async fn fetch(&self, request: Request) -> Result<EventOutcome> {
        let route = match self.inner.router.route(&request) {
            RouteDecision::Passthrough(reason) => {
                debug!("Passthrough {}: {}", request.url(), reason);
                return Ok(EventOutcome::Passthrough(reason));
            }
            RouteDecision::Handle(route) => route,
        };

        match self.inner.responder.respond(route.strategy, &request).await {
            Ok(served) => Ok(EventOutcome::Respond(served)),
            Err(e) => {
                error!("Failed to serve {} via {}: {}", request.url(), route.name, e);
                Err(e)
            }
        }
    }

    /// Handle a message posted from a page.
    pub fn message(&self, message: &serde_json::Value) -> EventOutcome {
        match ControlMessage::parse(message) {
            Some(ControlMessage::SkipWaiting) => {
                info!("Skip waiting requested for {}", self.inner.config.version);
                self.inner.lifecycle.request_skip_waiting();
                EventOutcome::SkipWaiting
            }
            None => EventOutcome::Ignored,
        }
    }

    pub fn sync(&self, tag: &str) -> EventOutcome {
        if notification::on_sync(tag, &self.inner.config.sync_tag) {
            EventOutcome::Synced {
                tag: tag.to_string(),
            }
        } else {
            EventOutcome::Ignored
        }
    }

    /// # Errors
    /// `Error::Deserialization` if `data` is not a JSON payload.
    pub fn push(&self, data: Option<&[u8]>) -> Result<EventOutcome> {
        Ok(
            match notification::on_push(data, &self.inner.config.notification_icon)? {
                Some(notification) => EventOutcome::ShowNotification(notification),
                None => EventOutcome::Ignored,
            },
        )
    }

    pub fn notification_click(&self, action: Option<&str>) -> EventOutcome {
        EventOutcome::NotificationClicked {
            open_window: notification::on_click(action).map(str::to_string),
        }
    }

    /// Mark this generation as replaced.
    ///
    /// # Errors
    /// `Error::InvalidState` unless the worker is installed or active.
    pub fn retire(&self) -> Result<()> {
        info!("Retiring worker {}", self.inner.config.version);
        self.inner.lifecycle.transition(WorkerState::Redundant)
    }
}

/// Builder for [`OfflineWorker`].
pub struct WorkerBuilder {
    config: WorkerConfig,
    metrics: Arc<dyn WorkerMetrics>,
    listens: HashSet<EventKind>,
    routes: Option<Vec<Route>>,
}

impl WorkerBuilder {
    pub fn new(config: WorkerConfig) -> Self {
        WorkerBuilder {
            config,
            metrics: Arc::new(NoOpMetrics),
            listens: EventKind::all(),
            routes: None,
        }
    }

    pub fn metrics(mut self, metrics: Arc<dyn WorkerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Listen only to `kinds`. Everything else is `Unhandled`.
    pub fn listen(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.listens = kinds.into_iter().collect();
        self
    }

    /// Replace the default route table.
    pub fn routes(mut self, routes: Vec<Route>) -> Self {
        self.routes = Some(routes);
        self
    }

    /// # Errors
    /// `Error::Config` if the configuration does not validate.
    pub fn build<S: CacheStorage, F: Fetcher>(
        self,
        storage: S,
        fetcher: F,
    ) -> Result<OfflineWorker<S, F>> {
        let config = self.config;
        config.validate()?;

        let router = match self.routes {
            Some(routes) => Router::with_routes(config.origin.clone(), routes),
            None => Router::new(config.origin.clone(), &config.api_prefix),
        };
        let offline_page = config
            .offline_page
            .as_deref()
            .map(|page| config.resolve(page))
            .transpose()?;
        let responder = Responder::new(
            storage,
            fetcher,
            config.static_cache_name(),
            config.dynamic_cache_name(),
            offline_page,
            Arc::clone(&self.metrics),
        );

        Ok(OfflineWorker {
            inner: Arc::new(WorkerInner {
                config,
                router,
                responder,
                lifecycle: Lifecycle::new(),
                listens: self.listens,
                metrics: self.metrics,
            }),
        })
    }
}
