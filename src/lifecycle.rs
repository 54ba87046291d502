//! Worker generation lifecycle.
//!
//! ```text
//! Dormant ─► Installing ─┬─► Installed ─► Activating ─► Active ─► Redundant
//!                        └─► InstallFailed
//! ```
//!
//! `InstallFailed` and `Redundant` are terminal. An installed generation
//! can also go straight to `Redundant` when a newer one replaces it before
//! it ever activates.
//!
//! State lives in a `tokio::sync::watch` channel so hosts can follow
//! `statechange`-style updates through [`Lifecycle::subscribe`].

use crate::backend::{CacheStorage, CacheStore};
use crate::config::WorkerConfig;
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::observability::WorkerMetrics;
use crate::request::{Destination, Method, Request, RequestKey};
use crate::response::Response;
use crate::responder::remember;
use futures::future::{join_all, try_join_all};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Lifecycle state of one worker generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerState {
    Dormant,
    Installing,
    Installed,
    InstallFailed,
    Activating,
    Active,
    Redundant,
}

impl WorkerState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Dormant, Installing)
                | (Installing, Installed)
                | (Installing, InstallFailed)
                | (Installed, Activating)
                | (Installed, Redundant)
                | (Activating, Active)
                | (Active, Redundant)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::InstallFailed | WorkerState::Redundant)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Dormant => "dormant",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::InstallFailed => "install-failed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Result of a successful activation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stale stores that were deleted.
    pub deleted: Vec<String>,
    /// Current stores that were kept.
    pub kept: Vec<String>,
}

/// State machine plus the host-facing flags of one generation.
#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(WorkerState::Dormant);
        Lifecycle {
            state,
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receiver that observes every later state change.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Move to `next`, or fail with `Error::InvalidState`.
    pub fn transition(&self, next: WorkerState) -> Result<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                debug!("Worker state {} -> {}", current, next);
                *current = next;
                true
            } else {
                outcome = Err(Error::InvalidState {
                    from: current.to_string(),
                    to: next.to_string(),
                });
                false
            }
        });
        outcome
    }

    /// Ask the host to skip the waiting phase.
    pub fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn claim_clients(&self) {
        self.clients_claimed.store(true, Ordering::SeqCst);
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }
}

/// Fetch one static asset; anything but a 2xx fails the install.
async fn fetch_asset<F: Fetcher>(fetcher: &F, request: Request) -> Result<(Request, Response)> {
    match fetcher.fetch(&request).await {
        Ok(response) if response.is_ok() => Ok((request, response)),
        Ok(response) => Err(Error::InstallFailed {
            url: request.url().to_string(),
            reason: format!("status {}", response.status),
        }),
        Err(e) => Err(Error::InstallFailed {
            url: request.url().to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Precache every static asset, all or nothing.
///
/// Every asset is fetched before anything is written. If any fetch fails,
/// nothing is stored. If a write fails, the entries this attempt wrote are
/// removed again, or the whole static store when this attempt created it.
///
/// # Errors
///
/// - `Error::InstallFailed`: an asset could not be fetched
/// - `Error::Store`: the backend failed while writing
pub(crate) async fn install<S: CacheStorage, F: Fetcher>(
    config: &WorkerConfig,
    storage: &S,
    fetcher: &F,
) -> Result<usize> {
    let static_name = config.static_cache_name();
    info!("Installing worker {} ({} static assets)", config.version, config.static_assets.len());

    let requests = config
        .static_assets
        .iter()
        .map(|path| -> Result<Request> {
            let destination = if path.ends_with(".svg") || path.ends_with(".png") {
                Destination::Image
            } else if path.ends_with(".json") {
                Destination::Manifest
            } else {
                Destination::Document
            };
            Ok(Request::from_url(Method::Get, config.resolve(path)?)
                .with_destination(destination))
        })
        .collect::<Result<Vec<Request>>>()?;

    let fetched = match try_join_all(requests.into_iter().map(|r| fetch_asset(fetcher, r))).await {
        Ok(fetched) => fetched,
        Err(e) => {
            error!("Failed to precache static assets: {}", e);
            return Err(e);
        }
    };

    let existed = storage.has(&static_name).await?;
    let store = storage.open(&static_name).await?;
    let keys: Vec<RequestKey> = fetched.iter().map(|(request, _)| request.key()).collect();
    let results = join_all(
        keys.iter()
            .zip(&fetched)
            .map(|(key, (_, response))| remember(&store, key, response)),
    )
    .await;

    let mut written = Vec::new();
    let mut failure = None;
    for (key, result) in keys.iter().zip(results) {
        match result {
            Ok(()) => written.push(key),
            Err(e) => {
                failure.get_or_insert(e);
            }
        }
    }

    if let Some(e) = failure {
        error!("Failed to write static assets to {}: {}", static_name, e);
        if existed {
            for key in written {
                store.delete(key.as_str()).await?;
            }
        } else {
            storage.delete(&static_name).await?;
        }
        return Err(e);
    }

    info!("✓ Static assets cached in {}", store.name());
    Ok(fetched.len())
}

/// Delete every store that is not one of this generation's two.
///
/// # Errors
/// `Error::Store` if listing or deleting fails.
pub(crate) async fn cleanup<S: CacheStorage>(
    config: &WorkerConfig,
    storage: &S,
    metrics: &dyn WorkerMetrics,
) -> Result<ActivationReport> {
    let current = [config.static_cache_name(), config.dynamic_cache_name()];
    let (kept, stale): (Vec<String>, Vec<String>) = storage
        .keys()
        .await?
        .into_iter()
        .partition(|name| current.contains(name));

    try_join_all(stale.iter().map(|name| async move {
        info!("Deleting old cache {}", name);
        storage.delete(name).await
    }))
    .await?;

    for name in &stale {
        metrics.record_store_deleted(name);
    }

    Ok(ActivationReport {
        deleted: stale,
        kept,
    })
}
