//! Registration: which worker generation controls the page.
//!
//! A registration holds at most one `active` and one `waiting` generation.
//! [`Registration::update`] installs a new generation and either promotes
//! it right away or parks it until a `SKIP_WAITING` message arrives through
//! [`Registration::post_message`].

use crate::backend::CacheStorage;
use crate::error::Result;
use crate::events::EventOutcome;
use crate::fetcher::Fetcher;
use crate::lifecycle::ActivationReport;
use crate::request::Request;
use crate::router::PassReason;
use crate::service::OfflineWorker;
use tokio::sync::Mutex;

/// Where an updated generation ended up.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Promoted and now controlling the page.
    Activated(ActivationReport),
    /// Installed, waiting behind the active generation.
    Waiting,
}

struct Slots<S: CacheStorage, F: Fetcher> {
    active: Option<OfflineWorker<S, F>>,
    waiting: Option<OfflineWorker<S, F>>,
}

/// Active and waiting generations for one origin.
pub struct Registration<S: CacheStorage, F: Fetcher> {
    slots: Mutex<Slots<S, F>>,
}

impl<S: CacheStorage, F: Fetcher> Default for Registration<S, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CacheStorage, F: Fetcher> Registration<S, F> {
    pub fn new() -> Self {
        Registration {
            slots: Mutex::new(Slots {
                active: None,
                waiting: None,
            }),
        }
    }

    /// The generation controlling the page.
    pub async fn active(&self) -> Option<OfflineWorker<S, F>> {
        self.slots.lock().await.active.clone()
    }

    pub async fn waiting(&self) -> Option<OfflineWorker<S, F>> {
        self.slots.lock().await.waiting.clone()
    }

    pub async fn has_update_waiting(&self) -> bool {
        self.slots.lock().await.waiting.is_some()
    }

    /// Install `worker` and place it.
    ///
    /// It is promoted immediately when nothing is active or it asked to
    /// skip waiting. Otherwise it replaces any previous waiting generation.
    ///
    /// # Errors
    /// Install or activation failures. The registration is unchanged when
    /// install fails. A generation whose activation fails stays waiting, so a
    /// later `SKIP_WAITING` retries it.
    pub async fn update(&self, worker: OfflineWorker<S, F>) -> Result<UpdateOutcome> {
        let mut slots = self.slots.lock().await;
        worker.install().await?;

        if let Some(previous) = slots.waiting.take() {
            previous.retire()?;
        }

        if slots.active.is_none() || worker.skip_waiting_requested() {
            return match Self::promote(&mut slots, worker.clone()).await {
                Ok(report) => Ok(UpdateOutcome::Activated(report)),
                Err(e) => {
                    slots.waiting = Some(worker);
                    Err(e)
                }
            };
        }

        info!("Worker {} installed and waiting", worker.config().version);
        slots.waiting = Some(worker);
        Ok(UpdateOutcome::Waiting)
    }

    /// Deliver a page message.
    ///
    /// The waiting generation receives it when there is one, otherwise the
    /// active one. A skip-waiting request from the waiting generation
    /// promotes it.
    ///
    /// # Errors
    /// Activation failures during promotion. The generation then stays
    /// waiting.
    pub async fn post_message(&self, message: &serde_json::Value) -> Result<EventOutcome> {
        let mut slots = self.slots.lock().await;

        if let Some(waiting) = slots.waiting.take() {
            let outcome = waiting.message(message);
            if matches!(outcome, EventOutcome::SkipWaiting) {
                if let Err(e) = Self::promote(&mut slots, waiting.clone()).await {
                    slots.waiting = Some(waiting);
                    return Err(e);
                }
            } else {
                slots.waiting = Some(waiting);
            }
            return Ok(outcome);
        }

        Ok(match &slots.active {
            Some(active) => active.message(message),
            None => EventOutcome::Ignored,
        })
    }

    /// Fetch through the controlling generation.
    ///
    /// # Errors
    /// Store failures from the active worker.
    pub async fn fetch(&self, request: Request) -> Result<EventOutcome> {
        match self.active().await {
            Some(worker) => worker.fetch(request).await,
            None => Ok(EventOutcome::Passthrough(PassReason::NoController)),
        }
    }

    async fn promote(
        slots: &mut Slots<S, F>,
        worker: OfflineWorker<S, F>,
    ) -> Result<ActivationReport> {
        let report = worker.activate().await?;
        if let Some(old) = slots.active.replace(worker) {
            old.retire()?;
        }
        Ok(report)
    }
}
