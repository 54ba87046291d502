//! # offline-kit
//!
//! An offline-first caching worker for one web origin: it sits between a
//! page and the network and answers each request from named cache stores,
//! the network, or a synthetic fallback.
//!
//! ## Features
//!
//! - **Three strategies:** cache-first for images, network-first for the
//!   API, stale-while-revalidate for pages
//! - **Versioned generations:** every worker version owns a static and a
//!   dynamic store; activation deletes the rest
//! - **Atomic install:** static assets are precached all or nothing
//! - **Injected seams:** storage ([`CacheStorage`]) and network
//!   ([`Fetcher`]) are traits, with in-memory, Redis and `reqwest`
//!   implementations
//! - **Typed events:** install, activate, fetch, message, sync, push and
//!   notification click each have a typed payload and outcome
//!
//! ## Quick Start
//!
//! ```ignore
//! use offline_kit::{
//!     backend::InMemoryStorage, fetcher::HttpFetcher, EventOutcome,
//!     OfflineWorker, Request, WorkerConfig,
//! };
//!
//! // 1. Configure the generation
//! let config = WorkerConfig::for_origin("https://example.com")?.with_version("2");
//!
//! // 2. Build it over a storage backend and a fetcher
//! let worker = OfflineWorker::new(config, InMemoryStorage::new(), HttpFetcher::new(Default::default())?)?;
//!
//! // 3. Install and activate
//! worker.install().await?;
//! worker.activate().await?;
//!
//! // 4. Serve requests
//! match worker.fetch(Request::get("https://example.com/about")?).await? {
//!     EventOutcome::Respond(served) => println!("{} from {:?}", served.response.status, served.source),
//!     EventOutcome::Passthrough(reason) => println!("not handled: {}", reason),
//!     _ => {}
//! }
//! ```
//!
//! ### Updates
//!
//! Use [`Registration`] to hold the active generation and park a new one
//! until the page posts `{"type": "SKIP_WAITING"}`.

#[macro_use]
extern crate log;

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod lifecycle;
pub mod notification;
pub mod observability;
pub mod registration;
pub mod request;
pub mod responder;
pub mod response;
pub mod router;
pub mod serialization;
pub mod service;
pub mod strategy;

// Re-exports for convenience
pub use backend::{CacheStorage, CacheStore};
pub use config::WorkerConfig;
pub use error::{Error, Result};
pub use events::{ControlMessage, Event, EventKind, EventOutcome};
pub use fetcher::Fetcher;
pub use lifecycle::{ActivationReport, WorkerState};
pub use registration::{Registration, UpdateOutcome};
pub use request::{Destination, Method, Request, RequestKey};
pub use responder::{ResponseSource, Served};
pub use response::Response;
pub use service::{OfflineWorker, WorkerBuilder};
pub use strategy::CacheStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
