//! Network fetcher trait: the worker's only way out to the network.
//!
//! The `Fetcher` trait decouples the strategies from a concrete HTTP client.
//! Strategies call it at most once per request; there is no retry and no
//! timeout wrapper.
//!
//! # Implementing Fetcher
//!
//! - [`InMemoryFetcher`]: scripted responses and failures, for tests
//! - `HttpFetcher` (feature `http`): a real `reqwest` client
//!
//! # Error contract
//!
//! Return `Err(Error::Network(..))` only when the call itself throws
//! (offline, DNS failure, connection reset). A 404 or 500 from the server is
//! a successful fetch and must come back as `Ok(response)`; the strategies
//! decide whether a non-2xx response is cached (it never is).

use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use std::future::Future;

#[cfg(feature = "http")]
pub mod http;
pub mod inmemory;

#[cfg(feature = "http")]
pub use http::{HttpFetcher, HttpFetcherConfig};
pub use inmemory::InMemoryFetcher;

/// Trait for network fetcher implementations.
pub trait Fetcher: Send + Sync + Clone + 'static {
    /// Perform one network request.
    ///
    /// # Errors
    /// Returns `Err` if the request could not be completed at all.
    fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}
