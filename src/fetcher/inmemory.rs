//! Scripted in-memory fetcher.

use super::Fetcher;
use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug)]
enum Scripted {
    Respond(Response),
    Fail(String),
}

/// Fetcher that answers from a table of canned responses.
///
/// URLs are matched without their fragment. Unscripted URLs fail like an
/// unreachable host. Every call is counted, including failed ones, so tests
/// can assert how many times the network was hit.
///
/// # Example
///
/// ```
/// use offline_kit::fetcher::{Fetcher, InMemoryFetcher};
/// use offline_kit::request::Request;
/// use offline_kit::response::Response;
///
/// # #[tokio::main]
/// # async fn main() -> offline_kit::Result<()> {
/// let fetcher = InMemoryFetcher::new();
/// fetcher.respond("https://example.com/api/projects", Response::ok("[]"));
///
/// let request = Request::get("https://example.com/api/projects")?;
/// let response = fetcher.fetch(&request).await?;
/// assert_eq!(response.text(), "[]");
/// assert_eq!(fetcher.calls("https://example.com/api/projects"), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryFetcher {
    routes: Arc<DashMap<String, Scripted>>,
    calls: Arc<DashMap<String, usize>>,
    total_calls: Arc<AtomicUsize>,
    offline: Arc<AtomicBool>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(url: &str) -> String {
        match url::Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => url.to_string(),
        }
    }

    /// Answer `url` with `response` (replacing any earlier script).
    pub fn respond(&self, url: &str, response: Response) {
        self.routes
            .insert(Self::normalize(url), Scripted::Respond(response));
    }

    /// Make fetches of `url` throw with `reason`.
    pub fn fail(&self, url: &str, reason: &str) {
        self.routes
            .insert(Self::normalize(url), Scripted::Fail(reason.to_string()));
    }

    /// Forget the script for `url`.
    pub fn remove(&self, url: &str) {
        self.routes.remove(&Self::normalize(url));
    }

    /// Simulate losing (or regaining) connectivity for every URL.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetches issued for `url`.
    pub fn calls(&self, url: &str) -> usize {
        self.calls
            .get(&Self::normalize(url))
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Number of fetches issued overall.
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for InMemoryFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let mut url = request.url().clone();
        url.set_fragment(None);
        let url = url.to_string();

        *self.calls.entry(url.clone()).or_insert(0) += 1;
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            debug!("InMemory FETCH {} -> offline", url);
            return Err(Error::Network(format!("offline: {}", url)));
        }

        let scripted = self.routes.get(&url).map(|entry| entry.value().clone());
        match scripted {
            Some(Scripted::Respond(response)) => {
                debug!("InMemory FETCH {} -> {}", url, response.status);
                Ok(response)
            }
            Some(Scripted::Fail(reason)) => {
                debug!("InMemory FETCH {} -> failed: {}", url, reason);
                Err(Error::Network(reason))
            }
            None => Err(Error::Network(format!("host unreachable: {}", url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_response() {
        let fetcher = InMemoryFetcher::new();
        fetcher.respond("https://example.com/", Response::ok("home"));

        let request = Request::get("https://example.com/#about").unwrap();
        let response = fetcher.fetch(&request).await.unwrap();

        assert_eq!(response.text(), "home");
        assert_eq!(fetcher.calls("https://example.com/"), 1);
    }

    #[tokio::test]
    async fn test_unscripted_url_fails() {
        let fetcher = InMemoryFetcher::new();
        let request = Request::get("https://example.com/missing").unwrap();

        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(fetcher.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_non_2xx_is_ok() {
        let fetcher = InMemoryFetcher::new();
        fetcher.respond("https://example.com/gone", Response::new(410, "gone"));

        let request = Request::get("https://example.com/gone").unwrap();
        let response = fetcher.fetch(&request).await.unwrap();
        assert_eq!(response.status, 410);
    }

    #[tokio::test]
    async fn test_offline_switch() {
        let fetcher = InMemoryFetcher::new();
        fetcher.respond("https://example.com/", Response::ok("home"));
        let request = Request::get("https://example.com/").unwrap();

        fetcher.set_offline(true);
        assert!(fetcher.fetch(&request).await.is_err());

        fetcher.set_offline(false);
        assert!(fetcher.fetch(&request).await.is_ok());
        assert_eq!(fetcher.calls("https://example.com/"), 2);
    }

    #[tokio::test]
    async fn test_fail_script() {
        let fetcher = InMemoryFetcher::new();
        fetcher.fail("https://example.com/api/x", "connection reset");

        let request = Request::get("https://example.com/api/x").unwrap();
        match fetcher.fetch(&request).await.unwrap_err() {
            Error::Network(reason) => assert_eq!(reason, "connection reset"),
            e => panic!("Expected Network, got {:?}", e),
        }
    }
}
