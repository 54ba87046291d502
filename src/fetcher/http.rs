//! `reqwest`-backed network fetcher.

use super::Fetcher;
use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;
use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// User agent string (default: "offline-kit/{version}")
    pub user_agent: String,

    /// Whole-request timeout. `None` (the default) waits forever, matching a
    /// browser fetch with no abort signal.
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 20)
    pub max_redirects: usize,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("offline-kit/{}", crate::VERSION),
            timeout: None,
            max_redirects: 20,
        }
    }
}

/// Fetcher that performs real HTTP requests.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given configuration.
    ///
    /// # Errors
    /// Returns `Error::Config` if the client cannot be built (TLS backend).
    pub fn new(config: HttpFetcherConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpFetcher { client })
    }

    fn method(request: &Request) -> Result<reqwest::Method> {
        reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|e| Error::InvalidRequest(e.to_string()))
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let mut builder = self
            .client
            .request(Self::method(request)?, request.url().clone());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let upstream = builder.send().await?;
        let status = upstream.status().as_u16();

        let headers = snapshot_headers(upstream.headers(), request);

        let body = upstream.bytes().await?.to_vec();
        debug!(
            "HTTP FETCH {} -> {} ({} bytes)",
            request.url(),
            status,
            body.len()
        );

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

/// Flatten response headers. Repeated names are joined with `", "`; values
/// that are not visible ASCII are dropped.
fn snapshot_headers(
    map: &reqwest::header::HeaderMap,
    request: &Request,
) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else {
            debug!("Dropping undecodable header {} from {}", name, request.url());
            continue;
        };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}
