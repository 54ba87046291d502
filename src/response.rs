//! Responses served to the page, and the synthetic fallbacks.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content type of the synthetic plain-text fallbacks.
pub const TEXT_PLAIN: &str = "text/plain;charset=UTF-8";

/// Content type of the synthetic JSON fallback.
pub const APPLICATION_JSON: &str = "application/json";

/// A response snapshot: status, headers and the full body.
///
/// This is also the value stored in the named cache stores (see
/// [`crate::serialization`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Response {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// 200 response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body as UTF-8 text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    ///
    /// # Errors
    /// `Error::Deserialization` if the body is not valid JSON for `T`.
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    // ------------------------------------------------------------------
    // Synthetic fallbacks
    // ------------------------------------------------------------------

    /// Served when an image is neither cached nor reachable.
    pub fn image_unavailable() -> Self {
        Self::new(404, "Image not available").with_header("content-type", TEXT_PLAIN)
    }

    /// Served when an API call fails and no cached copy exists.
    pub fn network_unavailable() -> Self {
        let body = serde_json::json!({ "error": "Network unavailable" }).to_string();
        Self::new(503, body).with_header("content-type", APPLICATION_JSON)
    }

    /// Served when a page is not cached, unreachable, and there is no
    /// offline page either.
    pub fn page_unavailable() -> Self {
        Self::new(404, "Page not available offline").with_header("content-type", TEXT_PLAIN)
    }
}
