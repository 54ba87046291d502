//! Intercepted requests and cache key normalization.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// HTTP request method.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    /// Any other token, stored upper-cased.
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Other(token) => token,
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim().to_ascii_uppercase();
        if token.is_empty() {
            return Err(Error::InvalidRequest("empty method".to_string()));
        }
        Ok(match token.as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            _ => Method::Other(token),
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch destination: what the page intends to do with the response.
///
/// Parsed from the wire strings the page reports (`"image"`, `"document"`,
/// `""` for plain `fetch()` calls, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    /// No destination, e.g. `fetch()` or XHR.
    #[default]
    Empty,
    Other(String),
}

impl Destination {
    pub fn as_str(&self) -> &str {
        match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
            Destination::Empty => "",
            Destination::Other(name) => name,
        }
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "image" => Destination::Image,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            "" => Destination::Empty,
            other => Destination::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound request intercepted from the page.
///
/// # Example
///
/// ```
/// use offline_kit::request::{Destination, Request};
///
/// let request = Request::get("https://example.com/img/me.png#top")
///     .unwrap()
///     .with_destination(Destination::Image);
///
/// assert_eq!(request.key().as_str(), "GET https://example.com/img/me.png");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
    destination: Destination,
    headers: BTreeMap<String, String>,
}

impl Request {
    /// Build a request for an absolute URL.
    ///
    /// Any scheme is accepted; requests the worker does not serve, such as
    /// `data:` or extension URLs, are left to the router to pass through.
    ///
    /// # Errors
    /// `Error::InvalidRequest` if the URL does not parse.
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        Ok(Self::from_url(method, url))
    }

    /// Shorthand for `Request::new(Method::Get, url)`.
    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::Get, url)
    }

    /// Build a request from an already-parsed URL.
    pub fn from_url(method: Method, url: Url) -> Self {
        Request {
            method,
            url,
            destination: Destination::default(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Add a header. Names are stored lower-cased.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Whether the request targets the given origin (scheme, host and port).
    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }

    /// Normalized cache key for this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

/// Normalized cache key: `"{METHOD} {absolute URL without fragment}"`.
///
/// Query strings are part of the key; fragments never reach the server and
/// are dropped.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        RequestKey(format!("{} {}", method, url))
    }

    /// Key for a plain GET of `url`.
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::Get, url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a stored key back into method and URL.
    pub fn parse(key: &str) -> Result<(Method, Url)> {
        let (method, url) = key
            .split_once(' ')
            .ok_or_else(|| Error::InvalidRequest(format!("malformed cache key: {}", key)))?;
        Ok((method.parse()?, Url::parse(url)?))
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
