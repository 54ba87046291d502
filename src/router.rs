//! Request routing: whether the worker handles a request, and with which
//! strategy.
//!
//! Classification is an ordered table of [`Route`]s evaluated top-down;
//! the first matching route wins. The default table is:
//!
//! | # | Route | Matcher | Strategy |
//! |---|-------|---------|----------|
//! | 1 | `images` | destination is `image` | CacheFirst |
//! | 2 | `api` | path starts with `/api/` | NetworkFirst |
//! | 3 | `pages` | anything | StaleWhileRevalidate |
//!
//! Before the table is consulted, non-GET requests and requests to a
//! foreign origin are passed through untouched.

use crate::request::{Destination, Method, Request};
use crate::strategy::CacheStrategy;
use serde::{Deserialize, Serialize};
use url::Url;

/// Predicate half of a route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Matcher {
    /// Request destination equals this one.
    Destination(Destination),
    /// URL path starts with this prefix.
    PathPrefix(String),
    /// Matches everything.
    Any,
}

impl Matcher {
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            Matcher::Destination(destination) => request.destination() == destination,
            Matcher::PathPrefix(prefix) => request.path().starts_with(prefix.as_str()),
            Matcher::Any => true,
        }
    }
}

/// One `(matcher, strategy)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub matcher: Matcher,
    pub strategy: CacheStrategy,
}

impl Route {
    pub fn new(name: &str, matcher: Matcher, strategy: CacheStrategy) -> Self {
        Route {
            name: name.to_string(),
            matcher,
            strategy,
        }
    }
}

/// Why a request was not intercepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassReason {
    /// Only GET is cached.
    NonGetMethod(Method),
    /// The request leaves the page's origin.
    ForeignOrigin(String),
    /// No route matched (only possible with a custom table lacking `Any`).
    NoRoute,
    /// No active worker controls the page.
    NoController,
}

impl std::fmt::Display for PassReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassReason::NonGetMethod(method) => write!(f, "non-GET method {}", method),
            PassReason::ForeignOrigin(origin) => write!(f, "foreign origin {}", origin),
            PassReason::NoRoute => write!(f, "no matching route"),
            PassReason::NoController => write!(f, "no active worker"),
        }
    }
}

/// Outcome of routing one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision<'a> {
    /// Let the request reach the network unmediated.
    Passthrough(PassReason),
    /// Serve through this route's strategy.
    Handle(&'a Route),
}

/// Ordered route table bound to one origin.
#[derive(Clone, Debug)]
pub struct Router {
    origin: Url,
    routes: Vec<Route>,
}

impl Router {
    /// Router with the default table for `origin` and `api_prefix`.
    pub fn new(origin: Url, api_prefix: &str) -> Self {
        Router {
            origin,
            routes: Self::default_routes(api_prefix),
        }
    }

    /// Router with a custom table.
    pub fn with_routes(origin: Url, routes: Vec<Route>) -> Self {
        Router { origin, routes }
    }

    pub fn default_routes(api_prefix: &str) -> Vec<Route> {
        vec![
            Route::new(
                "images",
                Matcher::Destination(Destination::Image),
                CacheStrategy::CacheFirst,
            ),
            Route::new(
                "api",
                Matcher::PathPrefix(api_prefix.to_string()),
                CacheStrategy::NetworkFirst,
            ),
            Route::new("pages", Matcher::Any, CacheStrategy::StaleWhileRevalidate),
        ]
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Decide how `request` is handled.
    pub fn route(&self, request: &Request) -> RouteDecision<'_> {
        if request.method() != &Method::Get {
            return RouteDecision::Passthrough(PassReason::NonGetMethod(request.method().clone()));
        }

        if !request.is_same_origin(&self.origin) {
            let origin = request.url().origin();
            let origin = if origin.is_tuple() {
                origin.ascii_serialization()
            } else {
                format!("{}:", request.url().scheme())
            };
            return RouteDecision::Passthrough(PassReason::ForeignOrigin(origin));
        }

        match self.routes.iter().find(|route| route.matcher.matches(request)) {
            Some(route) => RouteDecision::Handle(route),
            None => RouteDecision::Passthrough(PassReason::NoRoute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new(Url::parse("https://example.com").unwrap(), "/api/")
    }

    fn strategy_for(request: &Request) -> Option<CacheStrategy> {
        match router().route(request) {
            RouteDecision::Handle(route) => Some(route.strategy),
            RouteDecision::Passthrough(_) => None,
        }
    }

    #[test]
    fn test_image_is_cache_first() {
        let request = Request::get("https://example.com/img/avatar.webp")
            .unwrap()
            .with_destination(Destination::Image);
        assert_eq!(strategy_for(&request), Some(CacheStrategy::CacheFirst));
    }

    #[test]
    fn test_api_is_network_first() {
        let request = Request::get("https://example.com/api/projects?page=2").unwrap();
        assert_eq!(strategy_for(&request), Some(CacheStrategy::NetworkFirst));
    }

    #[test]
    fn test_image_under_api_prefix_is_cache_first() {
        // First match wins: the image rule sits above the API rule.
        let request = Request::get("https://example.com/api/thumb.png")
            .unwrap()
            .with_destination(Destination::Image);
        assert_eq!(strategy_for(&request), Some(CacheStrategy::CacheFirst));
    }

    #[test]
    fn test_api_prefix_needs_trailing_slash() {
        let request = Request::get("https://example.com/apidocs").unwrap();
        assert_eq!(
            strategy_for(&request),
            Some(CacheStrategy::StaleWhileRevalidate)
        );
    }

    #[test]
    fn test_document_is_stale_while_revalidate() {
        let request = Request::get("https://example.com/projects")
            .unwrap()
            .with_destination(Destination::Document);
        assert_eq!(
            strategy_for(&request),
            Some(CacheStrategy::StaleWhileRevalidate)
        );
    }

    #[test]
    fn test_post_passes_through() {
        let request = Request::new(Method::Post, "https://example.com/api/contact").unwrap();
        assert_eq!(
            router().route(&request),
            RouteDecision::Passthrough(PassReason::NonGetMethod(Method::Post))
        );
    }

    #[test]
    fn test_foreign_origin_passes_through() {
        let request = Request::get("https://fonts.example.net/inter.woff2").unwrap();
        assert_eq!(
            router().route(&request),
            RouteDecision::Passthrough(PassReason::ForeignOrigin(
                "https://fonts.example.net".to_string()
            ))
        );
    }

    #[test]
    fn test_non_http_schemes_pass_through() {
        let extension = Request::get("chrome-extension://abc/icon.png")
            .unwrap()
            .with_destination(Destination::Image);
        assert_eq!(
            router().route(&extension),
            RouteDecision::Passthrough(PassReason::ForeignOrigin(
                "chrome-extension:".to_string()
            ))
        );

        let data = Request::get("data:image/png;base64,AAAA").unwrap();
        assert_eq!(
            router().route(&data),
            RouteDecision::Passthrough(PassReason::ForeignOrigin("data:".to_string()))
        );
    }

    #[test]
    fn test_custom_table_without_fallback_route() {
        let router = Router::with_routes(
            Url::parse("https://example.com").unwrap(),
            vec![Route::new(
                "api",
                Matcher::PathPrefix("/api/".to_string()),
                CacheStrategy::NetworkFirst,
            )],
        );
        let request = Request::get("https://example.com/about").unwrap();
        assert_eq!(
            router.route(&request),
            RouteDecision::Passthrough(PassReason::NoRoute)
        );
    }
}
