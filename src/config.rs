//! Worker configuration.
//!
//! Everything a worker generation needs to know up front: its version tag,
//! the origin it serves, which assets to precache, and where the offline
//! page lives.
//!
//! Configuration is built in code with `with_*` setters or loaded from JSON:
//!
//! ```
//! use offline_kit::config::WorkerConfig;
//!
//! let config = WorkerConfig::from_json(r#"{
//!     "origin": "https://portfolio.example",
//!     "version": "1.0.0",
//!     "static_assets": ["/", "/index.html"]
//! }"#).unwrap();
//!
//! assert_eq!(config.static_cache_name(), "static-v1.0.0");
//! assert_eq!(config.dynamic_cache_name(), "dynamic-v1.0.0");
//! assert_eq!(config.offline_page.as_deref(), Some("/offline.html"));
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Version tag baked in at build time (see `build.rs`).
pub const BUILD_WORKER_VERSION: &str = env!("OFFLINE_KIT_WORKER_VERSION");

/// Background-sync tag for queued contact form submissions.
pub const CONTACT_FORM_SYNC_TAG: &str = "contact-form";

fn default_version() -> String {
    BUILD_WORKER_VERSION.to_string()
}

fn default_origin() -> Url {
    Url::parse("http://localhost/").expect("static URL is valid")
}

fn default_static_assets() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/favicon.svg"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_offline_page() -> Option<String> {
    Some("/offline.html".to_string())
}

fn default_api_prefix() -> String {
    "/api/".to_string()
}

fn default_true() -> bool {
    true
}

fn default_notification_icon() -> String {
    "/favicon.svg".to_string()
}

fn default_sync_tag() -> String {
    CONTACT_FORM_SYNC_TAG.to_string()
}

/// Configuration for one worker generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Generation tag. Store names derive from it.
    #[serde(default = "default_version")]
    pub version: String,

    /// The page's own origin. Requests to any other origin pass through.
    #[serde(default = "default_origin")]
    pub origin: Url,

    /// Paths precached on install, all or nothing.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Page served when navigation fails with nothing cached.
    #[serde(default = "default_offline_page")]
    pub offline_page: Option<String>,

    /// Path prefix routed to the network-first strategy.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Ask to skip the waiting phase as soon as install succeeds.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Icon and badge for push notifications.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    /// Background-sync tag this worker answers to.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            version: default_version(),
            origin: default_origin(),
            static_assets: default_static_assets(),
            offline_page: default_offline_page(),
            api_prefix: default_api_prefix(),
            skip_waiting_on_install: true,
            notification_icon: default_notification_icon(),
            sync_tag: default_sync_tag(),
        }
    }
}

impl WorkerConfig {
    /// Default configuration for `origin`.
    ///
    /// # Errors
    /// `Error::Config` if `origin` is not an absolute http(s) URL.
    pub fn for_origin(origin: &str) -> Result<Self> {
        let origin = Url::parse(origin)
            .map_err(|e| Error::Config(format!("invalid origin '{}': {}", origin, e)))?;
        let config = WorkerConfig {
            origin,
            ..WorkerConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration document. Missing fields
    /// take their defaults.
    ///
    /// # Errors
    /// `Error::Config` for malformed JSON or a configuration that fails
    /// [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self> {
        let config: WorkerConfig = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid worker config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_static_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_assets = assets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_offline_page(mut self, path: Option<&str>) -> Self {
        self.offline_page = path.map(str::to_string);
        self
    }

    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = prefix.to_string();
        self
    }

    /// Turn off automatic skip-waiting; the generation then waits for an
    /// explicit `SKIP_WAITING` message.
    pub fn with_skip_waiting_on_install(mut self, skip: bool) -> Self {
        self.skip_waiting_on_install = skip;
        self
    }

    /// Check invariants.
    ///
    /// # Errors
    /// `Error::Config` describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() || self.version.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!(
                "version must be a non-empty tag without whitespace, got {:?}",
                self.version
            )));
        }
        if !matches!(self.origin.scheme(), "http" | "https") || self.origin.host().is_none() {
            return Err(Error::Config(format!(
                "origin must be an http(s) URL with a host, got {}",
                self.origin
            )));
        }
        for asset in &self.static_assets {
            if !is_site_path(asset) {
                return Err(Error::Config(format!(
                    "static asset must be an absolute path on the origin, got {:?}",
                    asset
                )));
            }
        }
        if let Some(page) = &self.offline_page {
            if !is_site_path(page) {
                return Err(Error::Config(format!(
                    "offline page must be an absolute path on the origin, got {:?}",
                    page
                )));
            }
        }
        if !self.api_prefix.starts_with('/') {
            return Err(Error::Config(format!(
                "api prefix must start with '/', got {:?}",
                self.api_prefix
            )));
        }
        Ok(())
    }

    /// Name of this generation's static store.
    pub fn static_cache_name(&self) -> String {
        format!("static-v{}", self.version)
    }

    /// Name of this generation's dynamic store.
    pub fn dynamic_cache_name(&self) -> String {
        format!("dynamic-v{}", self.version)
    }

    /// Resolve a site path against the origin.
    ///
    /// # Errors
    /// `Error::InvalidRequest` if `path` does not form a valid URL.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        Ok(self.origin.join(path)?)
    }
}

/// An absolute path that stays on the origin when resolved. `//host/x` and
/// `/\\host/x` are scheme-relative and would leave it.
fn is_site_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.version, BUILD_WORKER_VERSION);
        assert_eq!(
            config.static_assets,
            vec!["/", "/index.html", "/manifest.json", "/favicon.svg"]
        );
        assert_eq!(config.api_prefix, "/api/");
        assert!(config.skip_waiting_on_install);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_names_follow_version() {
        let config = WorkerConfig::default().with_version("2.1.0");
        assert_eq!(config.static_cache_name(), "static-v2.1.0");
        assert_eq!(config.dynamic_cache_name(), "dynamic-v2.1.0");
    }

    #[test]
    fn test_from_json_partial() {
        let config = WorkerConfig::from_json(
            r#"{"origin": "https://example.com", "offline_page": null}"#,
        )
        .unwrap();
        assert_eq!(config.origin.as_str(), "https://example.com/");
        assert_eq!(config.offline_page, None);
        assert_eq!(config.sync_tag, CONTACT_FORM_SYNC_TAG);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            WorkerConfig::from_json("{origin:"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_relative_asset() {
        let config = WorkerConfig::default().with_static_assets(["index.html"]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_scheme_relative_paths() {
        let config = WorkerConfig::default().with_static_assets(["/", "//cdn.other/x.js"]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = WorkerConfig::default().with_static_assets(["/\\cdn.other/x.js"]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = WorkerConfig::default();
        config.offline_page = Some("//cdn.other/offline.html".to_string());
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_build_version_comes_from_worker_version_file() {
        assert_eq!(BUILD_WORKER_VERSION, include_str!("../WORKER_VERSION").trim());
    }

    #[test]
    fn test_validate_rejects_blank_version() {
        let config = WorkerConfig::default().with_version(" ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_for_origin_rejects_non_http() {
        assert!(WorkerConfig::for_origin("ftp://example.com").is_err());
        assert!(WorkerConfig::for_origin("not a url").is_err());
    }

    #[test]
    fn test_resolve() {
        let config = WorkerConfig::for_origin("https://example.com").unwrap();
        assert_eq!(
            config.resolve("/offline.html").unwrap().as_str(),
            "https://example.com/offline.html"
        );
    }
}
