//! Error types for the offline worker.

use std::fmt;

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the offline worker.
///
/// Network failures seen while serving a request are recovered inside the
/// matched strategy and never surface through this type. What does surface:
#[derive(Debug, Clone)]
pub enum Error {
    /// The network call itself failed (offline, DNS, connection reset).
    ///
    /// A response with a non-2xx status is *not* a network error; fetchers
    /// return it as `Ok`.
    Network(String),

    /// A cache store operation failed.
    ///
    /// Common causes:
    /// - Redis connection lost or pool exhausted
    /// - Backend protocol error
    ///
    /// **Recovery:** none inside the worker. The error propagates to the host
    /// and is logged for diagnostics.
    Store(String),

    /// Installing a worker generation failed because a static asset could not
    /// be fetched. Nothing from the attempt is left cached and the generation
    /// must be discarded.
    InstallFailed {
        /// Asset URL that failed
        url: String,
        /// Why it failed (network error or non-2xx status)
        reason: String,
    },

    /// Encoding a response snapshot for storage failed.
    Serialization(String),

    /// Decoding bytes failed (stored snapshot, JSON message, push payload).
    Deserialization(String),

    /// Stored entry has a bad envelope: wrong magic or unreadable header.
    ///
    /// **Recovery:** the strategy evicts the entry and treats it as a miss.
    InvalidCacheEntry(String),

    /// Stored entry was written with a different snapshot format version.
    ///
    /// **Recovery:** evicted and refetched on next access.
    VersionMismatch {
        /// Expected format version (from compiled code)
        expected: u32,
        /// Found format version (from stored entry)
        found: u32,
    },

    /// Request could not be built (bad URL, unsupported scheme).
    InvalidRequest(String),

    /// Lifecycle transition not allowed from the current state.
    InvalidState {
        /// State the worker was in
        from: String,
        /// State that was requested
        to: String,
    },

    /// Invalid worker configuration.
    Config(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Network(msg) => write!(f, "Network error: {}", msg),
            Error::Store(msg) => write!(f, "Store error: {}", msg),
            Error::InstallFailed { url, reason } => {
                write!(f, "Install failed: {} ({})", url, reason)
            }
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Deserialization(msg) => write!(f, "Deserialization error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Snapshot version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Error::InvalidState { from, to } => {
                write!(f, "Invalid lifecycle transition: {} -> {}", from, to)
            }
            Error::Config(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Whether the error leaves a stored entry unusable (evict and refetch).
    pub fn is_corrupt_entry(&self) -> bool {
        matches!(
            self,
            Error::InvalidCacheEntry(_) | Error::VersionMismatch { .. } | Error::Deserialization(_)
        )
    }
}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::Other(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Serialization(e.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidRequest(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Store(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::Store(format!("Redis error: {}", e))
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InstallFailed {
            url: "/manifest.json".to_string(),
            reason: "status 404".to_string(),
        };
        assert_eq!(err.to_string(), "Install failed: /manifest.json (status 404)");
    }

    #[test]
    fn test_error_from_string() {
        let err: Error = "test error".into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_json_syntax_error_is_deserialization() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn test_corrupt_entry_classification() {
        assert!(Error::VersionMismatch {
            expected: 1,
            found: 2
        }
        .is_corrupt_entry());
        assert!(!Error::Store("down".to_string()).is_corrupt_entry());
    }
}
