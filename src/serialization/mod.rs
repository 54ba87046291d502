//! Postcard-encoded response snapshots with versioned envelopes.
//!
//! Named cache stores only hold bytes. Every stored response goes through
//! this module on the way in and out.
//!
//! # Format
//!
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│ VERSION (varint)│POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "OFKW"              u32                postcard::to_allocvec(T)
//! ```
//!
//! An entry that fails validation is never served. The strategies evict it
//! and treat the lookup as a miss.
//!
//! # Example
//!
//! ```rust
//! use offline_kit::response::Response;
//! use offline_kit::serialization::{decode_snapshot, encode_snapshot};
//!
//! # fn main() -> offline_kit::Result<()> {
//! let response = Response::ok("<html></html>").with_header("content-type", "text/html");
//!
//! let bytes = encode_snapshot(&response)?;
//! assert_eq!(&bytes[0..4], b"OFKW");
//!
//! let restored: Response = decode_snapshot(&bytes)?;
//! assert_eq!(restored, response);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Magic header for stored snapshots: b"OFKW"
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"OFKW";

/// Current snapshot format version.
///
/// Bump when the shape of [`crate::response::Response`] changes. Entries
/// written under another version are evicted on read.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Versioned envelope around a stored value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SnapshotEnvelope<T> {
    /// Must be b"OFKW"
    pub magic: [u8; 4],
    /// Must match SNAPSHOT_FORMAT_VERSION
    pub version: u32,
    pub payload: T,
}

impl<T> SnapshotEnvelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_FORMAT_VERSION,
            payload,
        }
    }
}

/// Encode a value for storage.
///
/// # Errors
///
/// Returns `Error::Serialization` if Postcard serialization fails.
pub fn encode_snapshot<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let envelope = SnapshotEnvelope::new(value);
    postcard::to_allocvec(&envelope).map_err(|e| {
        error!("Snapshot encoding failed: {}", e);
        Error::Serialization(e.to_string())
    })
}

/// Decode a stored value, validating magic and version first.
///
/// # Errors
///
/// - `Error::InvalidCacheEntry`: wrong magic header
/// - `Error::VersionMismatch`: written by another format version
/// - `Error::Deserialization`: truncated or corrupted payload
pub fn decode_snapshot<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    // Check the header before touching the payload, so foreign bytes report
    // as InvalidCacheEntry rather than a generic decode failure.
    let (magic, rest): ([u8; 4], &[u8]) = postcard::take_from_bytes(bytes).map_err(|e| {
        Error::InvalidCacheEntry(format!("unreadable snapshot header: {}", e))
    })?;
    if magic != SNAPSHOT_MAGIC {
        warn!(
            "Invalid snapshot: expected magic {:?}, got {:?}",
            SNAPSHOT_MAGIC, magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            SNAPSHOT_MAGIC, magic
        )));
    }

    let (version, payload): (u32, &[u8]) = postcard::take_from_bytes(rest).map_err(|e| {
        Error::InvalidCacheEntry(format!("unreadable snapshot version: {}", e))
    })?;
    if version != SNAPSHOT_FORMAT_VERSION {
        warn!(
            "Snapshot version mismatch: expected {}, got {}",
            SNAPSHOT_FORMAT_VERSION, version
        );
        return Err(Error::VersionMismatch {
            expected: SNAPSHOT_FORMAT_VERSION,
            found: version,
        });
    }

    postcard::from_bytes(payload).map_err(|e| {
        error!("Snapshot decoding failed: {}", e);
        Error::Deserialization(e.to_string())
    })
}
