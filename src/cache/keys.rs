//! Reserved store keys and pub/sub constants.
//!
//! The key prefix namespaces everything this service reads in the
//! distributed store; per-bucket keys in the local cache are the raw
//! "HH:MM" strings and must not collide with the marker key.

/// Namespace prefix for every distributed-store key this service reads.
pub const KEY_PREFIX: &str = "LIT_V3";

/// Marker suffix under which the authoritative index is stored.
pub const INDEX_MARKER: &str = "INDEX";

/// Pub/sub channel carrying invalidation notifications.
pub const INVALIDATION_CHANNEL: &str = "literature";

/// The one payload that triggers a rebuild; all other payloads are ignored.
pub const REBUILD_TRIGGER: &str = "index";

/// Store key of the authoritative index: `LIT_V3:INDEX`.
pub fn index_key() -> String {
    format!("{KEY_PREFIX}:{INDEX_MARKER}")
}

/// Store key of a quote record by content hash: `LIT_V3:<hash>`.
pub fn quote_key(hash: &str) -> String {
    format!("{KEY_PREFIX}:{hash}")
}
