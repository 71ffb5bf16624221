//! Persistent records served by the quote store.

use serde::{Deserialize, Serialize};

/// One row of the authoritative index: a time bucket and the content hash of
/// a quote shown at that time. Many entries share the same `time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteIndexEntry {
    pub time: String,
    pub hash: String,
}

/// A full literary quote record, resolved by content hash.
///
/// The quote text is split into the part before the time reference, the time
/// reference itself, and the part after it, so clients can highlight the
/// reference when rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub time: String,
    pub quote_first: String,
    pub quote_time: String,
    pub quote_last: String,
    pub title: String,
    pub author: String,
    pub hash: String,
}
