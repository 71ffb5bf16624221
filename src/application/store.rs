//! Boundary traits for the distributed quote store and its pub/sub channel.
//!
//! Implementations live in `infra`; the application layer only sees these
//! contracts, which keeps the cache pipeline testable with in-memory doubles.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{Quote, QuoteIndexEntry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(String),
    #[error("malformed payload under `{key}`: {message}")]
    Deserialize { key: String, message: String },
    #[error("subscription to `{channel}` failed: {message}")]
    Subscribe { channel: String, message: String },
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn deserialize(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Deserialize {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn subscribe(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subscribe {
            channel: channel.into(),
            message: message.into(),
        }
    }
}

/// Typed read access to the distributed quote store.
///
/// Absent keys are `Ok(None)`; a payload that exists but cannot be decoded
/// is a hard error, never silently treated as absent.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Fetch the full authoritative index under the reserved marker key.
    async fn get_index(&self) -> Result<Option<Vec<QuoteIndexEntry>>, StoreError>;

    /// Resolve one quote record by content hash.
    async fn get_quote(&self, hash: &str) -> Result<Option<Quote>, StoreError>;

    /// Round-trip liveness probe for the health surface.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// A live subscription delivering invalidation payloads in arrival order.
#[async_trait]
pub trait InvalidationStream: Send {
    /// Receive the next message payload; `None` when the stream has ended.
    async fn next_message(&mut self) -> Option<String>;

    /// Release the subscription handle.
    async fn unsubscribe(&mut self) -> Result<(), StoreError>;
}

/// Entry point for acquiring an invalidation subscription at startup.
#[async_trait]
pub trait InvalidationSource: Send + Sync {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn InvalidationStream>, StoreError>;
}
