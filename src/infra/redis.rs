//! Redis adapters for the quote store and invalidation boundaries.
//!
//! Keeps every Redis specific behind the application-layer traits: a
//! multiplexed connection for typed JSON reads and a dedicated pub/sub
//! connection for the invalidation channel. Reconnection is left to the
//! connection manager; this layer adds no retry of its own.

use async_trait::async_trait;
use futures::StreamExt;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use serde::de::DeserializeOwned;

use crate::application::store::{
    InvalidationSource, InvalidationStream, QuoteStore, StoreError,
};
use crate::cache::keys::{index_key, quote_key};
use crate::domain::entities::{Quote, QuoteIndexEntry};

/// Typed read access backed by a multiplexed Redis connection.
///
/// Cloning shares the underlying connection.
#[derive(Clone)]
pub struct RedisQuoteStore {
    connection: ConnectionManager,
}

impl RedisQuoteStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|err| StoreError::transport(err.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|err| StoreError::transport(err.to_string()))?;
        Ok(Self { connection })
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut connection = self.connection.clone();
        let payload: Option<String> = connection
            .get(key)
            .await
            .map_err(|err| StoreError::transport(err.to_string()))?;

        match payload {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|err| StoreError::deserialize(key, err.to_string())),
        }
    }
}

#[async_trait]
impl QuoteStore for RedisQuoteStore {
    async fn get_index(&self) -> Result<Option<Vec<QuoteIndexEntry>>, StoreError> {
        self.get_json(&index_key()).await
    }

    async fn get_quote(&self, hash: &str) -> Result<Option<Quote>, StoreError> {
        self.get_json(&quote_key(hash)).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|err| StoreError::transport(err.to_string()))?;
        Ok(())
    }
}

/// Acquires pub/sub subscriptions on a dedicated Redis connection.
pub struct RedisInvalidationSource {
    client: Client,
}

impl RedisInvalidationSource {
    pub fn new(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|err| StoreError::transport(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl InvalidationSource for RedisInvalidationSource {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn InvalidationStream>, StoreError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|err| StoreError::subscribe(channel, err.to_string()))?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|err| StoreError::subscribe(channel, err.to_string()))?;

        Ok(Box::new(RedisInvalidationStream {
            pubsub,
            channel: channel.to_string(),
        }))
    }
}

struct RedisInvalidationStream {
    pubsub: redis::aio::PubSub,
    channel: String,
}

#[async_trait]
impl InvalidationStream for RedisInvalidationStream {
    async fn next_message(&mut self) -> Option<String> {
        loop {
            let message = self.pubsub.on_message().next().await?;
            match message.get_payload::<String>() {
                Ok(payload) => return Some(payload),
                // Binary payloads on the channel are not ours to interpret.
                Err(_) => continue,
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<(), StoreError> {
        self.pubsub
            .unsubscribe(&self.channel)
            .await
            .map_err(|err| StoreError::subscribe(self.channel.as_str(), err.to_string()))
    }
}
