//! Invalidation subscriber.
//!
//! Listens on the fixed pub/sub channel for the lifetime of the process and
//! turns each trigger payload into one rebuild request. Delivery order and
//! duplicate triggers are irrelevant: every trigger enqueues one idempotent
//! rebuild. All other payloads are ignored.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::store::{InvalidationSource, InvalidationStream, StoreError};

use super::keys::{INVALIDATION_CHANNEL, REBUILD_TRIGGER};
use super::rebuild::{RebuildCoordinator, RebuildReason};

/// Running subscription handle. Dropping it does not stop the listener;
/// call [`InvalidationSubscriber::shutdown`] to release the subscription.
pub struct InvalidationSubscriber {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl InvalidationSubscriber {
    /// Subscribe to the invalidation channel and spawn the listen loop.
    ///
    /// Subscription failure propagates: a process that cannot hear
    /// invalidations would serve a silently stale cache forever.
    pub async fn start(
        source: Arc<dyn InvalidationSource>,
        coordinator: RebuildCoordinator,
    ) -> Result<Self, StoreError> {
        let stream = source.subscribe(INVALIDATION_CHANNEL).await?;
        info!(channel = INVALIDATION_CHANNEL, "Subscribed to invalidation channel");

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(listen(stream, coordinator, shutdown_rx));

        Ok(Self { handle, shutdown })
    }

    /// Stop the listen loop and release the subscription.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            warn!(error = %err, "Invalidation listener did not shut down cleanly");
        }
    }
}

async fn listen(
    mut stream: Box<dyn InvalidationStream>,
    coordinator: RebuildCoordinator,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            message = stream.next_message() => match message {
                Some(payload) => {
                    info!(payload = %payload, "Received message");
                    if payload == REBUILD_TRIGGER {
                        coordinator.request_rebuild(RebuildReason::Invalidation);
                    } else {
                        debug!(payload = %payload, "Ignoring non-trigger payload");
                    }
                }
                None => {
                    // Stale cache persists until the transport reconnects or
                    // the process restarts.
                    warn!(
                        channel = INVALIDATION_CHANNEL,
                        "Invalidation stream ended; cache freshness is no longer guaranteed"
                    );
                    break;
                }
            },
        }
    }

    if let Err(err) = stream.unsubscribe().await {
        warn!(error = %err, "Failed to release invalidation subscription");
    } else {
        info!(channel = INVALIDATION_CHANNEL, "Unsubscribed from invalidation channel");
    }
}
