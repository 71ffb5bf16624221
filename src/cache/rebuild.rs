//! Rebuild coordination.
//!
//! Rebuild requests are fire-and-forget messages on an unbounded channel
//! with a single consumer, so at most one rebuild pass executes at a time
//! and every request runs to completion once its turn arrives. Requests are
//! never deduplicated; excess passes are idempotent snapshots of the
//! authoritative index.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::store::StoreError;

use super::builder::{IndexBuilder, IndexOutcome};
use super::store::BucketStore;

const METRIC_REBUILD_MS: &str = "tempora_rebuild_ms";
const METRIC_REBUILD_TOTAL: &str = "tempora_rebuild_total";
const METRIC_QUEUE_DEPTH: &str = "tempora_rebuild_queue_depth";

/// Why a rebuild was requested; carried for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    Startup,
    Invalidation,
}

#[derive(Debug)]
struct RebuildRequest {
    id: Uuid,
    reason: RebuildReason,
    requested_at: OffsetDateTime,
}

impl RebuildRequest {
    fn new(reason: RebuildReason) -> Self {
        Self {
            id: Uuid::new_v4(),
            reason,
            requested_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug)]
enum PassOutcome {
    NoIndex,
    Rebuilt { buckets: usize, removed: usize },
}

/// Enqueues rebuild requests for the single worker.
///
/// Cheap to clone; every handle feeds the same queue.
#[derive(Clone)]
pub struct RebuildCoordinator {
    tx: mpsc::UnboundedSender<RebuildRequest>,
    completed: Arc<AtomicU64>,
}

impl RebuildCoordinator {
    /// Create the coordinator and its worker. The worker must be driven via
    /// [`RebuildWorker::run`] (after an optional [`RebuildWorker::prime`])
    /// for requests to make progress.
    pub fn new(builder: IndexBuilder, cache: Arc<BucketStore>) -> (Self, RebuildWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let completed = Arc::new(AtomicU64::new(0));
        let coordinator = Self {
            tx,
            completed: Arc::clone(&completed),
        };
        let worker = RebuildWorker {
            rx,
            builder,
            cache,
            completed,
        };
        (coordinator, worker)
    }

    /// Request a rebuild. Never blocks; returns immediately after enqueue.
    pub fn request_rebuild(&self, reason: RebuildReason) {
        let request = RebuildRequest::new(reason);
        info!(
            request_id = %request.id,
            reason = ?request.reason,
            "Rebuild requested"
        );
        if self.tx.send(request).is_err() {
            warn!("Rebuild request dropped: worker has stopped");
        }
    }

    /// Number of rebuild passes the worker has finished (any outcome).
    pub fn passes_completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }
}

/// Single consumer of the rebuild queue.
pub struct RebuildWorker {
    rx: mpsc::UnboundedReceiver<RebuildRequest>,
    builder: IndexBuilder,
    cache: Arc<BucketStore>,
    completed: Arc<AtomicU64>,
}

impl RebuildWorker {
    /// Run the priming rebuild inline, before the queue loop starts.
    ///
    /// A store failure here propagates to the caller: a process that can
    /// never populate its cache should not come up. An absent index is a
    /// successful no-op.
    pub async fn prime(&self) -> Result<(), StoreError> {
        let request = RebuildRequest::new(RebuildReason::Startup);
        self.execute(&request).await
    }

    /// Process queued rebuild requests until every coordinator handle is
    /// dropped. Failures are contained and logged; the loop never exits on
    /// a failed pass.
    pub async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            gauge!(METRIC_QUEUE_DEPTH).set(self.rx.len() as f64);
            let _ = self.execute(&request).await;
        }
    }

    async fn execute(&self, request: &RebuildRequest) -> Result<(), StoreError> {
        let started_at = Instant::now();
        let queued_ms =
            (OffsetDateTime::now_utc() - request.requested_at).whole_milliseconds() as i64;
        info!(
            request_id = %request.id,
            reason = ?request.reason,
            queued_ms,
            "Rebuild starting"
        );

        let result = self.rebuild_pass().await;
        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        self.completed.fetch_add(1, Ordering::AcqRel);

        match result {
            Ok(PassOutcome::NoIndex) => {
                info!(
                    request_id = %request.id,
                    "Rebuild skipped: authoritative index not present"
                );
                counter!(METRIC_REBUILD_TOTAL, "result" => "no_index").increment(1);
                histogram!(METRIC_REBUILD_MS).record(elapsed_ms);
                Ok(())
            }
            Ok(PassOutcome::Rebuilt { buckets, removed }) => {
                info!(
                    request_id = %request.id,
                    buckets,
                    removed,
                    "Rebuild complete"
                );
                counter!(METRIC_REBUILD_TOTAL, "result" => "ok").increment(1);
                histogram!(METRIC_REBUILD_MS).record(elapsed_ms);
                Ok(())
            }
            Err(err) => {
                // Cache stays at the last known-good state; the next trigger
                // or a restart is the retry.
                error!(
                    request_id = %request.id,
                    error = %err,
                    "Rebuild failed; cache left untouched"
                );
                counter!(METRIC_REBUILD_TOTAL, "result" => "error").increment(1);
                histogram!(METRIC_REBUILD_MS).record(elapsed_ms);
                Err(err)
            }
        }
    }

    /// One rebuild pass: fetch, regroup, write new buckets, drop stale
    /// buckets, publish the new key snapshot last.
    async fn rebuild_pass(&self) -> Result<PassOutcome, StoreError> {
        let buckets = match self.builder.build().await? {
            IndexOutcome::NoIndex => return Ok(PassOutcome::NoIndex),
            IndexOutcome::Built(buckets) => buckets,
        };

        let previous = self.cache.known_keys();
        let next_keys: HashSet<String> = buckets.keys().cloned().collect();
        let bucket_count = buckets.len();

        for (key, hashes) in buckets {
            self.cache.insert_bucket(key, hashes);
        }

        let mut removed = 0usize;
        for stale in previous.iter().filter(|key| !next_keys.contains(*key)) {
            self.cache.remove_bucket(stale);
            removed += 1;
        }

        // Snapshot publish is the final step: a reader observing the new
        // snapshot has already had every corresponding bucket write land.
        self.cache.publish_known_keys(next_keys);

        Ok(PassOutcome::Rebuilt {
            buckets: bucket_count,
            removed,
        })
    }
}
