//! Tempora bucket cache.
//!
//! Holds the derived time-bucket → hash-list index served by lookups and
//! keeps it fresh through a pub/sub-driven rebuild pipeline:
//!
//! - [`BucketStore`] owns the in-process index and its known-keys snapshot
//! - [`IndexBuilder`] recomputes buckets from the authoritative store
//! - [`RebuildCoordinator`] serializes rebuild requests onto one worker
//! - [`InvalidationSubscriber`] turns trigger messages into rebuild requests
//!
//! Readers resolve buckets straight from the sharded map and are never
//! blocked by an in-flight rebuild; the snapshot is published only after all
//! bucket writes and stale removals, so an observed snapshot key always has
//! its hash list in place.

mod builder;
pub mod keys;
mod lock;
mod rebuild;
mod store;
mod subscriber;

pub use builder::{IndexBuilder, IndexOutcome};
pub use rebuild::{RebuildCoordinator, RebuildReason, RebuildWorker};
pub use store::BucketStore;
pub use subscriber::InvalidationSubscriber;
