//! Quote lookup service.
//!
//! A pure reader over the bucket cache: picks one hash at random for the
//! requested time bucket and resolves the full record from the store. Never
//! mutates cache state and never triggers a rebuild.

use std::sync::Arc;

use metrics::counter;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::cache::BucketStore;
use crate::domain::entities::Quote;
use crate::domain::time_bucket::TimeBucket;

use super::store::{QuoteStore, StoreError};

const METRIC_LOOKUP_HIT: &str = "tempora_lookup_hit_total";
const METRIC_LOOKUP_MISS: &str = "tempora_lookup_miss_total";

pub struct QuoteService {
    cache: Arc<BucketStore>,
    store: Arc<dyn QuoteStore>,
}

impl QuoteService {
    pub fn new(cache: Arc<BucketStore>, store: Arc<dyn QuoteStore>) -> Self {
        Self { cache, store }
    }

    /// Serve one quote for the given bucket, or `None` when the bucket is
    /// unknown, empty, or its chosen hash no longer resolves in the store.
    pub async fn random_quote(&self, bucket: &TimeBucket) -> Result<Option<Quote>, StoreError> {
        let Some(hashes) = self.cache.hashes(bucket.as_str()) else {
            counter!(METRIC_LOOKUP_MISS).increment(1);
            debug!(bucket = %bucket, "No cached bucket for lookup");
            return Ok(None);
        };

        let Some(hash) = hashes.choose(&mut rand::thread_rng()) else {
            counter!(METRIC_LOOKUP_MISS).increment(1);
            return Ok(None);
        };

        let quote = self.store.get_quote(hash).await?;
        if quote.is_none() {
            // The index referenced a hash the store no longer holds; the next
            // rebuild reconciles the bucket.
            warn!(bucket = %bucket, hash, "Indexed quote missing from store");
            counter!(METRIC_LOOKUP_MISS).increment(1);
            return Ok(None);
        }

        counter!(METRIC_LOOKUP_HIT).increment(1);
        Ok(quote)
    }
}
