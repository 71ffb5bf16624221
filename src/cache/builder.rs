//! Index builder: authoritative index → per-bucket hash lists.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::store::{QuoteStore, StoreError};

/// Result of one build pass over the authoritative index.
#[derive(Debug)]
pub enum IndexOutcome {
    /// The index marker key does not exist yet; upstream ingestion has not
    /// populated data. Not an error.
    NoIndex,
    /// Freshly grouped buckets. Iteration order is unspecified.
    Built(HashMap<String, Vec<String>>),
}

/// Fetches the authoritative index and groups its entries by time bucket.
/// No side effects; deserialization failures surface to the caller.
pub struct IndexBuilder {
    store: Arc<dyn QuoteStore>,
}

impl IndexBuilder {
    pub fn new(store: Arc<dyn QuoteStore>) -> Self {
        Self { store }
    }

    pub async fn build(&self) -> Result<IndexOutcome, StoreError> {
        let Some(entries) = self.store.get_index().await? else {
            return Ok(IndexOutcome::NoIndex);
        };

        let mut buckets: HashMap<String, Vec<String>> = HashMap::new();
        for entry in entries {
            buckets.entry(entry.time).or_default().push(entry.hash);
        }

        Ok(IndexOutcome::Built(buckets))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::domain::entities::{Quote, QuoteIndexEntry};

    use super::*;

    struct IndexStore {
        index: Option<Vec<QuoteIndexEntry>>,
        fail: bool,
    }

    #[async_trait]
    impl QuoteStore for IndexStore {
        async fn get_index(&self) -> Result<Option<Vec<QuoteIndexEntry>>, StoreError> {
            if self.fail {
                return Err(StoreError::transport("store unreachable"));
            }
            Ok(self.index.clone())
        }

        async fn get_quote(&self, _hash: &str) -> Result<Option<Quote>, StoreError> {
            Ok(None)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn entry(time: &str, hash: &str) -> QuoteIndexEntry {
        QuoteIndexEntry {
            time: time.to_string(),
            hash: hash.to_string(),
        }
    }

    #[tokio::test]
    async fn absent_index_is_not_an_error() {
        let builder = IndexBuilder::new(Arc::new(IndexStore {
            index: None,
            fail: false,
        }));

        assert!(matches!(
            builder.build().await.expect("build succeeds"),
            IndexOutcome::NoIndex
        ));
    }

    #[tokio::test]
    async fn groups_entries_by_time() {
        let builder = IndexBuilder::new(Arc::new(IndexStore {
            index: Some(vec![
                entry("08:30", "a1"),
                entry("09:15", "b1"),
                entry("08:30", "a2"),
            ]),
            fail: false,
        }));

        let IndexOutcome::Built(buckets) = builder.build().await.expect("build succeeds") else {
            panic!("expected built index");
        };

        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets["08:30"],
            vec!["a1".to_string(), "a2".to_string()]
        );
        assert_eq!(buckets["09:15"], vec!["b1".to_string()]);
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let builder = IndexBuilder::new(Arc::new(IndexStore {
            index: None,
            fail: true,
        }));

        assert!(builder.build().await.is_err());
    }
}
