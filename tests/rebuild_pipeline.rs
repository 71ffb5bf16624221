//! Rebuild pipeline properties over an in-memory store double:
//! idempotence, torn-read freedom, stale-bucket removal, single-worker
//! serialization, and the end-to-end lookup path.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tempora::application::quotes::QuoteService;
use tempora::application::store::{QuoteStore, StoreError};
use tempora::cache::{BucketStore, IndexBuilder, RebuildCoordinator, RebuildReason, RebuildWorker};
use tempora::domain::entities::{Quote, QuoteIndexEntry};
use tempora::domain::time_bucket::TimeBucket;

struct MemoryStore {
    index: Mutex<Option<Vec<QuoteIndexEntry>>>,
    quotes: Mutex<Vec<Quote>>,
    in_pass: AtomicBool,
    overlaps: AtomicUsize,
    index_reads: AtomicUsize,
}

impl MemoryStore {
    fn new(index: Option<Vec<QuoteIndexEntry>>) -> Arc<Self> {
        Arc::new(Self {
            index: Mutex::new(index),
            quotes: Mutex::new(Vec::new()),
            in_pass: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
            index_reads: AtomicUsize::new(0),
        })
    }

    fn set_index(&self, index: Option<Vec<QuoteIndexEntry>>) {
        *self.index.lock().expect("index lock") = index;
    }

    fn add_quote(&self, quote: Quote) {
        self.quotes.lock().expect("quotes lock").push(quote);
    }
}

#[async_trait]
impl QuoteStore for MemoryStore {
    async fn get_index(&self) -> Result<Option<Vec<QuoteIndexEntry>>, StoreError> {
        if self.in_pass.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        // Hold the write window open long enough for overlap to be visible.
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.in_pass.store(false, Ordering::SeqCst);
        self.index_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.index.lock().expect("index lock").clone())
    }

    async fn get_quote(&self, hash: &str) -> Result<Option<Quote>, StoreError> {
        Ok(self
            .quotes
            .lock()
            .expect("quotes lock")
            .iter()
            .find(|q| q.hash == hash)
            .cloned())
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

fn quote(time: &str, hash: &str) -> Quote {
    Quote {
        time: time.to_string(),
        quote_first: "It was nearly ".to_string(),
        quote_time: time.to_string(),
        quote_last: " when the bell rang.".to_string(),
        title: "A Test of Time".to_string(),
        author: "Nobody".to_string(),
        hash: hash.to_string(),
    }
}

fn pipeline(store: Arc<MemoryStore>) -> (Arc<BucketStore>, RebuildCoordinator, RebuildWorker) {
    let cache = Arc::new(BucketStore::new());
    let builder = IndexBuilder::new(store as Arc<dyn QuoteStore>);
    let (coordinator, worker) = RebuildCoordinator::new(builder, cache.clone());
    (cache, coordinator, worker)
}

fn observed_state(cache: &BucketStore) -> Vec<(String, Vec<String>)> {
    let mut state: Vec<(String, Vec<String>)> = cache
        .known_keys()
        .iter()
        .map(|key| {
            let hashes = cache
                .hashes(key)
                .map(|list| list.as_slice().to_vec())
                .unwrap_or_default();
            (key.clone(), hashes)
        })
        .collect();
    state.sort();
    state
}

#[tokio::test]
async fn rebuild_is_idempotent() {
    let store = MemoryStore::new(Some(vec![
        entry("08:30", "a1"),
        entry("08:30", "a2"),
        entry("09:15", "b1"),
    ]));
    let (cache, _coordinator, worker) = pipeline(store);

    worker.prime().await.expect("first rebuild");
    let first = observed_state(&cache);

    worker.prime().await.expect("second rebuild");
    let second = observed_state(&cache);

    assert_eq!(first, second);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn stale_bucket_is_removed_on_rebuild() {
    let store = MemoryStore::new(Some(vec![entry("09:00", "x1"), entry("12:00", "y1")]));
    store.add_quote(quote("09:00", "x1"));
    let (cache, _coordinator, worker) = pipeline(store.clone());
    let service = QuoteService::new(cache.clone(), store.clone() as Arc<dyn QuoteStore>);

    worker.prime().await.expect("first rebuild");
    let bucket = TimeBucket::from_parts(9, 0).expect("valid bucket");
    assert!(
        service
            .random_quote(&bucket)
            .await
            .expect("lookup succeeds")
            .is_some()
    );

    store.set_index(Some(vec![entry("12:00", "y1")]));
    worker.prime().await.expect("second rebuild");

    assert!(
        service
            .random_quote(&bucket)
            .await
            .expect("lookup succeeds")
            .is_none()
    );
    assert!(!cache.known_keys().contains("09:00"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_a_torn_rebuild() {
    // Version A: 08:30 -> [a1], 09:00 -> [a9]. Version B replaces 08:30,
    // drops 09:00, and adds the marker bucket 10:00. Once a reader sees the
    // post-rebuild snapshot (contains "10:00"), every other observation must
    // already be post-rebuild state: the snapshot is published last.
    let store = MemoryStore::new(Some(vec![entry("08:30", "a1"), entry("09:00", "a9")]));
    let (cache, _coordinator, worker) = pipeline(store.clone());
    worker.prime().await.expect("initial rebuild");

    store.set_index(Some(vec![entry("08:30", "b1"), entry("10:00", "b2")]));

    let mut readers = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..500 {
                let hashes = cache.hashes("08:30").expect("bucket present in both versions");
                assert!(
                    hashes.as_slice() == ["a1".to_string()]
                        || hashes.as_slice() == ["b1".to_string()],
                    "bucket list must be exactly one version, got {hashes:?}"
                );

                let snapshot = cache.known_keys();
                if snapshot.contains("10:00") {
                    let hashes = cache.hashes("08:30").expect("bucket present");
                    assert_eq!(hashes.as_slice(), ["b1".to_string()]);
                    assert!(cache.hashes("10:00").is_some());
                    assert!(cache.hashes("09:00").is_none());
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    worker.prime().await.expect("concurrent rebuild");

    for reader in readers {
        reader.await.expect("reader saw consistent state");
    }

    assert!(cache.known_keys().contains("10:00"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_serialize_onto_one_worker() {
    let store = MemoryStore::new(Some(vec![entry("08:30", "a1")]));
    let (_cache, coordinator, worker) = pipeline(store.clone());
    let worker_handle = tokio::spawn(worker.run());

    let mut requesters = Vec::new();
    for _ in 0..50 {
        let coordinator = coordinator.clone();
        requesters.push(tokio::spawn(async move {
            coordinator.request_rebuild(RebuildReason::Invalidation);
        }));
    }
    for requester in requesters {
        requester.await.expect("request task");
    }

    // Every request runs exactly one pass, so the 50th completion is a full
    // pass that started after the last request was enqueued.
    while coordinator.passes_completed() < 50 {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert_eq!(store.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(store.index_reads.load(Ordering::SeqCst), 50);

    drop(coordinator);
    worker_handle.await.expect("worker exits");
}

#[tokio::test]
async fn absent_index_keeps_previous_cache() {
    let store = MemoryStore::new(Some(vec![entry("08:30", "a1")]));
    let (cache, _coordinator, worker) = pipeline(store.clone());

    worker.prime().await.expect("first rebuild");
    store.set_index(None);
    worker.prime().await.expect("absent index is a no-op");

    let hashes = cache.hashes("08:30").expect("previous state retained");
    assert_eq!(hashes.as_slice(), ["a1".to_string()]);
    assert_eq!(
        cache.known_keys().as_ref(),
        &HashSet::from(["08:30".to_string()])
    );
}

#[tokio::test]
async fn end_to_end_lookup_after_rebuild() {
    let store = MemoryStore::new(Some(vec![
        entry("08:30", "a1"),
        entry("08:30", "a2"),
        entry("09:15", "b1"),
    ]));
    store.add_quote(quote("08:30", "a1"));
    store.add_quote(quote("08:30", "a2"));
    store.add_quote(quote("09:15", "b1"));

    let (cache, _coordinator, worker) = pipeline(store.clone());
    worker.prime().await.expect("rebuild");

    let service = QuoteService::new(cache, store as Arc<dyn QuoteStore>);

    let bucket = TimeBucket::from_parts(8, 30).expect("valid bucket");
    let found = service
        .random_quote(&bucket)
        .await
        .expect("lookup succeeds")
        .expect("bucket has quotes");
    assert!(["a1", "a2"].contains(&found.hash.as_str()));

    let empty = TimeBucket::from_parts(9, 16).expect("valid bucket");
    assert!(
        service
            .random_quote(&empty)
            .await
            .expect("lookup succeeds")
            .is_none()
    );
}
