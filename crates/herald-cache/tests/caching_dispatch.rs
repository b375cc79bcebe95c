//! End-to-end dispatch through the result cache on a multi-threaded runtime.

use async_trait::async_trait;
use herald_cache::{CacheConfig, CachingDispatcher, MemoryResultCache, ResultCache, StrictCachingDispatcher};
use herald_core::{
    CancellationToken, Command, Dispatcher, Handler, HandlerRegistry, HeraldError, HeraldResult,
    Idempotent, Request,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
struct Spin {
    player_id: u64,
    message_id: u64,
}

impl Request for Spin {
    type Response = u32;

    fn cache_tags(&self) -> Vec<String> {
        vec![format!("player:{}", self.player_id)]
    }
}

impl Command for Spin {}

impl Idempotent for Spin {
    fn idempotency_key(&self) -> String {
        format!("spin:{}:{}", self.player_id, self.message_id)
    }
}

struct SpinHandler {
    invocations: Arc<AtomicU32>,
}

#[async_trait]
impl Handler<Spin> for SpinHandler {
    async fn handle(&self, request: Spin, cancel: &CancellationToken) -> HeraldResult<u32> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            () = cancel.cancelled() => Err(HeraldError::Cancelled),
            () = tokio::time::sleep(Duration::from_millis(50)) => {
                Ok(u32::try_from(request.message_id * 10).unwrap_or(u32::MAX))
            }
        }
    }
}

fn setup() -> (StrictCachingDispatcher, Arc<MemoryResultCache>, Arc<AtomicU32>) {
    let (dispatcher, cache, invocations) = parts();
    let strict = StrictCachingDispatcher::new(dispatcher, cache.clone());
    (strict, cache, invocations)
}

fn parts() -> (Dispatcher, Arc<MemoryResultCache>, Arc<AtomicU32>) {
    let invocations = Arc::new(AtomicU32::new(0));
    let mut registry = HandlerRegistry::new();
    registry
        .register::<Spin, _>(SpinHandler {
            invocations: Arc::clone(&invocations),
        })
        .unwrap();

    let cache = Arc::new(MemoryResultCache::new(
        CacheConfig::default().default_ttl(Duration::from_secs(60)),
    ));
    (Dispatcher::new(Arc::new(registry)), cache, invocations)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replays_invoke_handler_once() {
    let (strict, cache, invocations) = setup();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let strict = strict.clone();
            tokio::spawn(async move {
                strict
                    .send(Spin { player_id: 42, message_id: 1 }, &CancellationToken::new())
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 10);
    }

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().entries, 1);
    assert_eq!(cache.stats().in_flight, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_keys_compute_independently() {
    let (strict, _cache, invocations) = setup();

    let tasks: Vec<_> = (1..=8)
        .map(|message_id| {
            let strict = strict.clone();
            tokio::spawn(async move {
                strict
                    .send(Spin { player_id: 42, message_id }, &CancellationToken::new())
                    .await
            })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap().unwrap());
    }

    assert_eq!(results, vec![10, 20, 30, 40, 50, 60, 70, 80]);
    assert_eq!(invocations.load(Ordering::SeqCst), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn player_tag_invalidation_reaches_handler_again() {
    let (strict, cache, invocations) = setup();
    let cancel = CancellationToken::new();

    strict.send(Spin { player_id: 42, message_id: 1 }, &cancel).await.unwrap();
    strict.send(Spin { player_id: 7, message_id: 1 }, &cancel).await.unwrap();
    cache.invalidate_by_tags(&["player:42".to_string()]).await.unwrap();

    strict.send(Spin { player_id: 42, message_id: 1 }, &cancel).await.unwrap();
    strict.send(Spin { player_id: 7, message_id: 1 }, &cancel).await.unwrap();
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_dispatch_cancels_handler_and_is_not_cached() {
    let (strict, cache, invocations) = setup();
    let cancel = CancellationToken::new();

    let call = strict.send(Spin { player_id: 42, message_id: 3 }, &cancel);
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
    };
    let (result, ()) = tokio::join!(call, canceller);

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(cache.stats().entries, 0);
    assert_eq!(cache.stats().in_flight, 0);

    let value = strict
        .send(Spin { player_id: 42, message_id: 3 }, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(value, 30);
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn permissive_dispatcher_skips_cache_without_key() {
    let (dispatcher, cache, invocations) = parts();
    let caching = CachingDispatcher::new(dispatcher, cache.clone());
    let cancel = CancellationToken::new();

    // Spin has no `cache_key`, so the permissive dispatcher calls through.
    caching.send(Spin { player_id: 1, message_id: 1 }, &cancel).await.unwrap();
    caching.send(Spin { player_id: 1, message_id: 1 }, &cancel).await.unwrap();
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats().entries, 0);
}
