//! In-process result cache with TTL, tag index and single-flight coalescing.
//!
//! ## Locking
//!
//! One `parking_lot::Mutex` guards the entry map, the tag index and the
//! in-flight markers. It is never held across an `.await` and never while a
//! computation runs, so slow computations for one key do not block others.
//!
//! ## Single flight
//!
//! The first caller to miss on a key creates a [`Shared`](futures::future::Shared)
//! computation and records a weak handle to it. Later callers upgrade that
//! handle and await the same future. Whichever caller drives the future to
//! completion settles it (stores on success, clears the marker either way).
//! When the last waiter leaves, the future is dropped and the computation's
//! token is cancelled.
//!
//! Invalidation marks a running computation stale rather than forgetting it.
//! Callers arriving afterwards wait for the stale computation to settle,
//! discard its value and then start a fresh one, so a key never has two
//! computations running at once.

mod flight;
mod state;

use crate::validation::{validate_key, validate_tags, validate_ttl};
use crate::{CacheConfig, ComputeFn, EntryOptions, ErasedValue, ResultCache};
use async_trait::async_trait;
use flight::{Flight, FlightGuard, SharedComputation};
use futures::FutureExt;
use herald_core::metrics::names;
use herald_core::{HeraldError, HeraldResult};
use parking_lot::Mutex;
use state::{CacheState, Lookup};
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub(crate) struct Inner {
    state: Mutex<CacheState>,
    config: CacheConfig,
}

/// Point-in-time view of cache bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Stored entries, including expired ones not yet purged.
    pub entries: usize,
    /// Tags with at least one entry.
    pub tags: usize,
    /// Keys with a computation currently running.
    pub in_flight: usize,
}

/// In-process [`ResultCache`].
///
/// Cloning is cheap and shares the same underlying store.
#[derive(Clone)]
pub struct MemoryResultCache {
    inner: Arc<Inner>,
}

enum Admission {
    Hit(ErasedValue),
    Wait(SharedComputation),
    /// An invalidated computation is still running; wait for it, then retry.
    Stale {
        computation: SharedComputation,
        compute: ComputeFn,
    },
}

impl MemoryResultCache {
    /// Create a cache with the given configuration.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        info!(
            default_ttl_secs = config.default_ttl.as_secs(),
            max_key_length = config.max_key_length,
            "Result cache initialized"
        );
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CacheState::default()),
                config,
            }),
        }
    }

    /// The configuration this cache was built with.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Snapshot of the current bookkeeping.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            entries: state.entries.len(),
            tags: state.tag_index.len(),
            in_flight: state.in_flight.len(),
        }
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        Self::purge(&self.inner)
    }

    /// Start the periodic sweep of expired entries, if configured.
    ///
    /// The task stops on its own once every handle to the cache is dropped.
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let period = self.inner.config.sweep_interval?;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        info!(interval_secs = period.as_secs(), "Starting expired entry sweeper");

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    debug!("Result cache dropped, sweeper exiting");
                    break;
                };
                Self::purge(&inner);
            }
        }))
    }

    fn purge(inner: &Inner) -> usize {
        let mut state = inner.state.lock();
        let removed = state.purge_expired(Instant::now());
        if removed > 0 {
            metrics::counter!(names::CACHE_EXPIRED_TOTAL).increment(removed as u64);
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(names::CACHE_ENTRIES).set(state.entries.len() as f64);
            debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    /// Serve a hit, join a running computation, or start a new one.
    fn admit(&self, key: &str, compute: ComputeFn, options: &EntryOptions) -> Admission {
        let mut state = self.inner.state.lock();

        match state.lookup(key, Instant::now()) {
            Lookup::Hit { value, age } => {
                metrics::counter!(names::CACHE_HITS_TOTAL).increment(1);
                debug!(key, ?age, "Cache hit");
                return Admission::Hit(value);
            }
            Lookup::Expired => {
                metrics::counter!(names::CACHE_EXPIRED_TOTAL).increment(1);
                debug!(key, "Cache entry expired");
            }
            Lookup::Miss => {}
        }
        metrics::counter!(names::CACHE_MISSES_TOTAL).increment(1);

        if let Some(flight) = state.in_flight.get(key) {
            if let Some(computation) = flight.join() {
                if flight.stale {
                    debug!(key, "Waiting for invalidated computation to settle");
                    return Admission::Stale {
                        computation,
                        compute,
                    };
                }
                metrics::counter!(names::CACHE_COALESCED_TOTAL).increment(1);
                debug!(key, "Joining in-flight computation");
                return Admission::Wait(computation);
            }
        }

        let generation = state.next_generation();
        let token = CancellationToken::new();
        let tags: HashSet<String> = options.tags.iter().cloned().collect();

        let mut guard = FlightGuard::new(
            Arc::clone(&self.inner),
            key.to_string(),
            generation,
            token.clone(),
            options.ttl,
            tags.clone(),
        );
        let flight_token = token.clone();
        let computation = async move {
            let result = AssertUnwindSafe(compute(flight_token))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(HeraldError::handler(anyhow::anyhow!("cache computation panicked")))
                });
            guard.settle(&result);
            result
        }
        .boxed()
        .shared();

        if let Some(weak) = computation.downgrade() {
            state.in_flight.insert(
                key.to_string(),
                Flight {
                    generation,
                    computation: weak,
                    token,
                    tags,
                    stale: false,
                },
            );
        }

        metrics::counter!(names::CACHE_COMPUTATIONS_TOTAL).increment(1);
        debug!(key, generation, "Starting computation");
        Admission::Wait(computation)
    }
}

impl Default for MemoryResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for MemoryResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryResultCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get_or_add_erased(
        &self,
        key: &str,
        compute: ComputeFn,
        options: EntryOptions,
        cancel: &CancellationToken,
    ) -> HeraldResult<ErasedValue> {
        validate_key(key, self.inner.config.max_key_length)?;
        validate_ttl(options.ttl)?;
        if Instant::now().checked_add(options.ttl).is_none() {
            return Err(HeraldError::InvalidTtl(options.ttl));
        }
        validate_tags(&options.tags, false)?;

        if cancel.is_cancelled() {
            return Err(HeraldError::Cancelled);
        }

        let mut compute = compute;
        let computation = loop {
            match self.admit(key, compute, &options) {
                Admission::Hit(value) => return Ok(value),
                Admission::Wait(computation) => break computation,
                Admission::Stale {
                    computation,
                    compute: pending,
                } => {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(HeraldError::Cancelled),
                        _ = computation => {}
                    }
                    compute = pending;
                }
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(key, "Caller cancelled while waiting");
                Err(HeraldError::Cancelled)
            }
            result = computation => result,
        }
    }

    async fn invalidate(&self, key: &str) -> HeraldResult<()> {
        validate_key(key, self.inner.config.max_key_length)?;

        let mut state = self.inner.state.lock();
        let removed = state.remove(key).is_some();
        let marked_stale = state.mark_flight_stale(key);

        if removed {
            metrics::counter!(names::CACHE_INVALIDATED_TOTAL).increment(1);
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(names::CACHE_ENTRIES).set(state.entries.len() as f64);
        }
        debug!(key, removed, marked_stale, "Invalidated cache key");
        Ok(())
    }

    async fn invalidate_by_tags(&self, tags: &[String]) -> HeraldResult<()> {
        validate_tags(tags, true)?;

        let mut state = self.inner.state.lock();
        let removed = state.remove_tagged(tags);
        let marked_stale = state.mark_tagged_flights_stale(tags);

        if removed > 0 {
            metrics::counter!(names::CACHE_INVALIDATED_TOTAL).increment(removed as u64);
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(names::CACHE_ENTRIES).set(state.entries.len() as f64);
        }
        debug!(?tags, removed, marked_stale, "Invalidated cache tags");
        Ok(())
    }

    fn default_ttl(&self) -> Duration {
        self.inner.config.default_ttl
    }
}
