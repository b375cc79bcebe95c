//! In-flight computation markers for single-flight coalescing.

use super::state::CacheEntry;
use super::Inner;
use crate::ErasedValue;
use futures::future::{BoxFuture, Shared, WeakShared};
use herald_core::metrics::names;
use herald_core::HeraldResult;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) type Computation = BoxFuture<'static, HeraldResult<ErasedValue>>;
pub(crate) type SharedComputation = Shared<Computation>;

/// Marker for a running computation.
///
/// Only a weak handle is kept, so the computation lives exactly as long as
/// at least one caller is waiting on it. A stale flight was invalidated while
/// running: its current waiters still get the result, it is never stored, and
/// new callers wait for it to settle before computing afresh.
pub(crate) struct Flight {
    pub generation: u64,
    pub computation: WeakShared<Computation>,
    pub token: CancellationToken,
    pub tags: HashSet<String>,
    pub stale: bool,
}

impl Flight {
    /// A handle to wait on, or `None` if every waiter already left.
    pub fn join(&self) -> Option<SharedComputation> {
        if self.token.is_cancelled() {
            return None;
        }
        self.computation.upgrade()
    }
}

/// Settles one flight: stores a successful result and clears the marker.
///
/// Moved into the computation future. If that future is dropped before
/// completing, `Drop` cancels the flight token and clears the marker.
pub(crate) struct FlightGuard {
    inner: Arc<Inner>,
    key: String,
    generation: u64,
    token: CancellationToken,
    ttl: Duration,
    tags: HashSet<String>,
    settled: bool,
}

impl FlightGuard {
    pub fn new(
        inner: Arc<Inner>,
        key: String,
        generation: u64,
        token: CancellationToken,
        ttl: Duration,
        tags: HashSet<String>,
    ) -> Self {
        Self {
            inner,
            key,
            generation,
            token,
            ttl,
            tags,
            settled: false,
        }
    }

    /// Record the outcome and clear the marker. Stale flights never store.
    pub fn settle(&mut self, result: &HeraldResult<ErasedValue>) {
        self.settled = true;

        let mut state = self.inner.state.lock();
        let Some(stale) = state
            .in_flight
            .get(&self.key)
            .filter(|flight| flight.generation == self.generation)
            .map(|flight| flight.stale)
        else {
            debug!(key = %self.key, "Superseded computation settled, result not stored");
            return;
        };
        state.in_flight.remove(&self.key);

        match result {
            Ok(_) if stale => {
                debug!(key = %self.key, "Invalidated computation settled, result not stored");
            }
            Ok(value) => {
                let now = Instant::now();
                let Some(expires_at) = now.checked_add(self.ttl) else {
                    return;
                };
                state.insert(
                    self.key.clone(),
                    CacheEntry {
                        value: Arc::clone(value),
                        created_at: now,
                        expires_at,
                        tags: std::mem::take(&mut self.tags),
                    },
                );
                #[allow(clippy::cast_precision_loss)]
                metrics::gauge!(names::CACHE_ENTRIES).set(state.entries.len() as f64);
                debug!(key = %self.key, ttl = ?self.ttl, "Cached computation result");
            }
            Err(err) => {
                metrics::counter!(names::CACHE_COMPUTATION_FAILURES_TOTAL).increment(1);
                debug!(key = %self.key, error = %err, "Computation failed, nothing cached");
            }
        }
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        self.token.cancel();
        metrics::counter!(names::CACHE_COMPUTATION_FAILURES_TOTAL).increment(1);

        let mut state = self.inner.state.lock();
        if state
            .in_flight
            .get(&self.key)
            .is_some_and(|flight| flight.generation == self.generation)
        {
            state.in_flight.remove(&self.key);
        }
        debug!(key = %self.key, "Computation abandoned by all waiters");
    }
}
