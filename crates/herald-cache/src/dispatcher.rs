//! Dispatchers that route cacheable requests through a [`ResultCache`].
//!
//! Both variants wrap a plain [`Dispatcher`] and never touch its registry.
//! On a miss the wrapped dispatcher runs inside the cache's computation, so
//! concurrent identical requests reach the handler once.

use crate::{EntryOptions, ResultCache, ResultCacheExt};
use herald_core::{Command, Dispatcher, HeraldResult, Idempotent, Query, Request};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

fn entry_options<R: Request>(cache: &dyn ResultCache, request: &R) -> EntryOptions {
    EntryOptions::new(cache.default_ttl()).with_tags(request.cache_tags())
}

/// Caches requests that carry a key and dispatches the rest directly.
///
/// A request is cached when [`Request::cache_key`] returns `Some`. The
/// default TTL of the cache applies and [`Request::cache_tags`] become the
/// entry's tags.
#[derive(Clone)]
pub struct CachingDispatcher {
    dispatcher: Dispatcher,
    cache: Arc<dyn ResultCache>,
}

impl CachingDispatcher {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, cache: Arc<dyn ResultCache>) -> Self {
        Self { dispatcher, cache }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ResultCache> {
        &self.cache
    }

    /// Dispatch a command, through the cache if it has a key.
    pub async fn send<C>(&self, command: C, cancel: &CancellationToken) -> HeraldResult<C::Response>
    where
        C: Command,
        C::Response: Clone + Sync,
    {
        let Some(key) = command.cache_key() else {
            debug!(request = std::any::type_name::<C>(), "No cache key, dispatching directly");
            return self.dispatcher.send(command, cancel).await;
        };

        let options = entry_options(self.cache.as_ref(), &command);
        let dispatcher = self.dispatcher.clone();
        self.cache
            .get_or_add(
                &key,
                move |token| async move { dispatcher.send(command, &token).await },
                options,
                cancel,
            )
            .await
    }

    /// Dispatch a query, through the cache if it has a key.
    pub async fn query<Q>(&self, query: Q, cancel: &CancellationToken) -> HeraldResult<Q::Response>
    where
        Q: Query,
        Q::Response: Clone + Sync,
    {
        let Some(key) = query.cache_key() else {
            debug!(request = std::any::type_name::<Q>(), "No cache key, dispatching directly");
            return self.dispatcher.query(query, cancel).await;
        };

        let options = entry_options(self.cache.as_ref(), &query);
        let dispatcher = self.dispatcher.clone();
        self.cache
            .get_or_add(
                &key,
                move |token| async move { dispatcher.query(query, &token).await },
                options,
                cancel,
            )
            .await
    }
}

impl std::fmt::Debug for CachingDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingDispatcher")
            .field("dispatcher", &self.dispatcher)
            .field("default_ttl", &self.cache.default_ttl())
            .finish_non_exhaustive()
    }
}

/// Routes every request through the cache, keyed by its idempotency key.
///
/// Only [`Idempotent`] requests are accepted, so a request without a key is
/// rejected at compile time:
///
/// ```compile_fail
/// use herald_cache::StrictCachingDispatcher;
/// use herald_core::{CancellationToken, Command, Request};
///
/// struct Greet(String);
///
/// impl Request for Greet {
///     type Response = String;
/// }
///
/// impl Command for Greet {}
///
/// async fn greet(dispatcher: &StrictCachingDispatcher) {
///     let _ = dispatcher
///         .send(Greet("Ada".to_string()), &CancellationToken::new())
///         .await;
/// }
/// ```
#[derive(Clone)]
pub struct StrictCachingDispatcher {
    dispatcher: Dispatcher,
    cache: Arc<dyn ResultCache>,
}

impl StrictCachingDispatcher {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, cache: Arc<dyn ResultCache>) -> Self {
        Self { dispatcher, cache }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ResultCache> {
        &self.cache
    }

    /// Dispatch an idempotent command through the cache.
    ///
    /// Replays with the same idempotency key return the first result until it
    /// expires or is invalidated.
    pub async fn send<C>(&self, command: C, cancel: &CancellationToken) -> HeraldResult<C::Response>
    where
        C: Command + Idempotent,
        C::Response: Clone + Sync,
    {
        let key = command.idempotency_key();
        let options = entry_options(self.cache.as_ref(), &command);
        let dispatcher = self.dispatcher.clone();

        debug!(key = %key, "Strict dispatch of command");
        self.cache
            .get_or_add(
                &key,
                move |token| async move { dispatcher.send(command, &token).await },
                options,
                cancel,
            )
            .await
    }

    /// Dispatch an idempotent query through the cache.
    pub async fn query<Q>(&self, query: Q, cancel: &CancellationToken) -> HeraldResult<Q::Response>
    where
        Q: Query + Idempotent,
        Q::Response: Clone + Sync,
    {
        let key = query.idempotency_key();
        let options = entry_options(self.cache.as_ref(), &query);
        let dispatcher = self.dispatcher.clone();

        debug!(key = %key, "Strict dispatch of query");
        self.cache
            .get_or_add(
                &key,
                move |token| async move { dispatcher.query(query, &token).await },
                options,
                cancel,
            )
            .await
    }
}

impl std::fmt::Debug for StrictCachingDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrictCachingDispatcher")
            .field("dispatcher", &self.dispatcher)
            .field("default_ttl", &self.cache.default_ttl())
            .finish_non_exhaustive()
    }
}
