//! Request traits: commands, queries and cache keys.
//!
//! A request type names its single response type through
//! [`Request::Response`], so a request can never be dispatched against two
//! different response types.

/// A value routed to exactly one handler.
pub trait Request: Send + Sync + 'static {
    /// The response produced by this request's handler.
    type Response: Send + 'static;

    /// Cache key used by the permissive caching dispatcher.
    ///
    /// `None` (the default) means the request is never cached. Requests that
    /// implement [`Idempotent`] usually return `Some(self.idempotency_key())`.
    fn cache_key(&self) -> Option<String> {
        None
    }

    /// Tags attached to the cached result, for group invalidation.
    fn cache_tags(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A request that mutates external state.
pub trait Command: Request {}

/// A request that only reads state.
pub trait Query: Request {}

/// A request that always carries a cache key.
///
/// Only requests implementing this trait can go through the strict caching
/// dispatcher. The key must be non-empty and identical for replays of the same
/// logical operation, e.g. `spin:{player}:{message_id}`.
pub trait Idempotent: Request {
    /// The replay-protection key for this request.
    fn idempotency_key(&self) -> String;
}
