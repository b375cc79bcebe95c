//! Metric names shared by dispatch and caching.

use metrics::{describe_counter, describe_gauge};

/// Metric names for Herald.
pub mod names {
    /// Total requests dispatched, labelled by `kind` (command/query).
    pub const DISPATCH_TOTAL: &str = "herald_dispatch_total";
    /// Total dispatches whose handler returned an error.
    pub const DISPATCH_FAILED_TOTAL: &str = "herald_dispatch_failed_total";

    /// Cache lookups served from a live entry.
    pub const CACHE_HITS_TOTAL: &str = "herald_cache_hits_total";
    /// Cache lookups that found no live entry.
    pub const CACHE_MISSES_TOTAL: &str = "herald_cache_misses_total";
    /// Callers that joined an in-flight computation.
    pub const CACHE_COALESCED_TOTAL: &str = "herald_cache_coalesced_total";
    /// Computations started.
    pub const CACHE_COMPUTATIONS_TOTAL: &str = "herald_cache_computations_total";
    /// Computations that settled with an error.
    pub const CACHE_COMPUTATION_FAILURES_TOTAL: &str = "herald_cache_computation_failures_total";
    /// Entries removed because they expired.
    pub const CACHE_EXPIRED_TOTAL: &str = "herald_cache_expired_total";
    /// Entries removed by key or tag invalidation.
    pub const CACHE_INVALIDATED_TOTAL: &str = "herald_cache_invalidated_total";
    /// Live entries currently held.
    pub const CACHE_ENTRIES: &str = "herald_cache_entries";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::DISPATCH_TOTAL, "Total number of dispatched requests");
    describe_counter!(
        names::DISPATCH_FAILED_TOTAL,
        "Total number of dispatched requests whose handler failed"
    );
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache hits");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache misses");
    describe_counter!(
        names::CACHE_COALESCED_TOTAL,
        "Total number of callers that joined an in-flight computation"
    );
    describe_counter!(
        names::CACHE_COMPUTATIONS_TOTAL,
        "Total number of cache computations started"
    );
    describe_counter!(
        names::CACHE_COMPUTATION_FAILURES_TOTAL,
        "Total number of cache computations that failed or were cancelled"
    );
    describe_counter!(names::CACHE_EXPIRED_TOTAL, "Total number of expired entries removed");
    describe_counter!(
        names::CACHE_INVALIDATED_TOTAL,
        "Total number of entries removed by invalidation"
    );
    describe_gauge!(names::CACHE_ENTRIES, "Current number of cache entries");
}
