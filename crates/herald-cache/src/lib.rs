//! # Herald Cache
//!
//! Compute-once result caching for Herald dispatch.
//!
//! - [`ResultCache`]: the cache contract (TTL, tags, single-flight).
//! - [`MemoryResultCache`]: the in-process implementation.
//! - [`CachingDispatcher`] and [`StrictCachingDispatcher`]: decorators that
//!   put a [`Dispatcher`](herald_core::Dispatcher) behind a cache.
//!
//! ```no_run
//! use herald_cache::{CacheConfig, MemoryResultCache, ResultCacheExt};
//! use herald_core::CancellationToken;
//! use std::time::Duration;
//!
//! # async fn run() -> herald_core::HeraldResult<()> {
//! let cache = MemoryResultCache::new(CacheConfig::default().default_ttl(Duration::from_secs(60)));
//! let winnings: u32 = cache
//!     .get_or_add_default("spin:42:1", |_| async { Ok(10) }, &CancellationToken::new())
//!     .await?;
//! assert_eq!(winnings, 10);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod memory;
pub mod result_cache;
pub mod validation;

pub use config::*;
pub use dispatcher::*;
pub use memory::{CacheStats, MemoryResultCache};
pub use result_cache::*;
