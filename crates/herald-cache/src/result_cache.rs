//! Result cache contract.

use crate::EntryOptions;
use async_trait::async_trait;
use futures::future::BoxFuture;
use herald_core::{HeraldError, HeraldResult};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A cached value with its concrete type erased.
pub type ErasedValue = Arc<dyn Any + Send + Sync>;

/// A deferred computation producing an erased value.
///
/// It receives the computation's own cancellation token, which fires once
/// every caller waiting on the result has gone away.
pub type ComputeFn =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, HeraldResult<ErasedValue>> + Send>;

/// Memoizes computation results behind string keys.
///
/// Values are type-erased so the trait stays dyn-compatible; use
/// [`ResultCacheExt`] for typed access.
///
/// Implementations must guarantee that concurrent `get_or_add_erased` calls
/// for one key run `compute` at most once, that failed or cancelled
/// computations are never stored, and that expired entries are never
/// returned.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Return the live value for `key` or compute, store and return it.
    ///
    /// `cancel` only abandons this caller's wait. Other callers waiting on the
    /// same computation still receive its outcome.
    async fn get_or_add_erased(
        &self,
        key: &str,
        compute: ComputeFn,
        options: EntryOptions,
        cancel: &CancellationToken,
    ) -> HeraldResult<ErasedValue>;

    /// Remove the entry for `key`. Missing keys are not an error.
    async fn invalidate(&self, key: &str) -> HeraldResult<()>;

    /// Remove every entry carrying any of `tags`.
    async fn invalidate_by_tags(&self, tags: &[String]) -> HeraldResult<()>;

    /// TTL used when callers do not pass one.
    fn default_ttl(&self) -> Duration;
}

/// Typed convenience methods over [`ResultCache`].
#[async_trait]
pub trait ResultCacheExt: ResultCache {
    /// Typed `get_or_add` with explicit TTL and tags.
    async fn get_or_add<T, F, Fut>(
        &self,
        key: &str,
        compute: F,
        options: EntryOptions,
        cancel: &CancellationToken,
    ) -> HeraldResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = HeraldResult<T>> + Send + 'static,
    {
        let compute: ComputeFn = Box::new(move |token| {
            Box::pin(async move {
                let value = compute(token).await?;
                Ok(Arc::new(value) as ErasedValue)
            })
        });

        let erased = self.get_or_add_erased(key, compute, options, cancel).await?;
        downcast(key, erased)
    }

    /// Typed `get_or_add` using the cache's default TTL and no tags.
    async fn get_or_add_default<T, F, Fut>(
        &self,
        key: &str,
        compute: F,
        cancel: &CancellationToken,
    ) -> HeraldResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = HeraldResult<T>> + Send + 'static,
    {
        let options = EntryOptions::new(self.default_ttl());
        self.get_or_add(key, compute, options, cancel).await
    }
}

impl<C: ResultCache + ?Sized> ResultCacheExt for C {}

fn downcast<T>(key: &str, value: ErasedValue) -> HeraldResult<T>
where
    T: Clone + Send + Sync + 'static,
{
    value
        .downcast::<T>()
        .map(|typed| T::clone(&typed))
        .map_err(|_| HeraldError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        })
}
