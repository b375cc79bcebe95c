//! Wires the sample handlers behind plain, caching and strict dispatchers.

use crate::handlers::{CreditReceipt, CreditWallet, DemoModule, GetUserCount, Greet, USERS_TAG};
use herald_cache::{
    CacheConfig, CachingDispatcher, MemoryResultCache, ResultCache, StrictCachingDispatcher,
};
use herald_core::{CancellationToken, Dispatcher, HandlerRegistry, HeraldResult};
use std::sync::Arc;
use tracing::info;

/// What the sample run observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub greeting: String,
    /// User count served from cache after a user was added.
    pub cached_user_count: usize,
    /// User count after invalidating the `users` tag.
    pub fresh_user_count: usize,
    pub first_credit: CreditReceipt,
    pub replayed_credit: CreditReceipt,
    pub final_balance: u64,
}

/// Application services built from configuration.
pub struct DemoApp {
    module: DemoModule,
    dispatcher: Dispatcher,
    cache: Arc<MemoryResultCache>,
}

impl DemoApp {
    /// Build the registry and cache.
    pub fn new(cache_config: CacheConfig) -> HeraldResult<Self> {
        let module = DemoModule::default();
        let registry = HandlerRegistry::from_sources(&[&module])?;

        Ok(Self {
            module,
            dispatcher: Dispatcher::new(Arc::new(registry)),
            cache: Arc::new(MemoryResultCache::new(cache_config)),
        })
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<MemoryResultCache> {
        &self.cache
    }

    /// Run the sample flow once.
    pub async fn run(&self, cancel: &CancellationToken) -> HeraldResult<DemoReport> {
        let _sweeper = self.cache.spawn_sweeper();

        let caching = CachingDispatcher::new(self.dispatcher.clone(), self.cache.clone());
        let strict = StrictCachingDispatcher::new(self.dispatcher.clone(), self.cache.clone());

        let greeting = caching
            .send(Greet { name: "Ada".to_string() }, cancel)
            .await?;
        info!(%greeting, "Greet command handled");

        self.module.directory.add("ada");
        let initial = caching.query(GetUserCount, cancel).await?;
        self.module.directory.add("grace");
        let cached_user_count = caching.query(GetUserCount, cancel).await?;
        info!(initial, cached_user_count, "User count served from cache");

        self.cache.invalidate_by_tags(&[USERS_TAG.to_string()]).await?;
        let fresh_user_count = caching.query(GetUserCount, cancel).await?;
        info!(fresh_user_count, "User count after invalidation");

        let credit = CreditWallet {
            player_id: "42".to_string(),
            message_id: 1,
            amount: 10,
        };
        let first_credit = strict.send(credit.clone(), cancel).await?;
        let replayed_credit = strict.send(credit, cancel).await?;
        let final_balance = self.module.wallet.balance("42");
        info!(
            balance = final_balance,
            replay_matches = first_credit == replayed_credit,
            "Idempotent credit replayed"
        );

        let stats = self.cache.stats();
        info!(entries = stats.entries, tags = stats.tags, "Cache state after run");

        Ok(DemoReport {
            greeting,
            cached_user_count,
            fresh_user_count,
            first_credit,
            replayed_credit,
            final_balance,
        })
    }
}
