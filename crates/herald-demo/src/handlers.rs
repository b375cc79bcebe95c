//! Sample requests and handlers.

use async_trait::async_trait;
use herald_core::{
    CancellationToken, Command, Handler, HandlerRegistry, HeraldError, HeraldResult, Idempotent,
    Query, RegistrationSource, Request,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Greets someone by name.
#[derive(Debug, Clone)]
pub struct Greet {
    pub name: String,
}

impl Request for Greet {
    type Response = String;
}

impl Command for Greet {}

/// Counts registered users. Cached under `users:count`.
#[derive(Debug, Clone, Copy)]
pub struct GetUserCount;

/// Cache tag shared by everything derived from the user directory.
pub const USERS_TAG: &str = "users";

impl Request for GetUserCount {
    type Response = usize;

    fn cache_key(&self) -> Option<String> {
        Some("users:count".to_string())
    }

    fn cache_tags(&self) -> Vec<String> {
        vec![USERS_TAG.to_string()]
    }
}

impl Query for GetUserCount {}

/// Credits a player's wallet once per message.
#[derive(Debug, Clone)]
pub struct CreditWallet {
    pub player_id: String,
    pub message_id: u64,
    pub amount: u64,
}

impl Request for CreditWallet {
    type Response = CreditReceipt;

    fn cache_key(&self) -> Option<String> {
        Some(self.idempotency_key())
    }

    fn cache_tags(&self) -> Vec<String> {
        vec![format!("player:{}", self.player_id)]
    }
}

impl Command for CreditWallet {}

impl Idempotent for CreditWallet {
    fn idempotency_key(&self) -> String {
        format!("credit:{}:{}", self.player_id, self.message_id)
    }
}

/// Outcome of a credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditReceipt {
    pub player_id: String,
    pub credited: u64,
    pub balance: u64,
}

/// In-memory user list.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: RwLock<Vec<String>>,
}

impl UserDirectory {
    pub fn add(&self, name: impl Into<String>) {
        self.users.write().push(name.into());
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.users.read().len()
    }
}

/// In-memory balances.
#[derive(Debug, Default)]
pub struct Wallet {
    balances: Mutex<HashMap<String, u64>>,
}

impl Wallet {
    #[must_use]
    pub fn balance(&self, player_id: &str) -> u64 {
        self.balances.lock().get(player_id).copied().unwrap_or(0)
    }

    fn credit(&self, player_id: &str, amount: u64) -> HeraldResult<u64> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(player_id.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| HeraldError::handler(anyhow::anyhow!("balance overflow for {player_id}")))?;
        Ok(*balance)
    }
}

pub struct GreetHandler;

#[async_trait]
impl Handler<Greet> for GreetHandler {
    async fn handle(&self, request: Greet, _cancel: &CancellationToken) -> HeraldResult<String> {
        Ok(format!("Hello, {}!", request.name))
    }
}

pub struct UserCountHandler {
    directory: Arc<UserDirectory>,
}

#[async_trait]
impl Handler<GetUserCount> for UserCountHandler {
    async fn handle(&self, _request: GetUserCount, _cancel: &CancellationToken) -> HeraldResult<usize> {
        Ok(self.directory.count())
    }
}

pub struct CreditWalletHandler {
    wallet: Arc<Wallet>,
}

#[async_trait]
impl Handler<CreditWallet> for CreditWalletHandler {
    async fn handle(
        &self,
        request: CreditWallet,
        cancel: &CancellationToken,
    ) -> HeraldResult<CreditReceipt> {
        if request.amount == 0 {
            return Err(HeraldError::handler(anyhow::anyhow!("credit amount must be positive")));
        }
        if cancel.is_cancelled() {
            return Err(HeraldError::Cancelled);
        }

        let balance = self.wallet.credit(&request.player_id, request.amount)?;
        info!(
            player_id = %request.player_id,
            message_id = request.message_id,
            amount = request.amount,
            balance,
            "Wallet credited"
        );

        Ok(CreditReceipt {
            player_id: request.player_id,
            credited: request.amount,
            balance,
        })
    }
}

/// Registers the sample handlers against shared state.
#[derive(Debug, Clone, Default)]
pub struct DemoModule {
    pub directory: Arc<UserDirectory>,
    pub wallet: Arc<Wallet>,
}

impl RegistrationSource for DemoModule {
    fn name(&self) -> &str {
        "demo"
    }

    fn register_handlers(&self, registry: &mut HandlerRegistry) -> HeraldResult<()> {
        registry.register::<Greet, _>(GreetHandler)?;
        registry.register::<GetUserCount, _>(UserCountHandler {
            directory: Arc::clone(&self.directory),
        })?;
        registry.register::<CreditWallet, _>(CreditWalletHandler {
            wallet: Arc::clone(&self.wallet),
        })?;
        Ok(())
    }
}
