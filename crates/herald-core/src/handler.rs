//! Handler capability.

use crate::{HeraldResult, Request};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Handles one concrete request type.
///
/// Exactly one handler is registered per request type. Handlers are expected
/// to observe `cancel` at their own suspension points and fail with
/// [`HeraldError::Cancelled`](crate::HeraldError::Cancelled) when it fires.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync + 'static {
    /// Handles the request.
    async fn handle(&self, request: R, cancel: &CancellationToken) -> HeraldResult<R::Response>;
}
