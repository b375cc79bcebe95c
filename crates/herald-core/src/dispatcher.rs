//! Dispatcher routing commands and queries to their registered handler.

use crate::metrics::names;
use crate::{Command, HandlerRegistry, HeraldError, HeraldResult, Query, Request};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Routes a request to its single handler.
///
/// `send` and `query` share resolution and invocation; they exist to keep
/// intent visible at the call site. Errors from the registry or the handler
/// are returned unchanged.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over a populated registry.
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher resolves against.
    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Dispatch a command.
    pub async fn send<C: Command>(
        &self,
        command: C,
        cancel: &CancellationToken,
    ) -> HeraldResult<C::Response> {
        self.dispatch(command, cancel, "command").await
    }

    /// Dispatch a query.
    pub async fn query<Q: Query>(
        &self,
        query: Q,
        cancel: &CancellationToken,
    ) -> HeraldResult<Q::Response> {
        self.dispatch(query, cancel, "query").await
    }

    async fn dispatch<R: Request>(
        &self,
        request: R,
        cancel: &CancellationToken,
        kind: &'static str,
    ) -> HeraldResult<R::Response> {
        let handler = self.registry.resolve::<R>()?;

        if cancel.is_cancelled() {
            return Err(HeraldError::Cancelled);
        }

        debug!(kind, request = std::any::type_name::<R>(), "Dispatching request");
        metrics::counter!(names::DISPATCH_TOTAL, "kind" => kind).increment(1);

        let result = handler.handle(request, cancel).await;
        if result.is_err() {
            metrics::counter!(names::DISPATCH_FAILED_TOTAL, "kind" => kind).increment(1);
        }
        result
    }
}
