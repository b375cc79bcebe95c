//! # Herald Core
//!
//! Typed command/query dispatch.
//!
//! Requests name their response type, handlers are bound per request type in
//! a [`HandlerRegistry`], and the [`Dispatcher`] resolves and invokes them.
//! Result caching lives in `herald-cache`, which builds on these types.

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod registry;
pub mod request;
pub mod result;
pub mod telemetry;

pub use dispatcher::*;
pub use error::*;
pub use handler::*;
pub use registry::*;
pub use request::*;
pub use result::*;
pub use telemetry::*;

// Re-exported so handlers and callers share one cancellation type.
pub use tokio_util::sync::CancellationToken;
