//! Unified error types for dispatch and result caching.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for Herald.
///
/// The enum is `Clone` because a single computation outcome is broadcast to
/// every caller waiting on the same cache key. Opaque handler failures are
/// therefore held behind an `Arc`.
#[derive(Error, Debug, Clone)]
pub enum HeraldError {
    // ============ Dispatch Errors ============
    /// No handler bound for the request/response pair
    #[error("No handler registered for {request} -> {response}")]
    HandlerNotFound {
        request: &'static str,
        response: &'static str,
    },

    /// A handler is already bound for the request/response pair
    #[error("Handler already registered for {request} -> {response}")]
    DuplicateBinding {
        request: &'static str,
        response: &'static str,
    },

    /// Failure raised by a handler's own logic
    #[error("Handler failed: {0}")]
    Handler(Arc<anyhow::Error>),

    /// Cooperative cancellation observed
    #[error("Operation was cancelled")]
    Cancelled,

    // ============ Cache Contract Errors ============
    /// Empty, blank or oversized cache key
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Non-positive time-to-live
    #[error("Invalid cache TTL: {0:?} (must be positive)")]
    InvalidTtl(Duration),

    /// Empty tag set or blank tag
    #[error("Invalid cache tags: {0}")]
    InvalidTags(String),

    /// A value of another type is already cached under the key
    #[error("Cached value for key '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    // ============ Infrastructure Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl HeraldError {
    /// Returns the HTTP status code a transport should map this error to.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::HandlerNotFound { .. } => 404,
            Self::InvalidKey(_) | Self::InvalidTtl(_) | Self::InvalidTags(_) => 400,
            Self::Cancelled => 499,
            Self::DuplicateBinding { .. }
            | Self::Handler(_)
            | Self::TypeMismatch { .. }
            | Self::Configuration(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::HandlerNotFound { .. } => "HANDLER_NOT_FOUND",
            Self::DuplicateBinding { .. } => "DUPLICATE_BINDING",
            Self::Handler(_) => "HANDLER_FAILURE",
            Self::Cancelled => "CANCELLED",
            Self::InvalidKey(_) => "INVALID_KEY",
            Self::InvalidTtl(_) => "INVALID_TTL",
            Self::InvalidTags(_) => "INVALID_TAGS",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Creates a not found error for the given request/response types.
    #[must_use]
    pub fn handler_not_found<Req: ?Sized, Res: ?Sized>() -> Self {
        Self::HandlerNotFound {
            request: std::any::type_name::<Req>(),
            response: std::any::type_name::<Res>(),
        }
    }

    /// Creates a duplicate binding error for the given request/response types.
    #[must_use]
    pub fn duplicate_binding<Req: ?Sized, Res: ?Sized>() -> Self {
        Self::DuplicateBinding {
            request: std::any::type_name::<Req>(),
            response: std::any::type_name::<Res>(),
        }
    }

    /// Wraps an opaque handler failure.
    #[must_use]
    pub fn handler<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Handler(Arc::new(error.into()))
    }

    /// Creates an invalid key error.
    #[must_use]
    pub fn invalid_key<T: Into<String>>(message: T) -> Self {
        Self::InvalidKey(message.into())
    }

    /// Creates an invalid tags error.
    #[must_use]
    pub fn invalid_tags<T: Into<String>>(message: T) -> Self {
        Self::InvalidTags(message.into())
    }

    /// Checks if this error came from cooperative cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Checks if the caller may safely retry the operation.
    ///
    /// Nothing in Herald retries on its own; this only informs callers.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Handler(_))
    }
}

impl From<anyhow::Error> for HeraldError {
    fn from(err: anyhow::Error) -> Self {
        Self::Handler(Arc::new(err))
    }
}

/// Serializable error response for transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Request trace ID for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorResponse {
    /// Creates a new error response from a `HeraldError`.
    #[must_use]
    pub fn from_error(error: &HeraldError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            trace_id: None,
        }
    }

    /// Sets the trace ID.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<&HeraldError> for ErrorResponse {
    fn from(error: &HeraldError) -> Self {
        Self::from_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(HeraldError::handler_not_found::<Ping, String>().status_code(), 404);
        assert_eq!(HeraldError::invalid_key("blank").status_code(), 400);
        assert_eq!(HeraldError::InvalidTtl(Duration::ZERO).status_code(), 400);
        assert_eq!(HeraldError::invalid_tags("empty").status_code(), 400);
        assert_eq!(HeraldError::Cancelled.status_code(), 499);
        assert_eq!(HeraldError::handler(anyhow::anyhow!("boom")).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            HeraldError::handler_not_found::<Ping, String>().error_code(),
            "HANDLER_NOT_FOUND"
        );
        assert_eq!(
            HeraldError::duplicate_binding::<Ping, String>().error_code(),
            "DUPLICATE_BINDING"
        );
        assert_eq!(HeraldError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(HeraldError::invalid_key("x").error_code(), "INVALID_KEY");
    }

    #[test]
    fn test_type_names_in_message() {
        let err = HeraldError::handler_not_found::<Ping, String>();
        let msg = err.to_string();
        assert!(msg.contains("Ping"));
        assert!(msg.contains("String"));
    }

    #[test]
    fn test_handler_error_is_shared_on_clone() {
        let err = HeraldError::handler(anyhow::anyhow!("insufficient funds"));
        let cloned = err.clone();
        match (err, cloned) {
            (HeraldError::Handler(a), HeraldError::Handler(b)) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("Expected Handler errors"),
        }
    }

    #[test]
    fn test_retriable_errors() {
        assert!(HeraldError::Cancelled.is_retriable());
        assert!(HeraldError::handler(anyhow::anyhow!("transient")).is_retriable());
        assert!(!HeraldError::handler_not_found::<Ping, String>().is_retriable());
        assert!(!HeraldError::invalid_key("").is_retriable());
    }

    #[test]
    fn test_error_response_from_error() {
        let err = HeraldError::invalid_tags("empty tag set");
        let response = ErrorResponse::from_error(&err).with_trace_id("trace-123");
        assert_eq!(response.code, "INVALID_TAGS");
        assert!(response.message.contains("empty tag set"));
        assert_eq!(response.trace_id, Some("trace-123".to_string()));
    }
}
