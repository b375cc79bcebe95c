//! Result type aliases for Herald.

use crate::HeraldError;

/// A specialized `Result` type for Herald operations.
pub type HeraldResult<T> = Result<T, HeraldError>;
