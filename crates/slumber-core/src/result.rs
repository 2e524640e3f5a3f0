//! Result type aliases for Slumber.

use crate::SlumberError;

/// A specialized `Result` type for Slumber operations.
pub type SlumberResult<T> = Result<T, SlumberError>;
