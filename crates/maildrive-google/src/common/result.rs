//! Common Result Type

use super::error::AppError;

/// Result type used across the crate.
pub type AppResult<T> = Result<T, AppError>;
