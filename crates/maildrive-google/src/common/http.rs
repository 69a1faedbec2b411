//! HTTP Client Utilities
//!
//! Shared HTTP client creation with consistent configuration.

use std::time::Duration;

use super::{AppError, AppResult, ErrorCode};

/// Create a reqwest HTTP client with standard configuration
///
/// - 30 second request timeout, 10 second connect timeout
/// - redirects are not followed (Drive answers `308` mid-upload without a
///   `Location`, and no Google endpoint used here redirects)
pub fn create_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| AppError::new(ErrorCode::Transport, format!("Failed to build HTTP client: {}", e)))
}
