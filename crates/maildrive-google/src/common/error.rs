//! Common Error Types
//!
//! Unified error type for the credential manager and the Google API clients.

use std::fmt;

/// Error categories surfaced by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Credential manager
    ClientSecretInvalid,
    TokenCacheInvalid,
    TokenRefreshFailed,
    ConsentFailed,

    // Google API responses
    ApiError,
    RateLimited,
    InvalidResponse,

    // Transport and local I/O
    Transport,
    Io,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ClientSecretInvalid => "client_secret_invalid",
            ErrorCode::TokenCacheInvalid => "token_cache_invalid",
            ErrorCode::TokenRefreshFailed => "token_refresh_failed",
            ErrorCode::ConsentFailed => "consent_failed",
            ErrorCode::ApiError => "api_error",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::InvalidResponse => "invalid_response",
            ErrorCode::Transport => "transport",
            ErrorCode::Io => "io",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn client_secret_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ClientSecretInvalid, message)
    }

    pub fn token_cache_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenCacheInvalid, message)
    }

    pub fn token_refresh_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenRefreshFailed, message)
    }

    pub fn consent_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConsentFailed, message)
    }

    /// Google API error envelope (`{"error": {"code", "message"}}`)
    pub fn api(status: u16, message: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ApiError,
            format!("Google API error {}: {}", status, message),
        )
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(ErrorCode::Transport, format!("HTTP request failed: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_response(format!("Failed to parse JSON: {}", err))
    }
}
