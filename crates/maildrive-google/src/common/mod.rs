//! Common Utilities
//!
//! Error handling and HTTP client construction shared by `auth` and `google`.

pub mod error;
pub mod http;
pub mod result;

pub use error::{AppError, ErrorCode};
pub use http::create_http_client;
pub use result::AppResult;
