//! Google API Authenticated HTTP Client
//!
//! Injects the OAuth bearer token into every request and maps Google's REST
//! error envelope onto [`AppError`]. Also carries the two raw calls of the
//! resumable upload protocol, which need headers and status codes the JSON
//! helpers hide.

use std::time::Duration;

use reqwest::header::{CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::common::{create_http_client, AppError, AppResult, ErrorCode};

/// Per-chunk upload timeout. Replaces the client-wide request timeout, which
/// an 8 MiB body would exceed on a slow link.
pub(crate) const CHUNK_TIMEOUT: Duration = Duration::from_secs(600);

/// Result of sending one chunk to a resumable upload session
#[derive(Debug)]
pub enum ChunkStatus {
    /// `308 Resume Incomplete`; the server holds bytes `0..next_offset`.
    Incomplete { next_offset: u64 },
    /// Final response body.
    Complete(Value),
}

/// Google API HTTP client with OAuth token injection
pub struct GoogleClient {
    client: Client,
    access_token: String,
}

impl GoogleClient {
    /// Create a new Google API client with an OAuth access token
    pub fn new(access_token: String) -> AppResult<Self> {
        let client = create_http_client()?;

        Ok(Self {
            client,
            access_token,
        })
    }

    /// Make an authenticated GET request and decode the JSON response
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let builder = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.access_token);

        let value = self.execute_request(builder).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Open a resumable upload session and return its session URI.
    pub async fn start_resumable_upload(
        &self,
        url: &str,
        query: &[(&str, String)],
        metadata: &Value,
        content_length: u64,
    ) -> AppResult<String> {
        debug!("Opening resumable upload session ({} bytes)", content_length);

        let response = self
            .client
            .post(url)
            .query(query)
            .bearer_auth(&self.access_token)
            .header("X-Upload-Content-Length", content_length)
            .json(metadata)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.error_from_body(status, &body));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| AppError::invalid_response("Resumable upload session has no Location header"))
    }

    /// PUT one chunk of a resumable upload.
    ///
    /// `content_range` is the full header value, e.g. `bytes 0-262143/1048576`
    /// or `bytes */0` for an empty upload.
    pub async fn upload_chunk(
        &self,
        session_uri: &str,
        chunk: Vec<u8>,
        content_range: &str,
    ) -> AppResult<ChunkStatus> {
        debug!("Uploading chunk: {}", content_range);

        let response = self
            .chunk_request(session_uri, chunk, content_range)
            .send()
            .await?;

        if response.status() == StatusCode::PERMANENT_REDIRECT {
            let range = response.headers().get(RANGE).and_then(|v| v.to_str().ok());
            return Ok(ChunkStatus::Incomplete {
                next_offset: acked_bytes(range),
            });
        }

        let status = response.status();
        let body = response.text().await?;
        let value = self.parse_body(status, &body)?;
        Ok(ChunkStatus::Complete(value))
    }

    fn chunk_request(&self, session_uri: &str, chunk: Vec<u8>, content_range: &str) -> RequestBuilder {
        self.client
            .put(session_uri)
            .bearer_auth(&self.access_token)
            .header(CONTENT_RANGE, content_range)
            .timeout(CHUNK_TIMEOUT)
            .body(chunk)
    }

    /// Execute a request and handle Google API response patterns
    async fn execute_request(&self, builder: RequestBuilder) -> AppResult<Value> {
        debug!("Executing Google API request");

        let response = builder.send().await?;

        let status = response.status();
        debug!("Response status: {}", status);

        let body = response.text().await?;
        self.parse_body(status, &body)
    }

    fn parse_body(&self, status: StatusCode, body: &str) -> AppResult<Value> {
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by Google API");
            return Err(AppError::new(
                ErrorCode::RateLimited,
                "Rate limited. Please try again later.",
            ));
        }

        if !status.is_success() {
            return Err(self.error_from_body(status, body));
        }

        // Empty successful responses
        if body.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        serde_json::from_str(body).map_err(|e| {
            AppError::invalid_response(format!("Failed to parse JSON response: {} (body: {})", e, body))
        })
    }

    fn error_from_body(&self, status: StatusCode, body: &str) -> AppError {
        let error = match serde_json::from_str::<Value>(body) {
            Ok(parsed) => self.extract_error(&parsed, status),
            Err(_) => AppError::api(status.as_u16(), format!("HTTP {}", status)),
        };
        error!("Google API error: {}", error.message);
        error
    }

    /// Extract the error from a Google API error response
    fn extract_error(&self, response: &Value, status: StatusCode) -> AppError {
        // Google APIs return errors in this format:
        // {
        //   "error": {
        //     "code": 400,
        //     "message": "Invalid request",
        //     "errors": [...]
        //   }
        // }

        if let Some(error_obj) = response.get("error") {
            if let Some(message) = error_obj.get("message").and_then(|v| v.as_str()) {
                let code = error_obj
                    .get("code")
                    .and_then(|v| v.as_u64())
                    .map(|c| c as u16)
                    .unwrap_or(status.as_u16());

                return AppError::api(code, message);
            }
        }

        // Fallback to status code
        AppError::api(status.as_u16(), format!("HTTP {}", status))
    }
}

/// Bytes the server holds after a `308`. No `Range` header means none.
pub(crate) fn acked_bytes(range: Option<&str>) -> u64 {
    range.and_then(parse_range_end).map(|end| end + 1).unwrap_or(0)
}

/// Parse the last byte index out of a `Range: bytes=0-524287` header.
pub(crate) fn parse_range_end(range: &str) -> Option<u64> {
    range
        .trim()
        .strip_prefix("bytes=")?
        .split('-')
        .nth(1)?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> GoogleClient {
        GoogleClient {
            client: Client::new(),
            access_token: "test".to_string(),
        }
    }

    #[test]
    fn test_extract_error_message() {
        let client = test_client();

        let error_response = serde_json::json!({
            "error": {
                "code": 400,
                "message": "Invalid request format"
            }
        });

        let err = client.extract_error(&error_response, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, ErrorCode::ApiError);
        assert!(err.message.contains("400"));
        assert!(err.message.contains("Invalid request format"));
    }

    #[test]
    fn test_error_body_not_json() {
        let client = test_client();
        let err = client.error_from_body(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(err.message.contains("502"));
    }

    #[test]
    fn test_parse_body_rate_limited() {
        let client = test_client();
        let err = client.parse_body(StatusCode::TOO_MANY_REQUESTS, "").unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimited);
    }

    #[test]
    fn test_parse_body_empty_success() {
        let client = test_client();
        let value = client.parse_body(StatusCode::OK, "").unwrap();
        assert!(value.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_parse_range_end() {
        assert_eq!(parse_range_end("bytes=0-524287"), Some(524287));
        assert_eq!(parse_range_end(" bytes=0-0 "), Some(0));
        assert_eq!(parse_range_end("0-10"), None);
        assert_eq!(parse_range_end("bytes=0-"), None);
    }

    #[test]
    fn test_acked_bytes() {
        assert_eq!(acked_bytes(Some("bytes=0-8388607")), 8_388_608);
        assert_eq!(acked_bytes(Some("garbage")), 0);
        assert_eq!(acked_bytes(None), 0);
    }

    #[test]
    fn test_chunk_request_overrides_timeout() {
        let request = test_client()
            .chunk_request("https://upload.example/session", vec![0u8; 4], "bytes 0-3/4")
            .build()
            .unwrap();
        assert_eq!(request.timeout(), Some(&CHUNK_TIMEOUT));
        assert_eq!(request.headers()[CONTENT_RANGE], "bytes 0-3/4");
        assert!(CHUNK_TIMEOUT > Duration::from_secs(30));
    }
}
