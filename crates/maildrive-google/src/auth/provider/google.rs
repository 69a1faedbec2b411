//! Google OAuth2 Provider
//!
//! Implements the PKCE Authorization Code flow for installed applications.
//! Endpoints and client credentials come from the client-secret file; a
//! refresh can also run from the credentials stored in the token cache.

use std::collections::HashMap;
use tracing::{error, info};

use super::{OAuthProvider, OAuthTokens};
use crate::auth::client_secret::{ClientSecret, DEFAULT_TOKEN_URI};
use crate::auth::TokenRecord;
use crate::common::{create_http_client, AppError, AppResult};

/// Google OAuth2 provider.
pub struct GoogleProvider {
    secret: Option<ClientSecret>,
    http: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(secret: Option<ClientSecret>) -> AppResult<Self> {
        Ok(Self {
            secret,
            http: create_http_client()?,
        })
    }

    fn require_secret(&self) -> AppResult<&ClientSecret> {
        self.secret.as_ref().ok_or_else(|| {
            AppError::client_secret_invalid(
                "No client secret file loaded; it is required to authorize a new token",
            )
        })
    }

    /// POST a form-encoded request and return the response body.
    ///
    /// Secrets travel in the request body only.
    async fn post_form(&self, url: &str, params: &HashMap<&str, &str>) -> AppResult<String> {
        let response = self.http.post(url).form(params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            error!("HTTP error {}: {}", status, body);
            return Err(token_endpoint_error(status.as_u16(), &body));
        }

        Ok(response.text().await?)
    }
}

impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn client_secret(&self) -> Option<&ClientSecret> {
        self.secret.as_ref()
    }

    fn authorize_url(
        &self,
        scopes: &[String],
        state: &str,
        code_challenge: &str,
        redirect_uri: &str,
    ) -> AppResult<String> {
        let secret = self.require_secret()?;
        let scope_str = scopes.join(" ");
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent",
            secret.auth_uri,
            urlencoding::encode(&secret.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope_str),
            urlencoding::encode(state),
            urlencoding::encode(code_challenge),
        ))
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> AppResult<OAuthTokens> {
        info!("Exchanging authorization code for tokens");
        let secret = self.require_secret()?;

        let mut params = HashMap::new();
        params.insert("client_id", secret.client_id.as_str());
        params.insert("client_secret", secret.client_secret.as_str());
        params.insert("code", code);
        params.insert("code_verifier", code_verifier);
        params.insert("grant_type", "authorization_code");
        params.insert("redirect_uri", redirect_uri);

        let response = self
            .post_form(&secret.token_uri, &params)
            .await
            .map_err(|e| AppError::consent_failed(e.message))?;
        parse_token_response(&response).map_err(|e| AppError::consent_failed(e.message))
    }

    async fn refresh_token(&self, record: &TokenRecord) -> AppResult<OAuthTokens> {
        info!("Refreshing access token");

        if record.refresh_token.is_empty() {
            return Err(AppError::token_refresh_failed("No refresh token available"));
        }

        // Use the client_id/secret from the token record if available,
        // falling back to the client-secret file
        let fallback = self.secret.as_ref();
        let cid = pick(&record.client_id, fallback.map(|s| s.client_id.as_str()));
        let csec = pick(&record.client_secret, fallback.map(|s| s.client_secret.as_str()));
        let token_uri = pick(
            &record.token_uri,
            Some(fallback.map_or(DEFAULT_TOKEN_URI, |s| s.token_uri.as_str())),
        );

        if cid.is_empty() {
            return Err(AppError::token_refresh_failed(
                "Token cache has no client_id and no client secret file is loaded",
            ));
        }

        let mut params = HashMap::new();
        params.insert("client_id", cid);
        params.insert("client_secret", csec);
        params.insert("refresh_token", record.refresh_token.as_str());
        params.insert("grant_type", "refresh_token");

        let response = self
            .post_form(token_uri, &params)
            .await
            .map_err(|e| AppError::token_refresh_failed(e.message))?;
        parse_token_response(&response).map_err(|e| AppError::token_refresh_failed(e.message))
    }
}

fn pick<'a>(primary: &'a str, fallback: Option<&'a str>) -> &'a str {
    if primary.is_empty() {
        fallback.unwrap_or("")
    } else {
        primary
    }
}

// ── Response parsing ────────────────────────────────────────────────────────

/// Map a non-2xx token endpoint response onto an error message, preferring
/// the OAuth `error` / `error_description` pair.
fn token_endpoint_error(status: u16, body: &str) -> AppError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|parsed| {
            let err = parsed.get("error")?.as_str()?.to_string();
            let desc = parsed
                .get("error_description")
                .and_then(|v| v.as_str())
                .unwrap_or("no description");
            Some(format!("{}: {}", err, desc))
        })
        .unwrap_or_else(|| body.to_string());
    AppError::api(status, detail)
}

/// Parse a Google OAuth2 token response.
fn parse_token_response(body: &str) -> AppResult<OAuthTokens> {
    let parsed: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AppError::invalid_response(format!("Invalid JSON response: {}", e)))?;

    // Check for error
    if let Some(err) = parsed.get("error").and_then(|v| v.as_str()) {
        let desc = parsed
            .get("error_description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error");
        return Err(AppError::invalid_response(format!("{}: {}", err, desc)));
    }

    let access_token = parsed
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::invalid_response("Missing access_token in response"))?
        .to_string();

    let refresh_token = parsed
        .get("refresh_token")
        .and_then(|v| v.as_str())
        .map(String::from);

    let token_type = parsed
        .get("token_type")
        .and_then(|v| v.as_str())
        .unwrap_or("Bearer")
        .to_string();

    let expires_in = parsed
        .get("expires_in")
        .and_then(|v| v.as_u64())
        .unwrap_or(3600);

    let expiry = chrono::Utc::now() + chrono::Duration::seconds(expires_in as i64);

    let scopes = parsed
        .get("scope")
        .and_then(|v| v.as_str())
        .map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default();

    Ok(OAuthTokens {
        access_token,
        refresh_token,
        token_type,
        expiry,
        scopes,
    })
}

// ── PKCE Utilities ──────────────────────────────────────────────────────────

/// Generate a PKCE code verifier (43-128 characters of unreserved URI characters).
pub fn generate_code_verifier() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64_url_encode(&bytes)
}

/// Derive the PKCE code challenge from a code verifier using S256.
pub fn generate_code_challenge(verifier: &str) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(verifier.as_bytes());
    base64_url_encode(&hash)
}

/// Base64url encoding (no padding) per RFC 4648 §5.
fn base64_url_encode(data: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;

    fn provider_with_secret() -> GoogleProvider {
        let secret = ClientSecret::from_json(
            r#"{"installed": {"client_id": "cid.apps.googleusercontent.com", "client_secret": "shh"}}"#,
        )
        .unwrap();
        GoogleProvider::new(Some(secret)).unwrap()
    }

    #[test]
    fn test_code_verifier_length() {
        let v = generate_code_verifier();
        assert!(v.len() >= 43);
        assert!(v.len() <= 128);
    }

    #[test]
    fn test_code_challenge_deterministic() {
        let verifier = "test_verifier_string_for_determinism";
        let c1 = generate_code_challenge(verifier);
        let c2 = generate_code_challenge(verifier);
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_code_challenge_rfc7636_vector() {
        // RFC 7636 Appendix B
        let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_authorize_url() {
        let provider = provider_with_secret();
        let scopes = vec![
            "https://www.googleapis.com/auth/gmail.readonly".to_string(),
            "https://www.googleapis.com/auth/drive".to_string(),
        ];
        let url = provider
            .authorize_url(&scopes, "st4te", "chall", "http://127.0.0.1:8123")
            .unwrap();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=cid.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8123"));
        assert!(url.contains("state=st4te"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
    }

    #[test]
    fn test_authorize_url_requires_secret() {
        let provider = GoogleProvider::new(None).unwrap();
        let err = provider.authorize_url(&[], "s", "c", "http://127.0.0.1:1").unwrap_err();
        assert_eq!(err.code, ErrorCode::ClientSecretInvalid);
    }

    #[test]
    fn test_parse_token_response_success() {
        let body = r#"{
            "access_token": "ya29.test",
            "refresh_token": "1//0e.test",
            "token_type": "Bearer",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/gmail.readonly https://www.googleapis.com/auth/drive"
        }"#;

        let tokens = parse_token_response(body).unwrap();
        assert_eq!(tokens.access_token, "ya29.test");
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//0e.test"));
        assert_eq!(tokens.scopes.len(), 2);
        assert!(tokens.expiry > chrono::Utc::now());
    }

    #[test]
    fn test_parse_token_response_error() {
        let body = r#"{"error": "invalid_grant", "error_description": "Token has been revoked"}"#;
        assert!(parse_token_response(body).is_err());
    }

    #[test]
    fn test_token_endpoint_error_prefers_oauth_fields() {
        let err = token_endpoint_error(
            400,
            r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#,
        );
        assert!(err.message.contains("invalid_grant: Bad Request"));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let provider = provider_with_secret();
        let record = TokenRecord::default();
        let err = provider.refresh_token(&record).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenRefreshFailed);
    }
}
