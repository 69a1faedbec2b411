//! OAuth Provider Abstraction
//!
//! The credential manager talks to the authorization server only through
//! [`OAuthProvider`], so refresh and consent can be exercised without Google.

pub mod google;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client_secret::ClientSecret;
use super::TokenRecord;
use crate::common::AppResult;

/// Tokens returned from an OAuth token exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expiry: DateTime<Utc>,
    pub scopes: Vec<String>,
}

/// OAuth provider trait.
///
/// Each provider implements authorization URL construction, token exchange
/// and token refresh.
#[allow(async_fn_in_trait)]
pub trait OAuthProvider {
    /// Provider name (e.g. "google")
    fn name(&self) -> &str;

    /// Application credentials, when a client-secret file was loaded.
    fn client_secret(&self) -> Option<&ClientSecret>;

    /// Build the authorization URL for the PKCE flow.
    fn authorize_url(
        &self,
        scopes: &[String],
        state: &str,
        code_challenge: &str,
        redirect_uri: &str,
    ) -> AppResult<String>;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> AppResult<OAuthTokens>;

    /// Refresh the access token of a stored record.
    async fn refresh_token(&self, record: &TokenRecord) -> AppResult<OAuthTokens>;
}
