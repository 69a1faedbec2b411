//! Credential Manager
//!
//! Produces an access token good for both Gmail (read-only) and Drive:
//! the cached token when still valid, else a refreshed one, else one from
//! the interactive consent flow. Every newly acquired or refreshed token is
//! written back to the cache before it is used.

pub mod client_secret;
pub mod consent;
pub mod provider;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use self::client_secret::{ClientSecret, DEFAULT_TOKEN_URI};
use self::provider::google::GoogleProvider;
use self::provider::{OAuthProvider, OAuthTokens};
use self::store::TokenCache;
use crate::common::AppResult;
use crate::google::{DriveApi, GmailApi};

/// Read-only mail access
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
/// Full storage access
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Tokens within this many seconds of expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

// ── Public types ────────────────────────────────────────────────────────────

/// Cached credential, in the Google "authorized user" file layout.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct TokenRecord {
    #[serde(rename = "token", alias = "access_token", default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    #[zeroize(skip)]
    pub token_uri: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub scopes: Vec<String>,
    #[serde(default)]
    #[zeroize(skip)]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl Default for TokenRecord {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            refresh_token: String::new(),
            token_uri: default_token_uri(),
            client_id: String::new(),
            client_secret: String::new(),
            scopes: Vec::new(),
            expiry: None,
        }
    }
}

// Custom Debug implementation that redacts sensitive fields
impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl TokenRecord {
    /// Build a record from a fresh token exchange.
    fn from_tokens(tokens: OAuthTokens, secret: Option<&ClientSecret>, requested: &[String]) -> Self {
        let mut record = Self::default();
        record.apply(tokens);
        if record.scopes.is_empty() {
            record.scopes = requested.to_vec();
        }
        if let Some(secret) = secret {
            record.client_id = secret.client_id.clone();
            record.client_secret = secret.client_secret.clone();
            record.token_uri = secret.token_uri.clone();
        }
        record
    }

    /// Merge a refresh response. A missing refresh token keeps the old one.
    fn apply(&mut self, tokens: OAuthTokens) {
        self.access_token = tokens.access_token;
        if let Some(rt) = tokens.refresh_token {
            self.refresh_token = rt;
        }
        self.expiry = Some(tokens.expiry);
        if !tokens.scopes.is_empty() {
            self.scopes = tokens.scopes;
        }
    }

    /// True when the access token expires within `margin_secs` from now.
    /// A record without an expiry never counts as expiring.
    pub fn is_expiring(&self, margin_secs: i64) -> bool {
        match self.expiry {
            Some(exp) => exp.signed_duration_since(Utc::now()).num_seconds() < margin_secs,
            None => false,
        }
    }

    /// True when every required scope was granted. Records without a scope
    /// list are assumed to cover the request.
    pub fn covers(&self, required: &[String]) -> bool {
        self.scopes.is_empty() || required.iter().all(|s| self.scopes.contains(s))
    }

    /// Usable as-is for the required scopes.
    pub fn is_valid(&self, required: &[String]) -> bool {
        !self.access_token.is_empty()
            && self.covers(required)
            && !self.is_expiring(EXPIRY_MARGIN_SECS)
    }
}

/// Where credentials live on disk
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Client-secret file downloaded from the Cloud console
    pub client_secret_path: PathBuf,
    /// Token cache, created on first consent
    pub token_cache_path: PathBuf,
    pub scopes: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_secret_path: PathBuf::from("credentials.json"),
            token_cache_path: PathBuf::from("token.json"),
            scopes: default_scopes(),
        }
    }
}

pub fn default_scopes() -> Vec<String> {
    vec![GMAIL_READONLY_SCOPE.to_string(), DRIVE_SCOPE.to_string()]
}

// ── Credential Manager ──────────────────────────────────────────────────────

pub struct CredentialManager<P: OAuthProvider> {
    provider: P,
    cache: TokenCache,
    scopes: Vec<String>,
}

impl<P: OAuthProvider> CredentialManager<P> {
    pub fn new(provider: P, cache: TokenCache, scopes: Vec<String>) -> Self {
        Self {
            provider,
            cache,
            scopes,
        }
    }

    /// Return a valid token, refreshing or re-authorizing as needed.
    pub async fn acquire(&self) -> AppResult<TokenRecord> {
        let cached = self.cache.load()?;

        if let Some(record) = cached {
            if record.is_valid(&self.scopes) {
                info!("Using cached token from {:?}", self.cache.path());
                return Ok(record);
            }

            if !record.refresh_token.is_empty() && record.covers(&self.scopes) {
                let mut record = record;
                let tokens = self.provider.refresh_token(&record).await?;
                record.apply(tokens);
                self.cache.save(&record)?;
                info!("Refreshed {} token", self.provider.name());
                return Ok(record);
            }

            warn!("Cached token cannot be refreshed for the requested scopes; re-authorizing");
        }

        let tokens = consent::run_consent_flow(&self.provider, &self.scopes).await?;
        let record = TokenRecord::from_tokens(tokens, self.provider.client_secret(), &self.scopes);
        self.cache.save(&record)?;
        info!("Authorized new {} token", self.provider.name());
        Ok(record)
    }
}

/// Authenticate and build one client per API.
pub async fn obtain_credentials(config: &AuthConfig) -> AppResult<(GmailApi, DriveApi)> {
    let secret = ClientSecret::load(&config.client_secret_path)?;
    let provider = GoogleProvider::new(secret)?;
    let manager = CredentialManager::new(
        provider,
        TokenCache::new(&config.token_cache_path),
        config.scopes.clone(),
    );

    let record = manager.acquire().await?;

    let gmail = GmailApi::new(record.access_token.clone())?;
    let drive = DriveApi::new(record.access_token.clone())?;
    Ok((gmail, drive))
}
