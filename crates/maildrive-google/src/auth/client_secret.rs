//! Client Secret File
//!
//! The OAuth client downloaded from the Google Cloud console. Both the
//! desktop (`"installed"`) and web (`"web"`) layouts are accepted.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::common::{AppError, AppResult};

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

#[derive(Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecret")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ClientSecret {
    pub fn from_json(json: &str) -> AppResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .map_err(|e| AppError::client_secret_invalid(format!("Failed to parse client secret: {}", e)))?;

        let secret = file.installed.or(file.web).ok_or_else(|| {
            AppError::client_secret_invalid("Client secret has neither an \"installed\" nor a \"web\" section")
        })?;

        if secret.client_id.trim().is_empty() {
            return Err(AppError::client_secret_invalid("Client secret has an empty client_id"));
        }
        Ok(secret)
    }

    /// Read the client-secret file. A missing file is `Ok(None)`: it is only
    /// required when the consent flow has to run.
    pub fn load(path: &Path) -> AppResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::client_secret_invalid(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json).map(Some)
    }
}
