//! Token Cache
//!
//! Single-file token storage (`token.json` by default), in the Google
//! "authorized user" JSON layout. Read once at startup and rewritten after
//! every acquisition or refresh.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::TokenRecord;
use crate::common::{AppError, AppResult};

pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token. `Ok(None)` when no cache file exists; an
    /// unreadable or unparseable file is an error.
    pub fn load(&self) -> AppResult<Option<TokenRecord>> {
        if !self.path.exists() {
            debug!("No token cache at {:?}", self.path);
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path).map_err(|e| {
            AppError::token_cache_invalid(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let record: TokenRecord = serde_json::from_str(&data).map_err(|e| {
            AppError::token_cache_invalid(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        Ok(Some(record))
    }

    /// Write the token, replacing any previous cache.
    pub fn save(&self, record: &TokenRecord) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, json)?;
        restrict_permissions(&self.path)?;

        info!("Saved token to {:?}", self.path);
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> AppResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> AppResult<()> {
    Ok(())
}
