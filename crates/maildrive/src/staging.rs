//! Staging Directory

use std::io;
use std::path::Path;

use tracing::debug;

/// Remove the staging directory with everything in it, including files this
/// run did not create. Returns whether there was anything to remove.
pub async fn remove_staging_dir(dir: &Path) -> io::Result<bool> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!("Removed staging directory {:?}", dir);
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
