//! Storage Uploader

use std::path::Path;

use anyhow::Context;
use maildrive_google::{RemoteFile, StorageApi};
use tracing::info;

/// What to do when the destination already holds a file with the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Upload regardless; Drive keeps both files.
    #[default]
    AlwaysCreate,
    /// Look the name up first and leave an existing file alone.
    SkipExisting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Created(RemoteFile),
    Skipped(RemoteFile),
}

impl UploadOutcome {
    pub fn file(&self) -> &RemoteFile {
        match self {
            UploadOutcome::Created(file) | UploadOutcome::Skipped(file) => file,
        }
    }

    /// Remote identifier of the uploaded or already present file.
    pub fn id(&self) -> &str {
        &self.file().id
    }
}

/// Upload `local_path` under its base name into `parent_id` (or the root).
pub async fn upload<S: StorageApi>(
    storage: &S,
    local_path: &Path,
    parent_id: Option<&str>,
    policy: DuplicatePolicy,
) -> anyhow::Result<UploadOutcome> {
    let name = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", local_path.display()))?;

    if policy == DuplicatePolicy::SkipExisting {
        let existing = storage
            .find_file(name, parent_id)
            .await
            .with_context(|| format!("failed to look up '{}' in Drive", name))?;
        if let Some(file) = existing {
            info!("'{}' already exists as {}; not uploading", name, file.id);
            return Ok(UploadOutcome::Skipped(file));
        }
    }

    let file = storage
        .create_file(local_path, name, parent_id)
        .await
        .with_context(|| format!("failed to upload '{}' to Drive", name))?;
    Ok(UploadOutcome::Created(file))
}
