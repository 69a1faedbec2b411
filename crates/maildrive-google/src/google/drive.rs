//! Google Drive API v3 Client
//!
//! - Resumable file creation, optionally inside a parent folder
//! - Lookup of an existing file by exact name

use std::io::SeekFrom;
use std::path::Path;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

use super::client::{ChunkStatus, GoogleClient};
use super::common::drive_query_literal;
use super::types::{FileList, RemoteFile};
use super::StorageApi;
use crate::common::{AppError, AppResult};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields requested for every file record
const FILE_FIELDS: &str = "id,name,parents";

/// Resumable chunks must be a multiple of 256 KiB.
const CHUNK_SIZE: u64 = 32 * 256 * 1024;

pub struct DriveApi {
    client: GoogleClient,
}

super::google_api_wrapper!(DriveApi);

impl DriveApi {
    /// Upload a local file as a new Drive file using the resumable protocol.
    ///
    /// The MIME type is left for Drive to detect from name and content.
    pub async fn create_file_resumable(
        &self,
        local_path: &Path,
        name: &str,
        parent_id: Option<&str>,
    ) -> AppResult<RemoteFile> {
        info!("Uploading {:?} to Drive as '{}'", local_path, name);

        let mut file = tokio::fs::File::open(local_path).await?;
        let total = file.metadata().await?.len();

        let session_uri = self
            .client
            .start_resumable_upload(
                &format!("{}/files", DRIVE_UPLOAD_BASE),
                &[
                    ("uploadType", "resumable".to_string()),
                    ("fields", FILE_FIELDS.to_string()),
                ],
                &file_metadata(name, parent_id),
                total,
            )
            .await?;

        if total == 0 {
            return match self.client.upload_chunk(&session_uri, Vec::new(), "bytes */0").await? {
                ChunkStatus::Complete(value) => Ok(serde_json::from_value(value)?),
                ChunkStatus::Incomplete { .. } => Err(AppError::invalid_response(
                    "Drive did not finalize an empty upload",
                )),
            };
        }

        let mut offset = 0u64;
        loop {
            let len = CHUNK_SIZE.min(total - offset) as usize;
            let mut chunk = vec![0u8; len];
            file.read_exact(&mut chunk).await?;

            let range = content_range(offset, len as u64, total);
            match self.client.upload_chunk(&session_uri, chunk, &range).await? {
                ChunkStatus::Complete(value) => {
                    let remote: RemoteFile = serde_json::from_value(value)?;
                    info!("Created Drive file {} ('{}')", remote.id, remote.name);
                    return Ok(remote);
                }
                ChunkStatus::Incomplete { next_offset } => {
                    let next = resume_offset(offset, len as u64, next_offset, total)?;
                    if next != offset + len as u64 {
                        debug!("Drive kept {} bytes; resuming from there", next);
                        file.seek(SeekFrom::Start(next)).await?;
                    }
                    offset = next;
                }
            }
        }
    }

    /// Find a non-trashed file by exact name, optionally inside a folder.
    pub async fn find_by_name(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> AppResult<Option<RemoteFile>> {
        debug!("Looking up Drive file '{}'", name);

        let url = format!("{}/files", DRIVE_API_BASE);
        let query = [
            ("q", name_query(name, parent_id)),
            ("fields", format!("files({})", FILE_FIELDS)),
            ("pageSize", "1".to_string()),
            ("spaces", "drive".to_string()),
        ];
        let list: FileList = self.client.get(&url, &query).await?;

        Ok(list.files.into_iter().next())
    }
}

impl StorageApi for DriveApi {
    async fn create_file(
        &self,
        local_path: &Path,
        name: &str,
        parent_id: Option<&str>,
    ) -> AppResult<RemoteFile> {
        self.create_file_resumable(local_path, name, parent_id).await
    }

    async fn find_file(&self, name: &str, parent_id: Option<&str>) -> AppResult<Option<RemoteFile>> {
        self.find_by_name(name, parent_id).await
    }
}

fn file_metadata(name: &str, parent_id: Option<&str>) -> serde_json::Value {
    match parent_id {
        Some(parent) => json!({ "name": name, "parents": [parent] }),
        None => json!({ "name": name }),
    }
}

/// Where the next chunk starts after Drive acknowledged `acked` bytes of a
/// chunk that covered `offset..offset + len`. The offset has to advance and
/// stay short of `total`; a completed upload answers with the file instead.
fn resume_offset(offset: u64, len: u64, acked: u64, total: u64) -> AppResult<u64> {
    if acked >= total {
        return Err(AppError::invalid_response(
            "Drive reported all bytes received but did not finalize the upload",
        ));
    }
    if acked <= offset || acked > offset + len {
        return Err(AppError::invalid_response(format!(
            "Drive acknowledged {} bytes after a chunk at {}..{}; upload is not progressing",
            acked,
            offset,
            offset + len
        )));
    }
    Ok(acked)
}

fn content_range(offset: u64, len: u64, total: u64) -> String {
    format!("bytes {}-{}/{}", offset, offset + len - 1, total)
}

fn name_query(name: &str, parent_id: Option<&str>) -> String {
    let mut q = format!("name = {} and trashed = false", drive_query_literal(name));
    if let Some(parent) = parent_id {
        q.push_str(&format!(" and {} in parents", drive_query_literal(parent)));
    }
    q
}
