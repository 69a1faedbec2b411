//! Google API Client Module
//!
//! Authenticated access to the two Google APIs maildrive talks to. The
//! pipeline only sees the [`MailApi`] and [`StorageApi`] traits, so tests can
//! stand in for Gmail and Drive.

pub mod client;
pub mod common;
pub mod drive;
pub mod gmail;
pub mod types;

use std::path::Path;

use crate::common::AppResult;

pub use drive::DriveApi;
pub use gmail::GmailApi;
pub use types::{AttachmentBody, Message, MessagePart, MessageRef, RemoteFile};

/// Macro to implement the standard Google API wrapper constructor pattern.
/// Each API struct wraps a `GoogleClient` and provides `new(access_token)`.
macro_rules! google_api_wrapper {
    ($name:ident) => {
        impl $name {
            /// Create a new API client with an OAuth access token
            pub fn new(access_token: String) -> $crate::common::AppResult<Self> {
                let client = $crate::google::client::GoogleClient::new(access_token)?;
                Ok(Self { client })
            }
        }
    };
}

pub(crate) use google_api_wrapper;

/// Read-only mailbox operations.
#[allow(async_fn_in_trait)]
pub trait MailApi {
    /// Identifiers of the messages matching a provider search query.
    async fn list_message_ids(&self, query: &str) -> AppResult<Vec<MessageRef>>;

    /// Full detail of one message.
    async fn get_message(&self, id: &str) -> AppResult<Message>;

    /// Body of one attachment, still base64url-encoded.
    async fn get_attachment(&self, message_id: &str, attachment_id: &str)
        -> AppResult<AttachmentBody>;
}

/// File storage operations.
#[allow(async_fn_in_trait)]
pub trait StorageApi {
    /// Create a new remote file named `name` with the contents of `local_path`.
    /// Never checks for an existing file of the same name.
    async fn create_file(
        &self,
        local_path: &Path,
        name: &str,
        parent_id: Option<&str>,
    ) -> AppResult<RemoteFile>;

    /// First non-trashed file named exactly `name` under `parent_id`
    /// (or anywhere, when `parent_id` is `None`).
    async fn find_file(&self, name: &str, parent_id: Option<&str>) -> AppResult<Option<RemoteFile>>;
}
