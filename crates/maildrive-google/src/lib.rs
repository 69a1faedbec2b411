//! Gmail and Google Drive plumbing for maildrive.
//!
//! - [`auth`] loads, refreshes and persists the OAuth token and runs the
//!   installed-app consent flow.
//! - [`google`] wraps the Gmail v1 and Drive v3 REST endpoints the tool uses
//!   behind the [`MailApi`] and [`StorageApi`] traits.

pub mod auth;
pub mod common;
pub mod google;

pub use auth::{obtain_credentials, AuthConfig};
pub use common::{AppError, AppResult, ErrorCode};
pub use google::{
    AttachmentBody, DriveApi, GmailApi, MailApi, Message, MessagePart, MessageRef, RemoteFile,
    StorageApi,
};
