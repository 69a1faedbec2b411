//! Gmail attachments to Google Drive.
//!
//! Searches the mailbox by subject keyword, writes the attachments of every
//! matching message into a staging directory, uploads each one to a Drive
//! folder and removes the staging directory when done.
//!
//! The workflow is generic over [`MailApi`](maildrive_google::MailApi) and
//! [`StorageApi`](maildrive_google::StorageApi); the binary drives it with
//! the Gmail and Drive clients from `maildrive-google`.

pub mod extract;
pub mod run;
pub mod search;
pub mod session;
pub mod staging;
pub mod upload;

pub use run::{run, run_pipeline, RunOutcome, RunReport, RunSettings};
pub use session::Session;
pub use upload::{DuplicatePolicy, UploadOutcome};
