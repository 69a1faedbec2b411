//! Orchestrator
//!
//! One linear run: authenticate, ask for the subject keyword, search, then
//! write each attachment of every message and upload it before the next.
//! The staging directory is removed at the end whether or not the loop
//! succeeded.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use maildrive_google::{AuthConfig, MailApi, Message, StorageApi};
use tracing::{debug, error, info, warn};

use crate::extract::{attachment_parts, write_attachment};
use crate::search::try_search;
use crate::session::Session;
use crate::staging::remove_staging_dir;
use crate::upload::{upload, DuplicatePolicy, UploadOutcome};

/// Drive folder attachments land in unless overridden.
pub const DEFAULT_FOLDER_ID: &str = "1hiNvdy7UuGgV55ra2JpaJbnAWkMewCkj";
pub const DEFAULT_STAGING_DIR: &str = "pasta_temporaria";
pub const PROMPT: &str = "Paste the email subject to upload its attachments to Google Drive: ";

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub staging_dir: PathBuf,
    /// `None` uploads to the Drive root
    pub folder_id: Option<String>,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            folder_id: Some(DEFAULT_FOLDER_ID.to_string()),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Authenticating,
    Prompting,
    Searching,
    NoMatches,
    Extracting,
    Uploading,
    Cleanup,
    Done,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::Authenticating => "authenticating",
            Stage::Prompting => "prompting",
            Stage::Searching => "searching",
            Stage::NoMatches => "no_matches",
            Stage::Extracting => "extracting",
            Stage::Uploading => "uploading",
            Stage::Cleanup => "cleanup",
            Stage::Done => "done",
        }
    }

    fn enter(self) {
        debug!(stage = self.as_str(), "entering stage");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The search succeeded and nothing matched.
    NoMatches,
    /// The provider failed; reported to the user like an empty result.
    SearchFailed,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub messages_found: usize,
    pub attachments_extracted: usize,
    pub uploads_created: usize,
    pub uploads_skipped: usize,
}

impl RunReport {
    fn new(outcome: RunOutcome) -> Self {
        Self {
            outcome,
            messages_found: 0,
            attachments_extracted: 0,
            uploads_created: 0,
            uploads_skipped: 0,
        }
    }
}

/// Show the prompt and read one line. Only the line terminator is removed;
/// an empty answer is accepted.
pub fn prompt_keyword<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> anyhow::Result<String> {
    write!(out, "{}", PROMPT)?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).context("failed to read the subject keyword")?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(line)
}

/// Everything after authentication and prompting.
pub async fn run_pipeline<M: MailApi, S: StorageApi, W: Write>(
    session: &Session<M, S>,
    keyword: &str,
    settings: &RunSettings,
    out: &mut W,
) -> anyhow::Result<RunReport> {
    Stage::Searching.enter();
    let (messages, outcome) = match try_search(session.mail(), keyword).await {
        Ok(messages) => (messages, RunOutcome::NoMatches),
        Err(e) => {
            error!("Message search failed: {}", e);
            writeln!(out, "An error occurred: {}", e)?;
            (Vec::new(), RunOutcome::SearchFailed)
        }
    };

    if messages.is_empty() {
        Stage::NoMatches.enter();
        writeln!(out, "No emails found with subject '{}'.", keyword)?;
        return Ok(RunReport::new(outcome));
    }

    writeln!(out, "{} email(s) found with subject containing '{}'.", messages.len(), keyword)?;

    let mut report = RunReport::new(RunOutcome::Completed);
    report.messages_found = messages.len();

    let result = transfer_all(session, &messages, settings, out, &mut report).await;

    Stage::Cleanup.enter();
    let cleanup = remove_staging_dir(&settings.staging_dir).await;
    match (result, cleanup) {
        (Err(e), Err(cleanup_err)) => {
            warn!("Failed to remove {:?}: {}", settings.staging_dir, cleanup_err);
            return Err(e);
        }
        (Err(e), Ok(_)) => return Err(e),
        (Ok(()), Err(cleanup_err)) => {
            return Err(cleanup_err)
                .with_context(|| format!("failed to remove {}", settings.staging_dir.display()));
        }
        (Ok(()), Ok(_)) => {}
    }

    writeln!(out, "Files saved, program finished!")?;
    Stage::Done.enter();
    info!(
        "Run finished: {} message(s), {} attachment(s), {} uploaded, {} skipped",
        report.messages_found, report.attachments_extracted, report.uploads_created, report.uploads_skipped
    );
    Ok(report)
}

/// Write then upload, one attachment at a time, so a later attachment with
/// the same name cannot replace a file before it has been uploaded. Stops at
/// the first error.
async fn transfer_all<M: MailApi, S: StorageApi, W: Write>(
    session: &Session<M, S>,
    messages: &[Message],
    settings: &RunSettings,
    out: &mut W,
    report: &mut RunReport,
) -> anyhow::Result<()> {
    for message in messages {
        for part in attachment_parts(message) {
            Stage::Extracting.enter();
            let Some(path) =
                write_attachment(session.mail(), message, part, &settings.staging_dir).await?
            else {
                continue;
            };
            report.attachments_extracted += 1;

            Stage::Uploading.enter();
            let outcome = upload(
                session.storage(),
                &path,
                settings.folder_id.as_deref(),
                settings.duplicate_policy,
            )
            .await?;

            match &outcome {
                UploadOutcome::Created(file) => {
                    report.uploads_created += 1;
                    writeln!(out, "Uploaded '{}' to Drive.", file.name)?;
                }
                UploadOutcome::Skipped(file) => {
                    report.uploads_skipped += 1;
                    writeln!(out, "Skipped '{}': already in Drive folder.", file.name)?;
                }
            }
        }
        debug!("Finished message {}", message.id);
    }
    Ok(())
}

/// The whole run against the real providers.
pub async fn run<R: BufRead, W: Write>(
    auth: &AuthConfig,
    subject: Option<String>,
    settings: &RunSettings,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<RunReport> {
    Stage::Authenticating.enter();
    let session = Session::authenticate(auth)
        .await
        .context("authentication failed")?;

    Stage::Prompting.enter();
    let keyword = match subject {
        Some(subject) => subject,
        None => prompt_keyword(input, out)?,
    };

    run_pipeline(&session, &keyword, settings, out).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_strips_line_ending_only() {
        let mut out = Vec::new();
        let keyword = prompt_keyword(&mut Cursor::new("  Invoice March \r\nignored\n"), &mut out).unwrap();
        assert_eq!(keyword, "  Invoice March ");
        assert_eq!(String::from_utf8(out).unwrap(), PROMPT);
    }

    #[test]
    fn test_prompt_accepts_empty_and_eof() {
        let mut out = Vec::new();
        assert_eq!(prompt_keyword(&mut Cursor::new("\n"), &mut out).unwrap(), "");
        assert_eq!(prompt_keyword(&mut Cursor::new(""), &mut out).unwrap(), "");
    }

    #[test]
    fn test_default_settings() {
        let settings = RunSettings::default();
        assert_eq!(settings.staging_dir, PathBuf::from("pasta_temporaria"));
        assert_eq!(settings.folder_id.as_deref(), Some(DEFAULT_FOLDER_ID));
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::AlwaysCreate);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::NoMatches.as_str(), "no_matches");
        assert_eq!(Stage::Cleanup.as_str(), "cleanup");
    }
}
