//! Attachment Extractor
//!
//! Writes the attachments of one message into a local directory. Only the
//! immediate child parts of the payload are looked at; nested multipart
//! trees are not descended into.

use std::path::{Path, PathBuf};

use anyhow::Context;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use maildrive_google::{MailApi, Message, MessagePart};
use tracing::{debug, info, warn};

/// URL-safe alphabet, accepting input with or without `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A part is an attachment when it names a file and references a body.
pub fn is_attachment(part: &MessagePart) -> bool {
    !part.filename.is_empty() && part.attachment_id().is_some()
}

pub fn decode_attachment_data(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_LENIENT.decode(data)
}

/// Final path component of an attachment filename. Both `/` and `\` count as
/// separators; `None` when nothing usable remains.
pub fn local_name(filename: &str) -> Option<&str> {
    filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// Parts of `message` that carry an attachment, in order.
pub fn attachment_parts(message: &Message) -> impl Iterator<Item = &MessagePart> {
    message.parts().iter().filter(|part| is_attachment(part))
}

/// Fetch, decode and write one attachment part into `target_dir`. Returns
/// `None` for a part that is not an attachment or has no usable file name.
pub async fn write_attachment<M: MailApi>(
    mail: &M,
    message: &Message,
    part: &MessagePart,
    target_dir: &Path,
) -> anyhow::Result<Option<PathBuf>> {
    let Some(attachment_id) = part.attachment_id().filter(|_| is_attachment(part)) else {
        return Ok(None);
    };
    let Some(name) = local_name(&part.filename) else {
        warn!(
            "Skipping attachment {:?} of message {}: no usable file name",
            part.filename, message.id
        );
        return Ok(None);
    };

    let body = mail
        .get_attachment(&message.id, attachment_id)
        .await
        .with_context(|| format!("failed to fetch attachment '{}' of message {}", part.filename, message.id))?;
    let bytes = decode_attachment_data(&body.data)
        .with_context(|| format!("attachment '{}' of message {} is not valid base64", part.filename, message.id))?;

    tokio::fs::create_dir_all(target_dir)
        .await
        .with_context(|| format!("failed to create {}", target_dir.display()))?;
    let path = target_dir.join(name);
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    debug!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(Some(path))
}

/// Fetch, decode and write every attachment of `message` into `target_dir`,
/// returning the written paths in part order. A later file with the same
/// name overwrites an earlier one, so callers that need every body must
/// consume each file before the next is written (see [`write_attachment`]).
pub async fn extract_and_write<M: MailApi>(
    mail: &M,
    message: &Message,
    target_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for part in attachment_parts(message) {
        if let Some(path) = write_attachment(mail, message, part, target_dir).await? {
            written.push(path);
        }
    }

    info!("Extracted {} attachment(s) from message {}", written.len(), message.id);
    Ok(written)
}
