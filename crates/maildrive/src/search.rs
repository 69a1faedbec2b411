//! Message Search
//!
//! Lists the messages Gmail matches for `subject:{keyword}` and fetches each
//! one in full, in listing order.

use maildrive_google::{AppResult, MailApi, Message};
use tracing::{debug, error, info};

/// Provider query for a subject keyword. The keyword is passed through
/// verbatim, so Gmail search operators inside it keep their meaning.
pub fn subject_query(keyword: &str) -> String {
    format!("subject:{}", keyword)
}

/// Case-insensitive substring match on the `Subject` header.
/// An empty keyword matches every message.
///
/// Stricter than Gmail's own `subject:` matching: a keyword carrying search
/// operators (`from:x`) or words Gmail matches out of order ("Invoice
/// March" against "Invoice for March") filters those messages out here.
pub fn subject_matches(message: &Message, keyword: &str) -> bool {
    if keyword.is_empty() {
        return true;
    }
    let needle = keyword.to_lowercase();
    message
        .subject()
        .is_some_and(|subject| subject.to_lowercase().contains(&needle))
}

/// Search and surface provider failures.
pub async fn try_search<M: MailApi>(mail: &M, keyword: &str) -> AppResult<Vec<Message>> {
    let query = subject_query(keyword);
    let refs = mail.list_message_ids(&query).await?;
    debug!("Query {:?} listed {} message(s)", query, refs.len());

    let mut messages = Vec::with_capacity(refs.len());
    for message_ref in refs {
        let message = mail.get_message(&message_ref.id).await?;
        if subject_matches(&message, keyword) {
            messages.push(message);
        } else {
            debug!("Dropping message {}: subject does not contain the keyword", message.id);
        }
    }

    info!("{} message(s) match subject keyword {:?}", messages.len(), keyword);
    Ok(messages)
}

/// Search, treating any provider failure as no results.
pub async fn search<M: MailApi>(mail: &M, keyword: &str) -> Vec<Message> {
    match try_search(mail, keyword).await {
        Ok(messages) => messages,
        Err(e) => {
            error!("Message search failed: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maildrive_google::google::types::Header;
    use maildrive_google::{AppError, AttachmentBody, MessagePart, MessageRef};
    use std::sync::Mutex;

    struct FixedMailbox {
        messages: Vec<Message>,
        fail_listing: bool,
        queries: Mutex<Vec<String>>,
    }

    impl FixedMailbox {
        fn new(subjects: &[&str]) -> Self {
            let messages = subjects
                .iter()
                .enumerate()
                .map(|(i, subject)| Message {
                    id: format!("m{}", i),
                    payload: MessagePart {
                        headers: vec![Header {
                            name: "Subject".to_string(),
                            value: subject.to_string(),
                        }],
                        ..Default::default()
                    },
                    ..Default::default()
                })
                .collect();
            Self {
                messages,
                fail_listing: false,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    impl MailApi for FixedMailbox {
        async fn list_message_ids(&self, query: &str) -> AppResult<Vec<MessageRef>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail_listing {
                return Err(AppError::api(500, "backend error"));
            }
            Ok(self
                .messages
                .iter()
                .map(|m| MessageRef {
                    id: m.id.clone(),
                    thread_id: String::new(),
                })
                .collect())
        }

        async fn get_message(&self, id: &str) -> AppResult<Message> {
            self.messages
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .ok_or_else(|| AppError::api(404, "Requested entity was not found."))
        }

        async fn get_attachment(&self, _: &str, _: &str) -> AppResult<AttachmentBody> {
            Err(AppError::api(404, "no attachments"))
        }
    }

    #[test]
    fn test_subject_query_is_verbatim() {
        assert_eq!(subject_query("Invoice March"), "subject:Invoice March");
        assert_eq!(subject_query(""), "subject:");
    }

    #[tokio::test]
    async fn test_filters_by_keyword() {
        let mailbox = FixedMailbox::new(&["Monthly REPORT", "Invoice", "report draft", ""]);
        let found = search(&mailbox, "Report").await;

        let ids: Vec<_> = found.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m0", "m2"]);
        assert_eq!(mailbox.queries.lock().unwrap().as_slice(), ["subject:Report"]);
    }

    #[tokio::test]
    async fn test_empty_keyword_keeps_everything() {
        let mailbox = FixedMailbox::new(&["a", "b", ""]);
        assert_eq!(search(&mailbox, "").await.len(), 3);
    }

    #[tokio::test]
    async fn test_provider_failure() {
        let mut mailbox = FixedMailbox::new(&["Report"]);
        mailbox.fail_listing = true;

        assert!(try_search(&mailbox, "Report").await.is_err());
        assert!(search(&mailbox, "Report").await.is_empty());
    }
}
