//! Gmail API v1 Client
//!
//! Read-only subset used by maildrive:
//! - List messages matching a search query (first page only)
//! - Get a full message
//! - Get an attachment body

use super::client::GoogleClient;
use super::types::{AttachmentBody, ListMessagesResponse, Message, MessageRef};
use super::MailApi;
use crate::common::AppResult;
use tracing::{debug, info};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

pub struct GmailApi {
    client: GoogleClient,
}

super::google_api_wrapper!(GmailApi);

impl GmailApi {
    /// List messages matching a query
    ///
    /// # Arguments
    /// * `query` - Gmail search query (same syntax as web UI), passed verbatim
    ///
    /// # Returns
    /// Message references (id and threadId) from the first result page
    pub async fn list_messages(&self, query: &str) -> AppResult<Vec<MessageRef>> {
        info!("Listing Gmail messages");

        let url = format!("{}/users/me/messages", GMAIL_API_BASE);
        let response: ListMessagesResponse =
            self.client.get(&url, &[("q", query.to_string())]).await?;

        if response.next_page_token.is_some() {
            debug!("More results available; only the first page is processed");
        }
        debug!("Retrieved {} messages", response.messages.len());
        Ok(response.messages)
    }

    /// Get a full message by ID (`format=full`)
    pub async fn get_message(&self, id: &str) -> AppResult<Message> {
        info!("Fetching Gmail message: {}", id);

        let url = format!("{}/users/me/messages/{}", GMAIL_API_BASE, id);
        self.client
            .get(&url, &[("format", "full".to_string())])
            .await
    }

    /// Get the body of one attachment
    pub async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> AppResult<AttachmentBody> {
        debug!("Fetching attachment of message {}", message_id);

        let url = format!(
            "{}/users/me/messages/{}/attachments/{}",
            GMAIL_API_BASE, message_id, attachment_id
        );
        self.client.get(&url, &[]).await
    }
}

impl MailApi for GmailApi {
    async fn list_message_ids(&self, query: &str) -> AppResult<Vec<MessageRef>> {
        self.list_messages(query).await
    }

    async fn get_message(&self, id: &str) -> AppResult<Message> {
        GmailApi::get_message(self, id).await
    }

    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> AppResult<AttachmentBody> {
        GmailApi::get_attachment(self, message_id, attachment_id).await
    }
}
