//! Mail-transport trait definition.
//!
//! This module defines the [`MailTransport`] trait covering the handful of
//! mailbox calls triage needs: folder listing and creation, reply drafts,
//! moves and deletes. Every call takes the caller's bearer token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{AccessToken, EmailId, FolderId};
use crate::providers::Result;

/// A mailbox folder as listed by the mail API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailFolder {
    /// Backend-assigned folder id.
    pub id: FolderId,
    /// Display name shown to the user.
    pub display_name: String,
}

impl MailFolder {
    /// Creates a folder entry.
    pub fn new(id: impl Into<FolderId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Trait for mailbox mutation backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Lists every mail folder of the signed-in user.
    async fn list_folders(&self, token: &AccessToken) -> Result<Vec<MailFolder>>;

    /// Creates a top-level folder and returns its id.
    async fn create_folder(&self, token: &AccessToken, display_name: &str) -> Result<FolderId>;

    /// Creates a reply draft on `message_id` with `comment` as its body.
    ///
    /// # Returns
    ///
    /// The id of the new draft.
    async fn create_reply(
        &self,
        token: &AccessToken,
        message_id: &EmailId,
        comment: &str,
    ) -> Result<EmailId>;

    /// Moves a message into `destination`.
    ///
    /// # Returns
    ///
    /// The id of the message in its new folder.
    async fn move_message(
        &self,
        token: &AccessToken,
        message_id: &EmailId,
        destination: &FolderId,
    ) -> Result<EmailId>;

    /// Deletes a message.
    async fn delete_message(&self, token: &AccessToken, message_id: &EmailId) -> Result<()>;
}
