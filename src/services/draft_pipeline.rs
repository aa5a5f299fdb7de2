//! Reply drafting and filing for a single inquiry email.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{AccessToken, EmailId, FolderId};
use crate::providers::mail::MailTransport;

/// What happened to one email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    /// Draft created and moved; the original was kept.
    Filed,
    /// Draft created and moved; the original was deleted.
    FiledAndDeleted,
    /// The reply draft could not be created.
    DraftFailed,
    /// The draft was created but not moved; it stays in the drafts folder.
    MoveFailed,
    /// Draft created and moved, but deleting the original failed.
    DeleteFailed,
}

impl FileOutcome {
    /// Returns true if the draft reached its target folder.
    pub fn is_filed(&self) -> bool {
        matches!(
            self,
            FileOutcome::Filed | FileOutcome::FiledAndDeleted | FileOutcome::DeleteFailed
        )
    }
}

/// Creates reply drafts, moves them into cohort folders and optionally
/// deletes the originals.
#[derive(Clone)]
pub struct DraftPipeline {
    mail: Arc<dyn MailTransport>,
}

impl DraftPipeline {
    /// Creates a pipeline over a mail transport.
    pub fn new(mail: Arc<dyn MailTransport>) -> Self {
        Self { mail }
    }

    /// Drafts a reply to `email_id` with `template` as its body and files it
    /// into `folder_id`.
    ///
    /// The original is deleted only when `delete_original` is set and the
    /// draft reached the folder. Failures are logged and returned as an
    /// outcome; nothing is rolled back.
    pub async fn file_reply(
        &self,
        token: &AccessToken,
        email_id: &EmailId,
        folder_id: &FolderId,
        template: &str,
        delete_original: bool,
    ) -> FileOutcome {
        let draft_id = match self.mail.create_reply(token, email_id, template).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(email_id = %email_id, error = %e, "failed to create reply draft");
                return FileOutcome::DraftFailed;
            }
        };

        if let Err(e) = self.mail.move_message(token, &draft_id, folder_id).await {
            tracing::error!(
                email_id = %email_id,
                draft_id = %draft_id,
                folder_id = %folder_id,
                error = %e,
                "failed to move reply draft"
            );
            return FileOutcome::MoveFailed;
        }
        tracing::info!(email_id = %email_id, folder_id = %folder_id, "reply draft created and moved");

        if !delete_original {
            return FileOutcome::Filed;
        }

        match self.mail.delete_message(token, email_id).await {
            Ok(()) => {
                tracing::info!(email_id = %email_id, "original email deleted");
                FileOutcome::FiledAndDeleted
            }
            Err(e) => {
                tracing::error!(email_id = %email_id, error = %e, "failed to delete original email");
                FileOutcome::DeleteFailed
            }
        }
    }
}
