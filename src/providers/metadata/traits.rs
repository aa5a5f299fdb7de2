//! Metadata gateway trait definition.
//!
//! The gateway fronts the external store that holds per-email profile text,
//! property names, grouping keys and ratings. Every operation swallows
//! transport failures and reports absence instead, so callers only ever see
//! `None` or an empty list.

use async_trait::async_trait;

use crate::domain::{EmailId, EmailRecord, ProfileSnapshot};

/// Read-only access to inquiry metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataGateway: Send + Sync {
    /// Fetches profile text, property name and grouping key in one round.
    ///
    /// Returns `None` if the id is blank or any of the three lookups fails.
    async fn fetch_profile(&self, email_id: &EmailId) -> Option<ProfileSnapshot>;

    /// Fetches only the grouping key for an email.
    async fn fetch_folder_name(&self, email_id: &EmailId) -> Option<String>;

    /// Fetches every rated email filed under a grouping key.
    ///
    /// Returns an empty list on any failure.
    async fn fetch_emails_by_folder(&self, folder_name: &str) -> Vec<EmailRecord>;
}
