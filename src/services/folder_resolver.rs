//! Find-or-create resolution of mailbox folders by display name.
//!
//! Resolution is not locked: two concurrent calls for a name that does not
//! exist yet can both create it. Triage resolves each of its two distinct
//! names once per run, so this is tolerated.

use std::sync::Arc;

use crate::domain::{AccessToken, FolderId};
use crate::providers::mail::MailTransport;

/// Outcome of resolving a folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderResolution {
    /// A folder with that exact name already existed.
    Found(FolderId),
    /// No folder matched, so one was created.
    Created(FolderId),
    /// Listing or creation failed; the folder is unavailable.
    Failed,
}

impl FolderResolution {
    /// The resolved id, unless resolution failed.
    pub fn id(&self) -> Option<&FolderId> {
        match self {
            FolderResolution::Found(id) | FolderResolution::Created(id) => Some(id),
            FolderResolution::Failed => None,
        }
    }

    /// Consumes the resolution, returning the id unless it failed.
    pub fn into_id(self) -> Option<FolderId> {
        match self {
            FolderResolution::Found(id) | FolderResolution::Created(id) => Some(id),
            FolderResolution::Failed => None,
        }
    }
}

/// Resolves folder display names against the mailbox.
#[derive(Clone)]
pub struct FolderResolver {
    mail: Arc<dyn MailTransport>,
}

impl FolderResolver {
    /// Creates a resolver over a mail transport.
    pub fn new(mail: Arc<dyn MailTransport>) -> Self {
        Self { mail }
    }

    /// Returns the folder named exactly `display_name`, creating it if absent.
    ///
    /// Matching is case-sensitive. Transport errors are logged and reported
    /// as [`FolderResolution::Failed`].
    pub async fn resolve(&self, token: &AccessToken, display_name: &str) -> FolderResolution {
        let folders = match self.mail.list_folders(token).await {
            Ok(folders) => folders,
            Err(e) => {
                tracing::error!(folder = display_name, error = %e, "failed to list mail folders");
                return FolderResolution::Failed;
            }
        };

        if let Some(existing) = folders.into_iter().find(|f| f.display_name == display_name) {
            tracing::debug!(folder = display_name, id = %existing.id, "found folder");
            return FolderResolution::Found(existing.id);
        }

        match self.mail.create_folder(token, display_name).await {
            Ok(id) => {
                tracing::info!(folder = display_name, id = %id, "created folder");
                FolderResolution::Created(id)
            }
            Err(e) => {
                tracing::error!(folder = display_name, error = %e, "failed to create folder");
                FolderResolution::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mail::{MailFolder, MockMailTransport};
    use crate::providers::ProviderError;
    use mockall::predicate::eq;

    fn token() -> AccessToken {
        AccessToken::from("tok")
    }

    #[tokio::test]
    async fn returns_existing_folder() {
        let mut mail = MockMailTransport::new();
        mail.expect_list_folders().times(1).returning(|_| {
            Ok(vec![
                MailFolder::new("f-inbox", "Inbox"),
                MailFolder::new("f-acc", "akzeptiertLindenweg"),
            ])
        });
        mail.expect_create_folder().never();

        let resolver = FolderResolver::new(Arc::new(mail));
        let result = resolver.resolve(&token(), "akzeptiertLindenweg").await;

        assert_eq!(result, FolderResolution::Found(FolderId::from("f-acc")));
    }

    #[tokio::test]
    async fn creates_missing_folder() {
        let mut mail = MockMailTransport::new();
        mail.expect_list_folders()
            .returning(|_| Ok(vec![MailFolder::new("f-inbox", "Inbox")]));
        mail.expect_create_folder()
            .with(mockall::predicate::always(), eq("abgelehntLindenweg"))
            .times(1)
            .returning(|_, _| Ok(FolderId::from("f-new")));

        let resolver = FolderResolver::new(Arc::new(mail));
        let result = resolver.resolve(&token(), "abgelehntLindenweg").await;

        assert_eq!(result, FolderResolution::Created(FolderId::from("f-new")));
        assert_eq!(result.id(), Some(&FolderId::from("f-new")));
    }

    #[tokio::test]
    async fn match_is_case_sensitive() {
        let mut mail = MockMailTransport::new();
        mail.expect_list_folders()
            .returning(|_| Ok(vec![MailFolder::new("f-lower", "akzeptiertlindenweg")]));
        mail.expect_create_folder()
            .times(1)
            .returning(|_, _| Ok(FolderId::from("f-upper")));

        let resolver = FolderResolver::new(Arc::new(mail));
        let result = resolver.resolve(&token(), "akzeptiertLindenweg").await;

        assert_eq!(result, FolderResolution::Created(FolderId::from("f-upper")));
    }

    #[tokio::test]
    async fn list_failure_is_reported_as_failed() {
        let mut mail = MockMailTransport::new();
        mail.expect_list_folders()
            .returning(|_| Err(ProviderError::Connection("reset".to_string())));
        mail.expect_create_folder().never();

        let resolver = FolderResolver::new(Arc::new(mail));
        let result = resolver.resolve(&token(), "x").await;

        assert_eq!(result, FolderResolution::Failed);
        assert!(result.into_id().is_none());
    }

    #[tokio::test]
    async fn create_failure_is_reported_as_failed() {
        let mut mail = MockMailTransport::new();
        mail.expect_list_folders().returning(|_| Ok(Vec::new()));
        mail.expect_create_folder()
            .returning(|_, _| Err(ProviderError::Authentication("expired".to_string())));

        let resolver = FolderResolver::new(Arc::new(mail));
        assert_eq!(resolver.resolve(&token(), "x").await, FolderResolution::Failed);
    }
}
