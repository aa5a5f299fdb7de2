//! Application wiring and lifecycle.
//!
//! [`App`] owns the providers and services for one add-in instance and
//! exposes the handful of operations the surrounding UI needs.

pub mod host;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthState, Session, TokenProvider};
use crate::config::Settings;
use crate::domain::EmailId;
use crate::providers::mail::{GraphMailClient, MailTransport};
use crate::providers::metadata::{HttpMetadataGateway, MetadataGateway};
use crate::services::{DisplayState, ProfileSync, TriageEvent, TriageReport, TriageService};
use crate::storage::{DeleteEmailsPreference, PreferenceStore};

pub use host::{HostError, MailboxHost, StaticHost};
pub use state::TriageForm;

/// One running add-in instance.
pub struct App {
    settings: Settings,
    gateway: Arc<dyn MetadataGateway>,
    host: Arc<dyn MailboxHost>,
    preferences: Arc<dyn PreferenceStore>,
    tokens: Arc<dyn TokenProvider>,
    auth: Mutex<AuthState>,
    triage: TriageService,
}

impl App {
    /// Builds an app talking to the HTTP endpoints named in `settings`.
    pub fn new(
        settings: Settings,
        host: Arc<dyn MailboxHost>,
        preferences: Arc<dyn PreferenceStore>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let timeout = settings.endpoints.request_timeout();
        let gateway = HttpMetadataGateway::new(&settings.endpoints.metadata_base_url, timeout)
            .context("failed to build metadata client")?;
        let mail = GraphMailClient::new(&settings.endpoints.mail_base_url, timeout)
            .context("failed to build mail client")?;

        Ok(Self::with_providers(
            settings,
            Arc::new(gateway),
            Arc::new(mail),
            host,
            preferences,
            tokens,
        ))
    }

    /// Builds an app over already-constructed providers.
    pub fn with_providers(
        settings: Settings,
        gateway: Arc<dyn MetadataGateway>,
        mail: Arc<dyn MailTransport>,
        host: Arc<dyn MailboxHost>,
        preferences: Arc<dyn PreferenceStore>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let triage = TriageService::new(Arc::clone(&gateway), mail, settings.triage.clone());
        Self {
            settings,
            gateway,
            host,
            preferences,
            tokens,
            auth: Mutex::new(AuthState::default()),
            triage,
        }
    }

    /// Obtains a session from the token provider.
    pub async fn sign_in(&self) -> Result<Session> {
        self.auth.lock().await.begin_login();
        match self.tokens.session().await {
            Ok(session) => Ok(self.auth.lock().await.complete_login(session)),
            Err(e) => {
                *self.auth.lock().await = AuthState::NotLoggedIn;
                Err(e).context("sign-in failed")
            }
        }
    }

    /// Drops the current session, if any.
    pub async fn sign_out(&self) -> Option<Session> {
        self.auth.lock().await.logout()
    }

    /// Current sign-in state.
    pub async fn auth_state(&self) -> AuthState {
        self.auth.lock().await.clone()
    }

    /// Runs triage from the host's current item.
    ///
    /// Signs in first if needed. The delete preference is read once here and
    /// applies to the whole run.
    pub async fn triage(&self, form: &TriageForm) -> Result<TriageReport> {
        form.validate()?;

        let email_id = self
            .host
            .current_item_id()
            .filter(|id| !id.is_blank())
            .context("no mailbox item is selected")?;

        let existing = self.auth.lock().await.session().cloned();
        let session = match existing {
            Some(session) => session,
            None => self.sign_in().await?,
        };

        let delete_originals = DeleteEmailsPreference::load(self.preferences.as_ref())
            .await
            .context("failed to read delete preference")?;

        let request = form.to_request(email_id, &session, delete_originals);
        Ok(self.triage.run_triage(request).await?)
    }

    /// Flips the delete-originals preference and returns the new value.
    pub async fn toggle_delete(&self) -> Result<bool> {
        Ok(DeleteEmailsPreference::toggle(self.preferences.as_ref()).await?)
    }

    /// Current delete-originals preference.
    pub async fn delete_enabled(&self) -> Result<bool> {
        Ok(DeleteEmailsPreference::load(self.preferences.as_ref()).await?)
    }

    /// Subscribes to triage run events.
    pub fn subscribe_triage(&self) -> broadcast::Receiver<TriageEvent> {
        self.triage.subscribe()
    }

    /// Starts following the host's active item.
    ///
    /// `quota_text` feeds the request summary. The loop stops when `shutdown`
    /// is cancelled.
    pub fn start_sync(
        &self,
        quota_text: &str,
        shutdown: CancellationToken,
    ) -> (JoinHandle<()>, watch::Receiver<DisplayState>) {
        let sync = Arc::new(
            ProfileSync::new(Arc::clone(&self.gateway), self.settings.sync.clone())
                .with_quota_text(quota_text),
        );
        let display = sync.subscribe();
        let items = self.host.subscribe_item_changes();
        let handle = tokio::spawn(sync.run(items, shutdown));
        (handle, display)
    }

    /// Opens an email from the sorted request list in the host.
    pub fn open_email(&self, email_id: &EmailId) {
        if let Err(e) = self.host.display_message(email_id) {
            tracing::error!(email_id = %email_id, error = %e, "failed to open email");
        }
    }

    /// Settings this app was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::domain::{EmailRecord, ProfileSnapshot};
    use crate::providers::mail::MockMailTransport;
    use crate::providers::metadata::MockMetadataGateway;
    use crate::storage::MemoryPreferenceStore;

    fn app_with(
        gateway: MockMetadataGateway,
        mail: MockMailTransport,
        host: Arc<StaticHost>,
    ) -> App {
        App::with_providers(
            Settings::default(),
            Arc::new(gateway),
            Arc::new(mail),
            host,
            Arc::new(MemoryPreferenceStore::new()),
            Arc::new(StaticTokenProvider::new(Session::new("tok", "me"))),
        )
    }

    #[tokio::test]
    async fn sign_in_and_out() {
        let app = app_with(
            MockMetadataGateway::new(),
            MockMailTransport::new(),
            Arc::new(StaticHost::new(None)),
        );
        assert_eq!(app.auth_state().await, AuthState::NotLoggedIn);

        let session = app.sign_in().await.unwrap();
        assert_eq!(session.user_name, "me");
        assert_eq!(app.auth_state().await, AuthState::LoggedIn(session.clone()));

        assert_eq!(app.sign_out().await, Some(session));
        assert_eq!(app.auth_state().await, AuthState::NotLoggedIn);
    }

    #[tokio::test]
    async fn triage_requires_selected_item() {
        let mut gateway = MockMetadataGateway::new();
        gateway.expect_fetch_profile().never();
        let app = app_with(
            gateway,
            MockMailTransport::new(),
            Arc::new(StaticHost::new(None)),
        );

        let form = TriageForm::new("1", "Zusage", "Absage");
        assert!(app.triage(&form).await.is_err());
    }

    #[tokio::test]
    async fn toggle_round_trip() {
        let app = app_with(
            MockMetadataGateway::new(),
            MockMailTransport::new(),
            Arc::new(StaticHost::new(None)),
        );
        assert!(!app.delete_enabled().await.unwrap());
        assert!(app.toggle_delete().await.unwrap());
        assert!(app.delete_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn open_email_goes_through_host() {
        let host = Arc::new(StaticHost::new(None));
        let app = app_with(
            MockMetadataGateway::new(),
            MockMailTransport::new(),
            Arc::clone(&host),
        );

        app.open_email(&EmailId::from("m7"));
        assert_eq!(host.displayed(), vec![EmailId::from("m7")]);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_follows_host_selection() {
        let mut gateway = MockMetadataGateway::new();
        gateway
            .expect_fetch_profile()
            .returning(|id| Some(ProfileSnapshot::new(id.clone(), "p", "o", "Lindenweg")));
        gateway
            .expect_fetch_folder_name()
            .returning(|_| Some("Lindenweg".to_string()));
        gateway
            .expect_fetch_emails_by_folder()
            .returning(|_| vec![EmailRecord::new("a", 8.0), EmailRecord::new("b", 9.0)]);

        let host = Arc::new(StaticHost::new(Some(EmailId::from("a"))));
        let app = app_with(gateway, MockMailTransport::new(), Arc::clone(&host));

        let shutdown = CancellationToken::new();
        let (handle, display) = app.start_sync("1", shutdown.clone());
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let state = display.borrow().clone();
        assert_eq!(state.email_id, Some(EmailId::from("a")));
        assert_eq!(state.summary.to_string(), "1 of 2 requests match the profile");
        assert_eq!(state.emails[0].external_id, EmailId::from("b"));

        host.select(Some(EmailId::from("b")));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(display.borrow().email_id, Some(EmailId::from("b")));

        shutdown.cancel();
        handle.await.unwrap();
    }
}
