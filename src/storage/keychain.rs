//! Saved mail-API session in the OS keychain.
//!
//! One entry per service namespace holds the last signed-in [`Session`] as
//! JSON. Keyring calls block, so each one runs on the blocking pool.

use thiserror::Error;

use crate::auth::Session;

/// Errors that can occur during keychain operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("saved session is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Failed to spawn blocking task: {0}")]
    TaskFailed(String),
}

/// Result type for keychain operations.
pub type Result<T> = std::result::Result<T, KeychainError>;

/// Session storage in one keychain namespace.
#[derive(Debug, Clone)]
pub struct KeychainAccess {
    service_name: String,
}

impl KeychainAccess {
    /// Default service name for triage credentials.
    pub const DEFAULT_SERVICE: &'static str = "io.inquiry-triage";

    /// Entry holding the most recent signed-in session.
    pub const CURRENT_SESSION_KEY: &'static str = "session.current";

    /// Creates access to the default namespace.
    pub fn new() -> Self {
        Self::with_service(Self::DEFAULT_SERVICE)
    }

    /// Creates access to a custom namespace.
    pub fn with_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Returns the service name used for this keychain access.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Saves `session`, replacing any earlier one.
    pub async fn save_session(&self, session: &Session) -> Result<()> {
        let json = encode_session(session)?;
        self.with_entry(move |entry| Ok(entry.set_password(&json)?))
            .await
    }

    /// Loads the saved session, or `None` if nothing was saved.
    pub async fn load_session(&self) -> Result<Option<Session>> {
        let json = self
            .with_entry(|entry| match entry.get_password() {
                Ok(json) => Ok(Some(json)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e.into()),
            })
            .await?;
        json.as_deref().map(decode_session).transpose()
    }

    /// Removes the saved session. Returns whether one existed.
    pub async fn clear_session(&self) -> Result<bool> {
        self.with_entry(|entry| match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e.into()),
        })
        .await
    }

    /// Runs `op` against the session entry on the blocking pool.
    async fn with_entry<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry) -> Result<T> + Send + 'static,
    {
        let service = self.service_name.clone();
        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, Self::CURRENT_SESSION_KEY)?;
            op(entry)
        })
        .await
        .map_err(|e| KeychainError::TaskFailed(e.to_string()))?
    }
}

impl Default for KeychainAccess {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_session(session: &Session) -> Result<String> {
    Ok(serde_json::to_string(session)?)
}

/// Rejects saved sessions with a blank token, which could never authenticate.
fn decode_session(json: &str) -> Result<Session> {
    let session: Session = serde_json::from_str(json)?;
    if session.access_token.secret().trim().is_empty() {
        return Err(KeychainError::Corrupt(serde::de::Error::custom(
            "access token is blank",
        )));
    }
    Ok(session)
}
