//! Sessions and the token-provider boundary.
//!
//! Interactive sign-in happens outside this crate. Whatever performs it hands
//! back a [`Session`], which the caller owns and passes to the services that
//! need a bearer token.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::AccessToken;
use crate::storage::{KeychainAccess, KeychainError};

/// Environment variable read by [`EnvTokenProvider`] for the bearer token.
pub const TOKEN_ENV_VAR: &str = "TRIAGE_ACCESS_TOKEN";

/// Environment variable read by [`EnvTokenProvider`] for the user name.
pub const USER_ENV_VAR: &str = "TRIAGE_USER";

/// Errors that can occur while obtaining a session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not signed in")]
    NotSignedIn,

    #[error(transparent)]
    Keychain(#[from] KeychainError),
}

/// An authenticated mail-API session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for the mail-transport API.
    pub access_token: AccessToken,
    /// User-scoped identifier reported by the sign-in flow.
    pub user_name: String,
}

impl Session {
    /// Creates a session from a token and user name.
    pub fn new(access_token: impl Into<AccessToken>, user_name: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user_name: user_name.into(),
        }
    }
}

/// Sign-in status of the surrounding application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// No session and no sign-in underway.
    #[default]
    NotLoggedIn,
    /// A sign-in flow has been started and has not reported back.
    LoginInProcess,
    /// Signed in with the given session.
    LoggedIn(Session),
}

impl AuthState {
    /// Marks a sign-in flow as started.
    pub fn begin_login(&mut self) {
        *self = AuthState::LoginInProcess;
    }

    /// Records a completed sign-in and returns the session to the caller.
    pub fn complete_login(&mut self, session: Session) -> Session {
        tracing::info!(user = %session.user_name, "signed in");
        *self = AuthState::LoggedIn(session.clone());
        session
    }

    /// Returns to the signed-out state, yielding any session that was held.
    pub fn logout(&mut self) -> Option<Session> {
        match std::mem::take(self) {
            AuthState::LoggedIn(session) => {
                tracing::info!(user = %session.user_name, "signed out");
                Some(session)
            }
            _ => None,
        }
    }

    /// The current session, if signed in.
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::LoggedIn(session) => Some(session),
            _ => None,
        }
    }
}

/// Source of an already-acquired session.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the session to use for mail-API calls.
    async fn session(&self) -> Result<Session, AuthError>;
}

/// Provider that always yields the same session.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    session: Session,
}

impl StaticTokenProvider {
    /// Wraps an existing session.
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn session(&self) -> Result<Session, AuthError> {
        Ok(self.session.clone())
    }
}

/// Provider reading `TRIAGE_ACCESS_TOKEN` and `TRIAGE_USER`.
#[derive(Debug, Clone, Default)]
pub struct EnvTokenProvider;

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn session(&self) -> Result<Session, AuthError> {
        let token = std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(AuthError::NotSignedIn)?;
        let user = std::env::var(USER_ENV_VAR).unwrap_or_default();
        Ok(Session::new(token, user))
    }
}

/// Provider backed by a session saved in the OS keychain.
#[derive(Debug, Clone)]
pub struct KeychainTokenProvider {
    keychain: KeychainAccess,
}

impl KeychainTokenProvider {
    /// Creates a provider over the given keychain namespace.
    pub fn new(keychain: KeychainAccess) -> Self {
        Self { keychain }
    }

    /// Saves a session so later runs can reuse it.
    pub async fn remember(&self, session: &Session) -> Result<(), AuthError> {
        Ok(self.keychain.save_session(session).await?)
    }

    /// Removes the saved session. Succeeds if none was saved.
    pub async fn forget(&self) -> Result<(), AuthError> {
        if !self.keychain.clear_session().await? {
            tracing::debug!("no saved session to forget");
        }
        Ok(())
    }
}

#[async_trait]
impl TokenProvider for KeychainTokenProvider {
    async fn session(&self) -> Result<Session, AuthError> {
        self.keychain
            .load_session()
            .await?
            .ok_or(AuthError::NotSignedIn)
    }
}

/// Tries providers in order, returning the first session found.
pub struct ChainedTokenProvider {
    providers: Vec<Arc<dyn TokenProvider>>,
}

impl ChainedTokenProvider {
    /// Creates a chain over `providers`.
    pub fn new(providers: Vec<Arc<dyn TokenProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl TokenProvider for ChainedTokenProvider {
    async fn session(&self) -> Result<Session, AuthError> {
        for provider in &self.providers {
            match provider.session().await {
                Ok(session) => return Ok(session),
                Err(AuthError::NotSignedIn) => continue,
                Err(e) => tracing::warn!(error = %e, "token provider failed"),
            }
        }
        Err(AuthError::NotSignedIn)
    }
}
