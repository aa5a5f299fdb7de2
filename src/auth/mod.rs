//! Authentication boundary.
//!
//! Token acquisition is done elsewhere; this module only models the resulting
//! [`Session`], the sign-in status, and the providers that hand a session to
//! the core.

mod session;

pub use session::{
    AuthError, AuthState, ChainedTokenProvider, EnvTokenProvider, KeychainTokenProvider, Session,
    StaticTokenProvider, TokenProvider, TOKEN_ENV_VAR, USER_ENV_VAR,
};
