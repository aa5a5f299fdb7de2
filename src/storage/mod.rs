//! Client-side persistence.
//!
//! This module provides:
//!
//! - Key-value preferences (the delete-originals toggle) in a JSON file
//! - OS keychain integration for the mail-API session

mod keychain;
mod preferences;

pub use keychain::{KeychainAccess, KeychainError};
pub use preferences::{
    DeleteEmailsPreference, JsonPreferenceStore, MemoryPreferenceStore, PreferenceError,
    PreferenceStore,
};
