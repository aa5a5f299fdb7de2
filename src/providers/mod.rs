//! Remote backend providers.
//!
//! This module contains provider traits and implementations for external services:
//!
//! - [`metadata`] - Inquiry metadata store (profiles, ratings, grouping keys)
//! - [`mail`] - Mail-transport API (folders, reply drafts, moves, deletes)

mod error;
pub mod mail;
pub mod metadata;

pub use error::{ProviderError, Result};
