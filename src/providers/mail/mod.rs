//! Mail-transport providers.
//!
//! This module contains the [`MailTransport`] trait and the Graph-backed
//! [`GraphMailClient`].

mod graph;
mod traits;

pub use graph::{GraphMailClient, MAX_FOLDER_PAGES};
pub use traits::{MailFolder, MailTransport};

#[cfg(test)]
pub use traits::MockMailTransport;
