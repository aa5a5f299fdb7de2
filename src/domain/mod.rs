//! Domain layer types for inquiry triage.
//!
//! This module contains the identifiers, inquiry records, profile snapshots
//! and cohorts shared by the providers and services.

mod cohort;
mod email;
mod profile;
mod types;

pub use cohort::{Cohort, Disposition};
pub use email::EmailRecord;
pub use profile::ProfileSnapshot;
pub use types::{AccessToken, EmailId, FolderId};
