//! Business services layer.
//!
//! Services sit between the application layer and the providers:
//!
//! ```text
//! Application Layer (App, host, CLI)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Infrastructure (Providers, Storage)
//! ```
//!
//! # Services Overview
//!
//! - [`TriageService`]: Runs a full triage for one listing
//! - [`ProfileSync`]: Keeps the active item's profile and request summary fresh
//! - [`FolderResolver`]: Finds or creates cohort folders
//! - [`DraftPipeline`]: Drafts, files and optionally deletes per email
//! - [`partition`]: Splits rated emails into accepted and rejected cohorts

mod draft_pipeline;
mod folder_resolver;
mod partitioner;
mod profile_sync;
mod triage_service;

pub use draft_pipeline::{DraftPipeline, FileOutcome};
pub use folder_resolver::{FolderResolution, FolderResolver};
pub use partitioner::{
    parse_quota, partition, partition_with_threshold, sort_by_rating, Partition, QuotaError,
    DEFAULT_ACCEPT_THRESHOLD,
};
pub use profile_sync::{DisplayState, ProfileSync, RequestSummary, SyncPhase};
pub use triage_service::{
    validate_template, CohortReport, TriageError, TriageEvent, TriageReport, TriageRequest,
    TriageService,
};
