//! Triage orchestration: fetch, partition, resolve folders, file drafts.
//!
//! A run is not cancellable once it reaches the filing stage and nothing is
//! rolled back. Remote failures past validation are logged, recorded in the
//! [`TriageReport`] and do not abort the run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use super::draft_pipeline::{DraftPipeline, FileOutcome};
use super::folder_resolver::{FolderResolution, FolderResolver};
use super::partitioner::{parse_quota, partition_with_threshold, QuotaError};
use crate::config::TriageSettings;
use crate::domain::{AccessToken, Cohort, Disposition, EmailId, EmailRecord, FolderId};
use crate::providers::mail::MailTransport;
use crate::providers::metadata::MetadataGateway;

const EVENT_CAPACITY: usize = 64;

/// Everything one run needs, captured by the caller at trigger time.
#[derive(Debug, Clone)]
pub struct TriageRequest {
    /// The email the user triggered triage from.
    pub email_id: EmailId,
    /// Bearer token for the mail API.
    pub access_token: AccessToken,
    /// Quota as typed by the user.
    pub quota_text: String,
    /// Reply body for accepted inquiries.
    pub confirmation_template: String,
    /// Reply body for rejected inquiries.
    pub rejection_template: String,
    /// Whether originals are deleted after filing.
    pub delete_originals: bool,
}

/// Reasons a run stops before filing anything.
#[derive(Debug, Error)]
pub enum TriageError {
    /// No profile could be loaded for the triggering email.
    #[error("no profile available for email {0}")]
    ProfileUnavailable(EmailId),

    /// The profile has no grouping key.
    #[error("email {0} has no folder name")]
    MissingFolderName(EmailId),

    /// The listing has no rated emails.
    #[error("no emails found for folder {folder:?}")]
    NoEmails {
        /// Grouping key that came back empty.
        folder: String,
    },

    /// The quota text is not a whole number.
    #[error(transparent)]
    InvalidQuota(#[from] QuotaError),

    /// A reply template is blank.
    #[error("the {0} template is empty")]
    EmptyTemplate(Disposition),
}

/// Per-cohort part of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortReport {
    /// Which cohort this is.
    pub disposition: Disposition,
    /// Folder name the cohort targets.
    pub folder_name: String,
    /// Resolved folder, if resolution succeeded.
    pub folder_id: Option<FolderId>,
    /// Outcome for every member, in filing order.
    pub outcomes: Vec<(EmailId, FileOutcome)>,
    /// Set when the cohort was not filed because its folder was unavailable.
    pub skipped: bool,
}

impl CohortReport {
    /// Number of drafts that reached the target folder.
    pub fn filed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_filed()).count()
    }

    /// Number of members that did not reach the target folder.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.filed()
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageReport {
    /// The triggering email.
    pub email_id: EmailId,
    /// Grouping key the run worked on.
    pub folder_name: String,
    /// Quota as entered, echoed back to the caller.
    pub quota_text: String,
    /// Accepted cohort results.
    pub accepted: CohortReport,
    /// Rejected cohort results.
    pub rejected: CohortReport,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When filing finished.
    pub finished_at: DateTime<Utc>,
}

impl TriageReport {
    /// Drafts that reached their folder across both cohorts.
    pub fn total_filed(&self) -> usize {
        self.accepted.filed() + self.rejected.filed()
    }
}

/// Progress notifications for a run.
#[derive(Debug, Clone)]
pub enum TriageEvent {
    /// A run passed validation and began fetching.
    Started {
        /// Triggering email.
        email_id: EmailId,
    },
    /// A cohort was skipped because its folder could not be resolved.
    CohortSkipped {
        /// Which cohort.
        disposition: Disposition,
        /// Folder name that failed.
        folder_name: String,
    },
    /// The run finished; carries the original quota text.
    Completed {
        /// Quota as entered.
        quota_text: String,
        /// Full report.
        report: Box<TriageReport>,
    },
    /// The run stopped early.
    Aborted {
        /// Triggering email.
        email_id: EmailId,
        /// Human-readable reason.
        reason: String,
    },
}

/// Runs triage for a listing.
pub struct TriageService {
    gateway: Arc<dyn MetadataGateway>,
    resolver: FolderResolver,
    pipeline: DraftPipeline,
    settings: TriageSettings,
    events: broadcast::Sender<TriageEvent>,
}

impl TriageService {
    /// Creates a service over the metadata gateway and mail transport.
    pub fn new(
        gateway: Arc<dyn MetadataGateway>,
        mail: Arc<dyn MailTransport>,
        settings: TriageSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            resolver: FolderResolver::new(Arc::clone(&mail)),
            pipeline: DraftPipeline::new(mail),
            settings,
            events,
        }
    }

    /// Subscribes to run events.
    pub fn subscribe(&self) -> broadcast::Receiver<TriageEvent> {
        self.events.subscribe()
    }

    /// Runs triage for the listing the request's email belongs to.
    pub async fn run_triage(&self, request: TriageRequest) -> Result<TriageReport, TriageError> {
        match self.execute(&request).await {
            Ok(report) => {
                tracing::info!(
                    email_id = %request.email_id,
                    folder = %report.folder_name,
                    accepted = report.accepted.outcomes.len(),
                    rejected = report.rejected.outcomes.len(),
                    filed = report.total_filed(),
                    "triage completed"
                );
                self.emit(TriageEvent::Completed {
                    quota_text: request.quota_text.clone(),
                    report: Box::new(report.clone()),
                });
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(email_id = %request.email_id, error = %e, "triage aborted");
                self.emit(TriageEvent::Aborted {
                    email_id: request.email_id.clone(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute(&self, request: &TriageRequest) -> Result<TriageReport, TriageError> {
        validate_template(&request.confirmation_template, Disposition::Accepted)?;
        validate_template(&request.rejection_template, Disposition::Rejected)?;

        let started_at = Utc::now();
        self.emit(TriageEvent::Started {
            email_id: request.email_id.clone(),
        });

        let snapshot = self
            .gateway
            .fetch_profile(&request.email_id)
            .await
            .ok_or_else(|| TriageError::ProfileUnavailable(request.email_id.clone()))?;
        let folder_name = snapshot
            .grouping_key()
            .ok_or_else(|| TriageError::MissingFolderName(request.email_id.clone()))?
            .to_string();

        let emails = self.gateway.fetch_emails_by_folder(&folder_name).await;
        if emails.is_empty() {
            return Err(TriageError::NoEmails {
                folder: folder_name,
            });
        }

        let quota = parse_quota(&request.quota_text)?;
        let split = partition_with_threshold(emails, quota, self.settings.accept_threshold);
        tracing::info!(
            folder = %folder_name,
            quota,
            accepted = split.accepted.len(),
            rejected = split.rejected.len(),
            "starting triage"
        );

        let accepted_name = self.settings.accepted_folder(&folder_name);
        let rejected_name = self.settings.rejected_folder(&folder_name);
        let token = &request.access_token;
        let (accepted_folder, rejected_folder) = tokio::join!(
            self.resolver.resolve(token, &accepted_name),
            self.resolver.resolve(token, &rejected_name),
        );

        let accepted = self.cohort(
            Disposition::Accepted,
            split.accepted,
            &request.confirmation_template,
            accepted_folder,
        );
        let rejected = self.cohort(
            Disposition::Rejected,
            split.rejected,
            &request.rejection_template,
            rejected_folder,
        );

        let (accepted, rejected) = tokio::join!(
            self.file_cohort(token, accepted_name, accepted, request.delete_originals),
            self.file_cohort(token, rejected_name, rejected, request.delete_originals),
        );

        Ok(TriageReport {
            email_id: request.email_id.clone(),
            folder_name,
            quota_text: request.quota_text.clone(),
            accepted,
            rejected,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn cohort(
        &self,
        disposition: Disposition,
        members: Vec<EmailRecord>,
        template: &str,
        folder: FolderResolution,
    ) -> Result<Cohort, (Disposition, usize)> {
        match folder.into_id() {
            Some(folder_id) => Ok(Cohort {
                disposition,
                members,
                template: template.to_string(),
                folder_id,
            }),
            None => Err((disposition, members.len())),
        }
    }

    /// Files every member of a cohort in order.
    async fn file_cohort(
        &self,
        token: &AccessToken,
        folder_name: String,
        cohort: Result<Cohort, (Disposition, usize)>,
        delete_originals: bool,
    ) -> CohortReport {
        let cohort = match cohort {
            Ok(cohort) => cohort,
            Err((disposition, members)) => {
                tracing::error!(
                    disposition = %disposition,
                    folder = %folder_name,
                    members,
                    "folder unavailable, skipping cohort"
                );
                self.emit(TriageEvent::CohortSkipped {
                    disposition,
                    folder_name: folder_name.clone(),
                });
                return CohortReport {
                    disposition,
                    folder_name,
                    folder_id: None,
                    outcomes: Vec::new(),
                    skipped: true,
                };
            }
        };

        let mut outcomes = Vec::with_capacity(cohort.len());
        for member in &cohort.members {
            let outcome = self
                .pipeline
                .file_reply(
                    token,
                    &member.external_id,
                    &cohort.folder_id,
                    &cohort.template,
                    delete_originals,
                )
                .await;
            outcomes.push((member.external_id.clone(), outcome));
        }

        CohortReport {
            disposition: cohort.disposition,
            folder_name,
            folder_id: Some(cohort.folder_id),
            outcomes,
            skipped: false,
        }
    }

    fn emit(&self, event: TriageEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Rejects a blank reply template.
pub fn validate_template(template: &str, disposition: Disposition) -> Result<(), TriageError> {
    if template.trim().is_empty() {
        return Err(TriageError::EmptyTemplate(disposition));
    }
    Ok(())
}
