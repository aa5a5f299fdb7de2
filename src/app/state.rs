//! Form state captured from the user before a triage run.

use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::domain::{Disposition, EmailId};
use crate::services::{parse_quota, validate_template, TriageError, TriageRequest};

/// What the user has typed into the triage form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageForm {
    /// Number of inquiries to accept, as typed.
    pub quota_text: String,
    /// Reply body for accepted inquiries.
    pub confirmation_template: String,
    /// Reply body for rejected inquiries.
    pub rejection_template: String,
}

impl TriageForm {
    /// Creates a filled-in form.
    pub fn new(
        quota_text: impl Into<String>,
        confirmation_template: impl Into<String>,
        rejection_template: impl Into<String>,
    ) -> Self {
        Self {
            quota_text: quota_text.into(),
            confirmation_template: confirmation_template.into(),
            rejection_template: rejection_template.into(),
        }
    }

    /// Checks the form without touching the network.
    ///
    /// Both templates must be non-blank and the quota must be a whole number.
    pub fn validate(&self) -> Result<usize, TriageError> {
        validate_template(&self.confirmation_template, Disposition::Accepted)?;
        validate_template(&self.rejection_template, Disposition::Rejected)?;
        Ok(parse_quota(&self.quota_text)?)
    }

    /// Snapshots the form into a run request.
    pub fn to_request(
        &self,
        email_id: EmailId,
        session: &Session,
        delete_originals: bool,
    ) -> TriageRequest {
        TriageRequest {
            email_id,
            access_token: session.access_token.clone(),
            quota_text: self.quota_text.clone(),
            confirmation_template: self.confirmation_template.clone(),
            rejection_template: self.rejection_template.clone(),
            delete_originals,
        }
    }
}
