//! Cohorts produced by triage.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{EmailRecord, FolderId};

/// The decision taken for a group of emails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// The inquiry gets a confirmation reply.
    Accepted,
    /// The inquiry gets a rejection reply.
    Rejected,
}

impl Disposition {
    /// Returns a lowercase label used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Accepted => "accepted",
            Disposition::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked set of emails sharing a disposition, reply template and target
/// folder.
///
/// Cohorts are rebuilt on every triage run.
#[derive(Debug, Clone)]
pub struct Cohort {
    /// Which decision this cohort carries.
    pub disposition: Disposition,
    /// Members in the order they will be filed. May contain repeats.
    pub members: Vec<EmailRecord>,
    /// Reply body used for every draft in the cohort.
    pub template: String,
    /// Folder the drafts are moved into.
    pub folder_id: FolderId,
}

impl Cohort {
    /// Number of drafts this cohort will create.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the cohort has nothing to file.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
