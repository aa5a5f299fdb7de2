//! Profile snapshots for the active mailbox item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EmailId;

/// Profile, property name and grouping key for one email, fetched together.
///
/// A snapshot is only ever built from a complete fetch round; it replaces the
/// previous one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    /// The email these values were fetched for.
    pub email_id: EmailId,
    /// Description of the inquiring customer.
    pub customer_profile: String,
    /// Name of the property the inquiry is about.
    pub object_name: String,
    /// Grouping key clustering all inquiries for the same listing.
    pub folder_name: String,
    /// When the fetch round completed.
    pub fetched_at: DateTime<Utc>,
}

impl ProfileSnapshot {
    /// Creates a snapshot stamped with the current time.
    pub fn new(
        email_id: EmailId,
        customer_profile: impl Into<String>,
        object_name: impl Into<String>,
        folder_name: impl Into<String>,
    ) -> Self {
        Self {
            email_id,
            customer_profile: customer_profile.into(),
            object_name: object_name.into(),
            folder_name: folder_name.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Returns the grouping key, or `None` if the store returned a blank one.
    pub fn grouping_key(&self) -> Option<&str> {
        let name = self.folder_name.as_str();
        (!name.trim().is_empty()).then_some(name)
    }

    /// Returns true if both snapshots carry the same displayed values.
    pub fn same_content(&self, other: &ProfileSnapshot) -> bool {
        self.email_id == other.email_id
            && self.customer_profile == other.customer_profile
            && self.object_name == other.object_name
            && self.folder_name == other.folder_name
    }
}
