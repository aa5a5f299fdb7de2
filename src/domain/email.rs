//! Inquiry email records as returned by the metadata store.

use serde::{Deserialize, Serialize};

use super::EmailId;

/// A rated inquiry email belonging to one property listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Identifier shared by the metadata store and the mail API.
    #[serde(rename = "outlookEmailId")]
    pub external_id: EmailId,
    /// Suitability score against the listing's requirement profile.
    ///
    /// Conventionally 0 to 10 but not bounded.
    pub rating: f64,
    /// Free-form description of the sender and their request.
    #[serde(rename = "customerProfile", default)]
    pub profile_text: String,
}

impl EmailRecord {
    /// Creates a record with an empty profile text.
    pub fn new(external_id: impl Into<EmailId>, rating: f64) -> Self {
        Self {
            external_id: external_id.into(),
            rating,
            profile_text: String::new(),
        }
    }

    /// Sets the profile text.
    pub fn with_profile(mut self, profile_text: impl Into<String>) -> Self {
        self.profile_text = profile_text.into();
        self
    }
}
