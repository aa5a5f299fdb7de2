//! Splits a rated email set into accepted and rejected cohorts.
//!
//! The split reproduces the add-in's long-standing behavior exactly,
//! including a quirk: the rejected side is the union of the low-rated emails
//! and every email past the quota in the sorted list, without deduplication.
//! An email can therefore be listed twice in `rejected`.

use thiserror::Error;

use crate::domain::EmailRecord;

/// Rating above which an email may be accepted.
pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 7.0;

/// The quota text was not a non-negative integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("quota must be a non-negative whole number, got {input:?}")]
pub struct QuotaError {
    /// The text as entered.
    pub input: String,
}

/// Parses user-entered quota text.
///
/// Surrounding whitespace is ignored. Signs, fractions and trailing text are
/// rejected.
pub fn parse_quota(text: &str) -> Result<usize, QuotaError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuotaError {
            input: text.to_string(),
        });
    }
    trimmed.parse().map_err(|_| QuotaError {
        input: text.to_string(),
    })
}

/// Result of splitting an email set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Highest-rated eligible emails, at most `quota` of them.
    pub accepted: Vec<EmailRecord>,
    /// Everything else, possibly with repeats.
    pub rejected: Vec<EmailRecord>,
}

impl Partition {
    /// Total drafts the partition will produce.
    pub fn draft_count(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }
}

/// Sorts emails by rating, highest first.
///
/// Uses a total order so unusual ratings never panic; equal ratings keep
/// their source order, though callers must not rely on it.
pub fn sort_by_rating(emails: &mut [EmailRecord]) {
    emails.sort_by(|a, b| b.rating.total_cmp(&a.rating));
}

/// Splits `emails` using the default threshold.
pub fn partition(emails: Vec<EmailRecord>, quota: usize) -> Partition {
    partition_with_threshold(emails, quota, DEFAULT_ACCEPT_THRESHOLD)
}

/// Splits `emails` into accepted and rejected cohorts.
///
/// `accepted` is the first `quota` emails rated above `threshold`.
/// `rejected` is every email not rated above `threshold`, followed by the
/// sorted list from position `quota` onward.
pub fn partition_with_threshold(
    mut emails: Vec<EmailRecord>,
    quota: usize,
    threshold: f64,
) -> Partition {
    sort_by_rating(&mut emails);

    let accepted: Vec<EmailRecord> = emails
        .iter()
        .filter(|e| e.rating > threshold)
        .take(quota)
        .cloned()
        .collect();

    // `!(r > t)` rather than `r <= t` so a NaN rating still lands somewhere.
    let mut rejected: Vec<EmailRecord> = emails
        .iter()
        .filter(|e| !(e.rating > threshold))
        .cloned()
        .collect();
    rejected.extend(emails.iter().skip(quota).cloned());

    tracing::debug!(
        total = emails.len(),
        quota,
        accepted = accepted.len(),
        rejected = rejected.len(),
        "partitioned emails"
    );

    Partition { accepted, rejected }
}
