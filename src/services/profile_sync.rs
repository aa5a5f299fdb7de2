//! Keeps the displayed profile of the active mailbox item fresh.
//!
//! For each active item the loop walks `Idle -> BoundedRetry -> SteadyPoll`:
//! it fetches immediately, retries a fixed number of times while the backend
//! has nothing yet, and once a snapshot arrives it re-fetches on a fixed
//! interval. If every retry fails the item ends in `LoadFailed` and is not
//! polled. Switching items or shutting down cancels all pending timers.
//!
//! Independently, each item change triggers a one-shot request summary
//! ("N of M requests match") built from the listing's email set.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::partitioner::{parse_quota, sort_by_rating};
use crate::config::SyncSettings;
use crate::domain::{EmailId, EmailRecord, ProfileSnapshot};
use crate::providers::metadata::MetadataGateway;

/// Where the sync loop is for the current item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Nothing is being fetched.
    #[default]
    Idle,
    /// Waiting for the first snapshot; `attempt` is 1-based.
    BoundedRetry {
        /// Attempt currently in flight.
        attempt: u32,
    },
    /// A snapshot was loaded and is refreshed on an interval.
    SteadyPoll,
    /// Every bounded attempt came back empty; the item is not polled.
    LoadFailed,
}

/// How many of a listing's requests match the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    /// Requests the user intends to accept.
    pub matching: usize,
    /// Requests filed under the listing.
    pub total: usize,
}

impl fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} requests match the profile",
            self.matching, self.total
        )
    }
}

/// Everything the surrounding UI renders for the active item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
    /// Item the state belongs to.
    pub email_id: Option<EmailId>,
    /// Current loop phase.
    pub phase: SyncPhase,
    /// Last complete snapshot for the item.
    pub snapshot: Option<ProfileSnapshot>,
    /// Request counts for the item's listing.
    pub summary: RequestSummary,
    /// The listing's emails, highest rated first.
    pub emails: Vec<EmailRecord>,
}

/// Profile sync loop for the active mailbox item.
pub struct ProfileSync {
    gateway: Arc<dyn MetadataGateway>,
    settings: SyncSettings,
    quota_text: String,
    state: watch::Sender<DisplayState>,
}

impl ProfileSync {
    /// Creates a loop over `gateway` with the given timing.
    pub fn new(gateway: Arc<dyn MetadataGateway>, settings: SyncSettings) -> Self {
        let (state, _) = watch::channel(DisplayState::default());
        Self {
            gateway,
            settings,
            quota_text: String::new(),
            state,
        }
    }

    /// Sets the quota text shown as the matching count in request summaries.
    pub fn with_quota_text(mut self, quota_text: impl Into<String>) -> Self {
        self.quota_text = quota_text.into();
        self
    }

    /// Subscribes to display state updates.
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state.subscribe()
    }

    /// Returns a copy of the current display state.
    pub fn state(&self) -> DisplayState {
        self.state.borrow().clone()
    }

    /// Follows the active item until `shutdown` fires or the item stream ends.
    ///
    /// Every change of item cancels the previous item's loop and starts a new
    /// one from `BoundedRetry`, along with a fresh request summary.
    pub async fn run(
        self: Arc<Self>,
        mut items: watch::Receiver<Option<EmailId>>,
        shutdown: CancellationToken,
    ) {
        let mut current: Option<CancellationToken> = None;

        loop {
            if let Some(previous) = current.take() {
                previous.cancel();
            }

            let item = items.borrow_and_update().clone();
            self.begin_item(item.clone());

            if let Some(email_id) = item {
                tracing::debug!(email_id = %email_id, "active item changed");
                let token = shutdown.child_token();

                let this = Arc::clone(&self);
                let id = email_id.clone();
                let cancel = token.clone();
                tokio::spawn(async move { this.track(id, cancel).await });

                let this = Arc::clone(&self);
                let cancel = token.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = this.refresh_summary(&email_id) => {}
                    }
                });

                current = Some(token);
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = items.changed() => {
                    if changed.is_err() {
                        tracing::debug!("item stream closed");
                        break;
                    }
                }
            }
        }

        if let Some(token) = current {
            token.cancel();
        }
    }

    /// Runs the retry-then-poll state machine for one item.
    ///
    /// Returns the phase the item was in when the loop ended: `LoadFailed`
    /// after exhausting retries, otherwise whatever phase was cancelled.
    pub async fn track(&self, email_id: EmailId, cancel: CancellationToken) -> SyncPhase {
        let max_attempts = self.settings.max_attempts.max(1);

        let mut loaded = false;
        for attempt in 1..=max_attempts {
            self.set_phase(&email_id, SyncPhase::BoundedRetry { attempt });

            let fetched = tokio::select! {
                _ = cancel.cancelled() => return SyncPhase::BoundedRetry { attempt },
                snapshot = self.gateway.fetch_profile(&email_id) => snapshot,
            };

            if let Some(snapshot) = fetched {
                self.publish(&email_id, snapshot);
                loaded = true;
                break;
            }
            tracing::debug!(email_id = %email_id, attempt, "profile not available yet");

            if attempt < max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return SyncPhase::BoundedRetry { attempt },
                    _ = tokio::time::sleep(self.settings.retry_delay()) => {}
                }
            }
        }

        if !loaded {
            tracing::warn!(email_id = %email_id, attempts = max_attempts, "failed to load profile");
            self.set_phase(&email_id, SyncPhase::LoadFailed);
            return SyncPhase::LoadFailed;
        }

        self.set_phase(&email_id, SyncPhase::SteadyPoll);
        let period = self.settings.poll_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return SyncPhase::SteadyPoll,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                _ = cancel.cancelled() => return SyncPhase::SteadyPoll,
                snapshot = self.gateway.fetch_profile(&email_id) => snapshot,
            };

            match fetched {
                Some(snapshot) => self.publish(&email_id, snapshot),
                None => tracing::trace!(email_id = %email_id, "empty poll ignored"),
            }
        }
    }

    /// Recomputes the request summary and sorted email list for an item.
    ///
    /// Not retried. A missing folder name or empty listing yields `0 of 0`.
    pub async fn refresh_summary(&self, email_id: &EmailId) -> RequestSummary {
        let folder = self
            .gateway
            .fetch_folder_name(email_id)
            .await
            .filter(|name| !name.trim().is_empty());

        let (summary, emails) = match folder {
            Some(folder) => {
                let mut emails = self.gateway.fetch_emails_by_folder(&folder).await;
                sort_by_rating(&mut emails);
                let summary = if emails.is_empty() {
                    RequestSummary::default()
                } else {
                    RequestSummary {
                        matching: parse_quota(&self.quota_text).unwrap_or(0),
                        total: emails.len(),
                    }
                };
                (summary, emails)
            }
            None => (RequestSummary::default(), Vec::new()),
        };

        self.state.send_if_modified(|state| {
            if state.email_id.as_ref() != Some(email_id) {
                return false;
            }
            state.summary = summary;
            state.emails = emails;
            true
        });
        summary
    }

    fn begin_item(&self, email_id: Option<EmailId>) {
        self.state.send_replace(DisplayState {
            email_id,
            ..DisplayState::default()
        });
    }

    fn set_phase(&self, email_id: &EmailId, phase: SyncPhase) {
        self.state.send_if_modified(|state| {
            if state.email_id.as_ref() != Some(email_id) || state.phase == phase {
                return false;
            }
            state.phase = phase;
            true
        });
    }

    /// Replaces the displayed snapshot if it still belongs to the active item.
    fn publish(&self, email_id: &EmailId, snapshot: ProfileSnapshot) {
        self.state.send_if_modified(|state| {
            if state.email_id.as_ref() != Some(email_id) {
                return false;
            }
            let changed = state
                .snapshot
                .as_ref()
                .map_or(true, |old| !old.same_content(&snapshot));
            if changed {
                tracing::debug!(email_id = %email_id, "profile updated");
            }
            state.snapshot = Some(snapshot);
            true
        });
    }
}
