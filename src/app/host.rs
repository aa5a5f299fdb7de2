//! Boundary to the mail client hosting the add-in.

use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::watch;

use crate::domain::EmailId;

/// Errors reported by the host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host cannot display message {0}")]
    DisplayFailed(EmailId),

    #[error("host is unavailable: {0}")]
    Unavailable(String),
}

/// The surrounding mail client.
pub trait MailboxHost: Send + Sync {
    /// Id of the item the user is looking at, if any.
    fn current_item_id(&self) -> Option<EmailId>;

    /// Stream of active-item changes, starting at the current item.
    fn subscribe_item_changes(&self) -> watch::Receiver<Option<EmailId>>;

    /// Opens a message in the host's reading view.
    fn display_message(&self, email_id: &EmailId) -> Result<(), HostError>;
}

/// In-process host driven by the caller.
///
/// Used by the command-line driver and tests. Displayed messages are recorded
/// rather than shown.
#[derive(Debug)]
pub struct StaticHost {
    items: watch::Sender<Option<EmailId>>,
    displayed: Mutex<Vec<EmailId>>,
}

impl StaticHost {
    /// Creates a host whose active item is `current`.
    pub fn new(current: Option<EmailId>) -> Self {
        let (items, _) = watch::channel(current);
        Self {
            items,
            displayed: Mutex::new(Vec::new()),
        }
    }

    /// Switches the active item, notifying subscribers.
    pub fn select(&self, item: Option<EmailId>) {
        self.items.send_replace(item);
    }

    /// Messages opened through [`MailboxHost::display_message`], oldest first.
    pub fn displayed(&self) -> Vec<EmailId> {
        self.displayed
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl MailboxHost for StaticHost {
    fn current_item_id(&self) -> Option<EmailId> {
        self.items.borrow().clone()
    }

    fn subscribe_item_changes(&self) -> watch::Receiver<Option<EmailId>> {
        self.items.subscribe()
    }

    fn display_message(&self, email_id: &EmailId) -> Result<(), HostError> {
        let mut displayed = self
            .displayed
            .lock()
            .map_err(|e| HostError::Unavailable(e.to_string()))?;
        displayed.push(email_id.clone());
        tracing::info!(email_id = %email_id, "displaying message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_current_item() {
        let host = StaticHost::new(Some(EmailId::from("a")));
        assert_eq!(host.current_item_id(), Some(EmailId::from("a")));

        host.select(None);
        assert_eq!(host.current_item_id(), None);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let host = StaticHost::new(None);
        let mut items = host.subscribe_item_changes();

        host.select(Some(EmailId::from("b")));
        items.changed().await.unwrap();
        assert_eq!(*items.borrow(), Some(EmailId::from("b")));
    }

    #[test]
    fn records_displayed_messages() {
        let host = StaticHost::new(None);
        host.display_message(&EmailId::from("x")).unwrap();
        host.display_message(&EmailId::from("y")).unwrap();
        assert_eq!(host.displayed(), vec![EmailId::from("x"), EmailId::from("y")]);
    }
}
