//! Notification dispatch: one send attempt per eligible profile.

use std::sync::Arc;
use studytrack_core::traits::MessagingChannel;
use studytrack_core::types::Profile;

pub const MISSING_CONTACT: &str = "missing contact address";

/// What happened to a single composed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Not attempted; the reason is recorded in the run outcome.
    Skipped(String),
    /// Attempted once and the channel reported failure.
    NotSent(String),
}

pub struct NotificationDispatcher {
    channel: Arc<dyn MessagingChannel>,
}

impl NotificationDispatcher {
    pub fn new(channel: Arc<dyn MessagingChannel>) -> Self {
        Self { channel }
    }

    /// Send `text` to the profile's contact address. Profiles without one
    /// are skipped without touching the channel. No retry.
    pub async fn dispatch(&self, profile: &Profile, text: &str) -> Delivery {
        let Some(address) = profile.contact_address() else {
            return Delivery::Skipped(MISSING_CONTACT.into());
        };

        match self.channel.send_text(address, text).await {
            Ok(()) => Delivery::Sent,
            Err(e) => Delivery::NotSent(e.to_string()),
        }
    }
}
