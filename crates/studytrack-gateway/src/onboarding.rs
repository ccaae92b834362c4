//! Onboarding gate: binds a WhatsApp number to a profile and greets the
//! user on the newly bound number.

use std::sync::Arc;
use studytrack_core::error::{Result, StudyTrackError};
use studytrack_core::traits::{MessagingChannel, TaskStore};
use studytrack_core::types::{Profile, ProfileField};
use studytrack_scheduler::composer;

pub struct OnboardingGate {
    store: Arc<dyn TaskStore>,
    channel: Arc<dyn MessagingChannel>,
}

impl OnboardingGate {
    pub fn new(store: Arc<dyn TaskStore>, channel: Arc<dyn MessagingChannel>) -> Self {
        Self { store, channel }
    }

    /// Store `phone` on the profile, then send one welcome message.
    ///
    /// Nothing is sent when the profile does not exist or the update fails.
    /// A failed welcome send is logged; the binding still counts.
    pub async fn complete_onboarding(&self, user_id: &str, phone: &str) -> Result<Profile> {
        let user_id = user_id.trim();
        let phone = phone.trim();
        if user_id.is_empty() {
            return Err(StudyTrackError::validation("user_id is required"));
        }
        if phone.is_empty() {
            return Err(StudyTrackError::validation("whatsapp_phone is required"));
        }

        let profile = self
            .store
            .update_profile_field(user_id, ProfileField::WhatsappPhone, phone)
            .await?
            .ok_or_else(|| StudyTrackError::not_found(format!("profile {user_id}")))?;

        tracing::info!("Onboarding complete for {user_id}");

        let welcome = composer::compose_welcome(&profile);
        if let Err(e) = self.channel.send_text(phone, &welcome).await {
            tracing::warn!("Welcome message to {user_id} failed: {e}");
        }

        Ok(profile)
    }
}
