//! Messaging channel trait: outbound text delivery.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait MessagingChannel: Send + Sync {
    /// Channel name, for logs.
    fn name(&self) -> &str;

    /// Deliver `text` to `address`. One attempt, no retry.
    async fn send_text(&self, address: &str, text: &str) -> Result<()>;

    /// Compare a webhook verification token against the configured secret.
    fn verify_handshake_token(&self, candidate: &str) -> bool;
}
