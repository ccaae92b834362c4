//! Webhook ingestion: the `hub.*` verification handshake and inbound
//! event receipt for the WhatsApp callback URL.
//!
//! Inbound payloads are only logged and acknowledged; nothing interprets
//! them yet.

use serde::{Deserialize, Serialize};
use studytrack_core::traits::MessagingChannel;

/// Query parameters of the verification GET.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandshakeQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Compare a candidate token against the configured secret.
/// An unset or empty secret never verifies.
pub fn token_matches(secret: Option<&str>, candidate: &str) -> bool {
    match secret {
        Some(secret) if !secret.is_empty() => secret == candidate,
        _ => false,
    }
}

/// Run the handshake. Returns the challenge to echo back, or `None` when
/// the request must be rejected.
pub fn verify_handshake(channel: &dyn MessagingChannel, query: &HandshakeQuery) -> Option<String> {
    let subscribe = query.mode.as_deref() == Some("subscribe");
    let token = query.verify_token.as_deref().unwrap_or_default();

    if subscribe && channel.verify_handshake_token(token) {
        tracing::info!("Webhook handshake verified");
        Some(query.challenge.clone().unwrap_or_default())
    } else {
        tracing::warn!("Webhook handshake rejected (mode={:?})", query.mode);
        None
    }
}

/// Record an inbound event. Always acknowledges.
pub fn acknowledge_event(payload: &serde_json::Value) -> serde_json::Value {
    let event = payload["event"].as_str().unwrap_or("unknown");
    tracing::info!("Webhook event received: {event}");
    tracing::debug!("Webhook payload: {payload}");
    serde_json::json!({ "status": "ok" })
}
