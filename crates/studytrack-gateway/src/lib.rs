//! # StudyTrack Gateway
//! HTTP surface: the cron trigger for the daily run, the onboarding gate,
//! and the WhatsApp webhook.

pub mod onboarding;
pub mod routes;
pub mod server;

pub use onboarding::OnboardingGate;
pub use server::{AppState, GatewayServer, router};
