//! HTTP server: router construction and startup.

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Instant;
use studytrack_core::error::{Result, StudyTrackError};
use studytrack_core::traits::MessagingChannel;
use studytrack_scheduler::DailyRunCoordinator;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::onboarding::OnboardingGate;
use crate::routes;

/// Shared state handed to every handler. Built once at startup.
pub struct AppState {
    pub environment: String,
    pub coordinator: Arc<DailyRunCoordinator>,
    pub onboarding: OnboardingGate,
    pub channel: Arc<dyn MessagingChannel>,
    pub start_time: Instant,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route(
            "/api/cron/trigger-daily",
            get(routes::trigger_daily).post(routes::trigger_daily),
        )
        .route("/api/auth/onboarding/complete", post(routes::complete_onboarding))
        .route(
            "/api/webhook/whatsapp",
            get(routes::webhook_verify).post(routes::webhook_receive),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct GatewayServer;

impl GatewayServer {
    /// Bind and serve until the process is stopped.
    pub async fn start(state: Arc<AppState>, host: &str, port: u16) -> Result<()> {
        let addr = format!("{host}:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| StudyTrackError::Other(format!("Cannot bind {addr}: {e}")))?;

        tracing::info!("Gateway listening on http://{addr}");
        axum::serve(listener, router(state)).await?;
        Ok(())
    }
}
