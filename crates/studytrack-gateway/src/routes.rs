//! API route handlers for the gateway.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use studytrack_channels::webhook::{self, HandshakeQuery};
use studytrack_core::error::StudyTrackError;
use studytrack_scheduler::RunReport;

use super::server::AppState;

/// JSON error body with a status derived from the error kind.
pub struct ApiError(StudyTrackError);

impl From<StudyTrackError> for ApiError {
    fn from(e: StudyTrackError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StudyTrackError::Validation(_) => StatusCode::BAD_REQUEST,
            StudyTrackError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "studytrack-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment,
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct TriggerQuery {
    /// `YYYY-MM-DD`; defaults to today (local time).
    pub date: Option<String>,
}

/// Run the daily dispatch. Called by an external cron once a day.
pub async fn trigger_daily(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TriggerQuery>,
) -> Result<Json<RunReport>, ApiError> {
    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| StudyTrackError::validation(format!("date '{raw}': {e}")))?,
        None => chrono::Local::now().date_naive(),
    };

    let summary = state.coordinator.run_daily(date).await;
    Ok(Json(summary.report()))
}

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub user_id: Option<String>,
    pub whatsapp_phone: Option<String>,
}

/// Bind a WhatsApp number to a profile and send the welcome message.
pub async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OnboardingRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let phone = req.whatsapp_phone.as_deref().unwrap_or_default();
    if phone.trim().is_empty() {
        return Err(StudyTrackError::validation("whatsapp_phone is required").into());
    }
    let user_id = req.user_id.as_deref().unwrap_or_default();

    let profile = state.onboarding.complete_onboarding(user_id, phone).await?;
    Ok(Json(serde_json::json!({ "success": true, "data": profile })))
}

/// Webhook verification handshake.
pub async fn webhook_verify(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HandshakeQuery>,
) -> Response {
    match webhook::verify_handshake(state.channel.as_ref(), &query) {
        Some(challenge) => (StatusCode::OK, challenge).into_response(),
        None => (StatusCode::FORBIDDEN, "Verification failed").into_response(),
    }
}

/// Inbound webhook events. Any body is accepted and acknowledged.
pub async fn webhook_receive(body: Bytes) -> Json<serde_json::Value> {
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
    });
    Json(webhook::acknowledge_event(&payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::OnboardingGate;
    use crate::server::{AppState, router};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;
    use studytrack_core::error::Result;
    use studytrack_core::traits::{MessagingChannel, TaskStore};
    use studytrack_core::types::{Profile, Task, TaskStatus};
    use studytrack_db::sqlite::SqliteStore;
    use studytrack_scheduler::DailyRunCoordinator;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessagingChannel for Outbox {
        fn name(&self) -> &str { "outbox" }

        async fn send_text(&self, address: &str, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((address.into(), text.into()));
            Ok(())
        }

        fn verify_handshake_token(&self, candidate: &str) -> bool {
            webhook::token_matches(Some("kaua2112"), candidate)
        }
    }

    fn test_state() -> (Arc<AppState>, Arc<Outbox>) {
        let store = SqliteStore::in_memory().unwrap();
        for (id, phone) in [("u1", Some("5511900000001")), ("u2", None)] {
            store.insert_profile(&Profile {
                id: id.into(),
                full_name: Some("Maria Silva".into()),
                whatsapp_phone: phone.map(String::from),
            }).unwrap();
            store.insert_task(&Task {
                id: format!("task-{id}"),
                user_id: id.into(),
                description: "Estudar Logaritmos".into(),
                scheduled_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                status: TaskStatus::Pending,
            }, None).unwrap();
        }

        let store: Arc<dyn TaskStore> = Arc::new(store);
        let outbox = Arc::new(Outbox::default());
        let channel: Arc<dyn MessagingChannel> = outbox.clone();
        let state = Arc::new(AppState {
            environment: "test".into(),
            coordinator: Arc::new(DailyRunCoordinator::new(store.clone(), channel.clone())),
            onboarding: OnboardingGate::new(store, channel.clone()),
            channel,
            start_time: std::time::Instant::now(),
        });
        (state, outbox)
    }

    async fn call(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, String) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (state, _) = test_state();
        let (status, body) = call(state, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["environment"], "test");
    }

    #[tokio::test]
    async fn test_trigger_daily_with_date() {
        let (state, outbox) = test_state();
        let (status, body) = call(state, get("/api/cron/trigger-daily?date=2026-10-19")).await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["completed"], true);
        assert_eq!(json["details"], "Processed. Sent: 1/2");
        assert_eq!(json["skipped"][0]["task_id"], "task-u2");
        assert_eq!(outbox.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_trigger_daily_post_with_empty_day() {
        let (state, _) = test_state();
        let request = Request::post("/api/cron/trigger-daily?date=2026-01-01")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(state, request).await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["details"], "No tasks today");
        assert_eq!(json["total"], 0);
    }

    #[tokio::test]
    async fn test_trigger_daily_bad_date() {
        let (state, outbox) = test_state();
        let (status, _) = call(state, get("/api/cron/trigger-daily?date=19-10-2026")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(outbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_onboarding_flow() {
        let (state, outbox) = test_state();
        let request = post_json(
            "/api/auth/onboarding/complete",
            serde_json::json!({"user_id": "u2", "whatsapp_phone": "5511900000002"}),
        );
        let (status, body) = call(state, request).await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["whatsapp_phone"], "5511900000002");
        assert_eq!(outbox.sent.lock().unwrap()[0].0, "5511900000002");
    }

    #[tokio::test]
    async fn test_onboarding_missing_phone_is_400() {
        let (state, outbox) = test_state();
        let request = post_json("/api/auth/onboarding/complete", serde_json::json!({"user_id": "u2"}));
        let (status, body) = call(state, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("whatsapp_phone"));
        assert!(outbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_onboarding_unknown_user_is_404() {
        let (state, _) = test_state();
        let request = post_json(
            "/api/auth/onboarding/complete",
            serde_json::json!({"user_id": "ghost", "whatsapp_phone": "5511"}),
        );
        let (status, _) = call(state, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_webhook_handshake() {
        let (state, _) = test_state();
        let ok = "/api/webhook/whatsapp?hub.mode=subscribe&hub.verify_token=kaua2112&hub.challenge=4242";
        let (status, body) = call(state.clone(), get(ok)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "4242");

        let bad = "/api/webhook/whatsapp?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=4242";
        let (status, _) = call(state, get(bad)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_webhook_receive_acknowledges_anything() {
        let (state, _) = test_state();
        let request = post_json("/api/webhook/whatsapp", serde_json::json!({"event": "messages.upsert"}));
        let (status, body) = call(state.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ok"));

        let request = Request::post("/api/webhook/whatsapp").body(Body::from("not json")).unwrap();
        let (status, _) = call(state, request).await;
        assert_eq!(status, StatusCode::OK);
    }
}
