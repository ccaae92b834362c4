//! Supabase task store: talks to the hosted Postgres through its
//! PostgREST endpoint (`/rest/v1`).
//!
//! The profile and content joins are resolved server-side through embedded
//! resources, so one request returns fully joined rows.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use studytrack_core::error::{Result, StudyTrackError};
use studytrack_core::traits::TaskStore;
use studytrack_core::types::{ContentItem, DueTask, Profile, ProfileField, Task, TaskStatus};

/// Embedded select for due tasks. `!inner` makes the owner join mandatory.
const DUE_TASK_SELECT: &str = "id,user_id,task_description,scheduled_date,status,\
profiles!inner(id,full_name,whatsapp_phone),\
content_repository(title,url,content_type)";

/// Ids may be uuids or bigints depending on the table.
fn id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id: {other}"))),
    }
}

#[derive(Debug, Deserialize)]
struct TaskRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(deserialize_with = "id_string")]
    user_id: String,
    task_description: String,
    scheduled_date: NaiveDate,
    status: TaskStatus,
    profiles: Profile,
    #[serde(default)]
    content_repository: Option<ContentItem>,
}

impl From<TaskRow> for DueTask {
    fn from(row: TaskRow) -> Self {
        DueTask {
            task: Task {
                id: row.id,
                user_id: row.user_id,
                description: row.task_description,
                scheduled_date: row.scheduled_date,
                status: row.status,
            },
            profile: row.profiles,
            content: row.content_repository,
        }
    }
}

pub struct SupabaseStore {
    rest_url: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    /// Build the store with its long-lived HTTP client. `timeout` bounds
    /// every request, so a hung PostgREST call cannot stall a run.
    pub fn new(project_url: &str, service_key: &str, timeout: Duration) -> Result<Self> {
        if project_url.trim().is_empty() || service_key.trim().is_empty() {
            return Err(StudyTrackError::config("Supabase URL and service key are required"));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        let invalid = |_: reqwest::header::InvalidHeaderValue| {
            StudyTrackError::config("Supabase service key is not a valid header value")
        };
        headers.insert("apikey", service_key.parse().map_err(invalid)?);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {service_key}").parse().map_err(invalid)?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| StudyTrackError::config(format!("HTTP client: {e}")))?;

        Ok(Self {
            rest_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            client,
        })
    }

    async fn read_rows<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<Vec<T>> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(StudyTrackError::data_access(format!("Supabase {status}: {text}")));
        }
        response
            .json()
            .await
            .map_err(|e| StudyTrackError::data_access(format!("Invalid Supabase response: {e}")))
    }
}

/// Decode each row on its own. A row that does not match the expected
/// shape is logged and dropped; the other rows still go out.
fn decode_due_rows(rows: Vec<serde_json::Value>) -> Vec<DueTask> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<TaskRow>(row) {
            Ok(row) => Some(DueTask::from(row)),
            Err(e) => {
                tracing::warn!("Skipping malformed plan_tasks row: {e}");
                None
            }
        })
        .collect()
}

#[async_trait]
impl TaskStore for SupabaseStore {
    fn name(&self) -> &str { "supabase" }

    async fn query_due_tasks(&self, date: NaiveDate, status: TaskStatus) -> Result<Vec<DueTask>> {
        let response = self
            .client
            .get(format!("{}/plan_tasks", self.rest_url))
            .query(&[
                ("select", DUE_TASK_SELECT.to_string()),
                ("scheduled_date", format!("eq.{}", date.format("%Y-%m-%d"))),
                ("status", format!("eq.{status}")),
            ])
            .send()
            .await
            .map_err(|e| StudyTrackError::data_access(format!("Supabase unreachable: {e}")))?;

        let rows: Vec<serde_json::Value> = Self::read_rows(response).await?;
        Ok(decode_due_rows(rows))
    }

    async fn update_profile_field(
        &self,
        id: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<Option<Profile>> {
        let mut body = serde_json::Map::new();
        body.insert(field.column().to_string(), serde_json::Value::String(value.to_string()));

        let response = self
            .client
            .patch(format!("{}/profiles", self.rest_url))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|e| StudyTrackError::data_access(format!("Supabase unreachable: {e}")))?;

        let rows: Vec<Profile> = Self::read_rows(response).await?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use studytrack_core::types::ContentType;

    #[derive(Default)]
    struct Seen {
        query: HashMap<String, String>,
        auth: Option<String>,
        body: Option<serde_json::Value>,
    }

    type Shared = Arc<Mutex<Seen>>;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    async fn plan_tasks(
        State(seen): State<Shared>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        let mut seen = seen.lock().unwrap();
        seen.query = query;
        seen.auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(String::from);
        Json(serde_json::json!([
            {
                "id": 17,
                "user_id": "df5150c7",
                "task_description": "Estudar MRUV",
                "scheduled_date": "2026-10-19",
                "status": "pending",
                "profiles": {"id": "df5150c7", "full_name": "Maria Silva", "whatsapp_phone": "5511999990000"},
                "content_repository": {"title": "Lesson 5", "url": "https://x", "content_type": "video"}
            },
            {
                "id": "b2",
                "user_id": "aa",
                "task_description": "Revisar Redação",
                "scheduled_date": "2026-10-19",
                "status": "pending",
                "profiles": {"id": "aa", "full_name": null, "whatsapp_phone": null},
                "content_repository": null
            }
        ]))
    }

    async fn patch_profile(
        State(seen): State<Shared>,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<serde_json::Value>,
    ) -> Json<serde_json::Value> {
        let found = query.get("id").map(String::as_str) == Some("eq.u1");
        seen.lock().unwrap().body = Some(body.clone());
        if found {
            Json(serde_json::json!([
                {"id": "u1", "full_name": "Ana Souza", "whatsapp_phone": body["whatsapp_phone"]}
            ]))
        } else {
            Json(serde_json::json!([]))
        }
    }

    fn router(seen: Shared) -> Router {
        Router::new()
            .route("/rest/v1/plan_tasks", get(plan_tasks))
            .route("/rest/v1/profiles", axum::routing::patch(patch_profile))
            .with_state(seen)
    }

    #[tokio::test]
    async fn test_query_due_tasks_builds_filters_and_parses_joins() {
        let seen: Shared = Arc::default();
        let base = spawn(router(seen.clone())).await;
        let store = SupabaseStore::new(&base, "service-key", TIMEOUT).unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let due = store.query_due_tasks(date, TaskStatus::Pending).await.unwrap();

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.query.get("scheduled_date").map(String::as_str), Some("eq.2026-10-19"));
            assert_eq!(seen.query.get("status").map(String::as_str), Some("eq.pending"));
            assert!(seen.query["select"].contains("profiles!inner"));
            assert_eq!(seen.auth.as_deref(), Some("Bearer service-key"));
        }

        assert_eq!(due.len(), 2);
        assert_eq!(due[0].task.id, "17");
        assert_eq!(due[0].task.description, "Estudar MRUV");
        assert_eq!(due[0].content.as_ref().unwrap().content_type, ContentType::Video);
        assert!(due[1].content.is_none());
        assert!(due[1].profile.contact_address().is_none());
    }

    #[tokio::test]
    async fn test_query_error_status_is_data_access() {
        let router = Router::new().route(
            "/rest/v1/plan_tasks",
            get(|| async { (StatusCode::UNAUTHORIZED, "invalid key") }),
        );
        let base = spawn(router).await;
        let store = SupabaseStore::new(&base, "bad", TIMEOUT).unwrap();

        let err = store
            .query_due_tasks(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), TaskStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, StudyTrackError::DataAccess(_)));
        assert!(err.to_string().contains("invalid key"));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_data_access() {
        let store = SupabaseStore::new("http://127.0.0.1:1", "k", TIMEOUT).unwrap();
        let err = store
            .query_due_tasks(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), TaskStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, StudyTrackError::DataAccess(_)));
    }

    #[tokio::test]
    async fn test_update_profile_field() {
        let seen: Shared = Arc::default();
        let base = spawn(router(seen.clone())).await;
        let store = SupabaseStore::new(&base, "service-key", TIMEOUT).unwrap();

        let updated = store
            .update_profile_field("u1", ProfileField::WhatsappPhone, "5511988887777")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.whatsapp_phone.as_deref(), Some("5511988887777"));
        assert_eq!(
            seen.lock().unwrap().body.as_ref().unwrap()["whatsapp_phone"],
            "5511988887777"
        );

        let missing = store
            .update_profile_field("ghost", ProfileField::WhatsappPhone, "1")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_null_content_type_keeps_every_row() {
        let router = Router::new().route(
            "/rest/v1/plan_tasks",
            get(|| async {
                Json(serde_json::json!([
                    {
                        "id": "a1",
                        "user_id": "u1",
                        "task_description": "Estudar MRUV",
                        "scheduled_date": "2026-10-19",
                        "status": "pending",
                        "profiles": {"id": "u1", "full_name": "Maria", "whatsapp_phone": "5511"},
                        "content_repository": {"title": "Lesson 5", "url": "https://x", "content_type": "video"}
                    },
                    {
                        "id": "a2",
                        "user_id": "u2",
                        "task_description": "Revisar Redação",
                        "scheduled_date": "2026-10-19",
                        "status": "pending",
                        "profiles": {"id": "u2", "full_name": "João", "whatsapp_phone": "5522"},
                        "content_repository": {"title": "Apostila", "url": "https://y", "content_type": null}
                    }
                ]))
            }),
        );
        let base = spawn(router).await;
        let store = SupabaseStore::new(&base, "k", TIMEOUT).unwrap();

        let due = store
            .query_due_tasks(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), TaskStatus::Pending)
            .await
            .unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].content.as_ref().unwrap().content_type, ContentType::Video);
        assert_eq!(due[1].content.as_ref().unwrap().content_type, ContentType::Other);
    }

    #[tokio::test]
    async fn test_malformed_row_is_dropped_others_kept() {
        let router = Router::new().route(
            "/rest/v1/plan_tasks",
            get(|| async {
                Json(serde_json::json!([
                    {
                        "id": "a1",
                        "user_id": "u1",
                        "task_description": "Estudar MRUV",
                        "scheduled_date": "2026-10-19",
                        "status": "pending",
                        "profiles": {"id": "u1", "full_name": "Maria", "whatsapp_phone": "5511"},
                        "content_repository": null
                    },
                    {
                        "id": "a2",
                        "user_id": "u2",
                        "task_description": null,
                        "scheduled_date": "not a date",
                        "status": "pending",
                        "profiles": null
                    }
                ]))
            }),
        );
        let base = spawn(router).await;
        let store = SupabaseStore::new(&base, "k", TIMEOUT).unwrap();

        let due = store
            .query_due_tasks(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), TaskStatus::Pending)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].task.id, "a1");
    }

    #[tokio::test]
    async fn test_hung_store_times_out_as_data_access() {
        let router = Router::new().route(
            "/rest/v1/plan_tasks",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!([]))
            }),
        );
        let base = spawn(router).await;
        let store = SupabaseStore::new(&base, "k", Duration::from_millis(200)).unwrap();

        let err = store
            .query_due_tasks(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), TaskStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, StudyTrackError::DataAccess(_)));
    }

    #[test]
    fn test_new_rejects_blank_credentials() {
        assert!(matches!(SupabaseStore::new("", "k", TIMEOUT), Err(StudyTrackError::Config(_))));
        assert!(matches!(SupabaseStore::new("https://x", " ", TIMEOUT), Err(StudyTrackError::Config(_))));
    }
}
