//! Task store trait: the relational backend holding plans and profiles.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{DueTask, Profile, ProfileField, TaskStatus};

/// Read/write access to plan tasks and profiles.
///
/// Implementations are created once at startup and shared behind an `Arc`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Tasks scheduled on `date` with `status`, joined with their owner
    /// profile and optional content. Store failures map to `DataAccess`.
    async fn query_due_tasks(&self, date: NaiveDate, status: TaskStatus) -> Result<Vec<DueTask>>;

    /// Set one profile column. Returns `Ok(None)` when no profile has `id`.
    async fn update_profile_field(
        &self,
        id: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<Option<Profile>>;
}
