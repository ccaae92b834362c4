//! Due-task lookup.

use chrono::NaiveDate;
use std::sync::Arc;
use studytrack_core::error::{Result, StudyTrackError};
use studytrack_core::traits::TaskStore;
use studytrack_core::types::{DueTask, TaskStatus};

/// Reads the pending tasks scheduled for one calendar day, already joined
/// with owner profile and optional content.
pub struct TaskDueQuery {
    store: Arc<dyn TaskStore>,
}

impl TaskDueQuery {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Empty when nothing is due. Any store failure surfaces as `DataAccess`.
    pub async fn fetch_due_tasks(&self, date: NaiveDate) -> Result<Vec<DueTask>> {
        let due = self
            .store
            .query_due_tasks(date, TaskStatus::Pending)
            .await
            .map_err(|e| match e {
                StudyTrackError::DataAccess(_) => e,
                other => StudyTrackError::DataAccess(other.to_string()),
            })?;

        tracing::debug!("{} due task(s) on {date} from {}", due.len(), self.store.name());
        Ok(due)
    }
}
