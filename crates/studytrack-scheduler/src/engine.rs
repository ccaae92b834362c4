//! Daily run coordinator: fetch, compose, dispatch, summarize.
//!
//! A run is one sequential pass over the tasks due on a date. Only a failed
//! due-task query aborts it; every per-task problem is folded into the
//! outcome counters.
//!
//! Task status is never written here, so triggering the run twice for the
//! same date sends the same notifications twice. [`SentTaskHook`] is the
//! seam for a future "mark notified" write.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use studytrack_core::error::Result;
use studytrack_core::traits::{MessagingChannel, TaskStore};
use studytrack_core::types::{DueTask, Task};

use crate::composer;
use crate::dispatcher::{Delivery, NotificationDispatcher};
use crate::query::TaskDueQuery;

/// Called after each successful send. Errors are logged, never fatal.
#[async_trait]
pub trait SentTaskHook: Send + Sync {
    async fn task_sent(&self, task: &Task) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedTask {
    pub task_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedSend {
    pub task_id: String,
    pub error: String,
}

/// Counters for one run. Lives only until the summary is rendered.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub total: usize,
    pub sent: usize,
    pub skipped: Vec<SkippedTask>,
    pub failed: Vec<FailedSend>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSummary {
    NoTasks,
    Processed(DispatchOutcome),
    /// The due-task query failed; nothing was sent.
    Failed(String),
}

impl RunSummary {
    pub fn sent(&self) -> usize {
        match self {
            RunSummary::Processed(outcome) => outcome.sent,
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        match self {
            RunSummary::Processed(outcome) => outcome.total,
            _ => 0,
        }
    }

    pub fn details(&self) -> String {
        match self {
            RunSummary::NoTasks => "No tasks today".into(),
            RunSummary::Processed(outcome) => {
                format!("Processed. Sent: {}/{}", outcome.sent, outcome.total)
            }
            RunSummary::Failed(error) => error.clone(),
        }
    }

    /// Structured form returned to whoever triggered the run.
    pub fn report(&self) -> RunReport {
        let (skipped, failed) = match self {
            RunSummary::Processed(outcome) => (outcome.skipped.clone(), outcome.failed.clone()),
            _ => (Vec::new(), Vec::new()),
        };
        RunReport {
            status: "completed",
            completed: true,
            details: self.details(),
            sent: self.sent(),
            total: self.total(),
            skipped,
            failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: &'static str,
    pub completed: bool,
    pub details: String,
    pub sent: usize,
    pub total: usize,
    pub skipped: Vec<SkippedTask>,
    pub failed: Vec<FailedSend>,
}

pub struct DailyRunCoordinator {
    query: TaskDueQuery,
    dispatcher: NotificationDispatcher,
    sent_hook: Option<Arc<dyn SentTaskHook>>,
}

impl DailyRunCoordinator {
    pub fn new(store: Arc<dyn TaskStore>, channel: Arc<dyn MessagingChannel>) -> Self {
        Self {
            query: TaskDueQuery::new(store),
            dispatcher: NotificationDispatcher::new(channel),
            sent_hook: None,
        }
    }

    pub fn with_sent_hook(mut self, hook: Arc<dyn SentTaskHook>) -> Self {
        self.sent_hook = Some(hook);
        self
    }

    /// Run the dispatch for `date`.
    pub async fn run_daily(&self, date: NaiveDate) -> RunSummary {
        tracing::info!("Daily dispatch starting for {date}");

        let due = match self.query.fetch_due_tasks(date).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!("Daily dispatch aborted: {e}");
                return RunSummary::Failed(e.to_string());
            }
        };

        if due.is_empty() {
            tracing::info!("No tasks due on {date}");
            return RunSummary::NoTasks;
        }

        tracing::info!("Found {} task(s) to process", due.len());

        let mut outcome = DispatchOutcome::default();
        for DueTask { task, profile, content } in &due {
            outcome.total += 1;
            let text = composer::compose(task, profile, content.as_ref());

            match self.dispatcher.dispatch(profile, &text).await {
                Delivery::Sent => {
                    outcome.sent += 1;
                    if let Some(hook) = &self.sent_hook {
                        if let Err(e) = hook.task_sent(task).await {
                            tracing::warn!("Sent hook failed for task {}: {e}", task.id);
                        }
                    }
                }
                Delivery::Skipped(reason) => {
                    tracing::info!("Skipping task {}: {reason}", task.id);
                    outcome.skipped.push(SkippedTask { task_id: task.id.clone(), reason });
                }
                Delivery::NotSent(error) => {
                    tracing::warn!("Send failed for task {}: {error}", task.id);
                    outcome.failed.push(FailedSend { task_id: task.id.clone(), error });
                }
            }
        }

        let summary = RunSummary::Processed(outcome);
        tracing::info!("Daily dispatch for {date} finished: {}", summary.details());
        summary
    }
}
