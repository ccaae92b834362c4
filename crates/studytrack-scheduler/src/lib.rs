//! # StudyTrack Scheduler
//!
//! The daily notification dispatch run and its building blocks.
//!
//! ## Architecture
//! ```text
//! DailyRunCoordinator::run_daily(date)
//!   ├── TaskDueQuery        → pending tasks on `date`, joined with
//!   │                         owner profile + optional content
//!   ├── composer::compose   → personalized goal message (pure)
//!   └── NotificationDispatcher
//!         ├── no WhatsApp number → skipped
//!         └── MessagingChannel::send_text (one attempt)
//! ```
//!
//! The run is triggered externally (HTTP, CLI, or the optional [`timer`])
//! and is a single sequential pass.

pub mod composer;
pub mod dispatcher;
pub mod engine;
pub mod query;
pub mod timer;

pub use dispatcher::{Delivery, NotificationDispatcher};
pub use engine::{DailyRunCoordinator, DispatchOutcome, RunReport, RunSummary, SentTaskHook};
pub use query::TaskDueQuery;
