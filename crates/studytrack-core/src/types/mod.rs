//! Domain types shared across StudyTrack crates.

pub mod task;

pub use task::{ContentItem, ContentType, DueTask, Profile, ProfileField, Task, TaskStatus};
