//! # StudyTrack Core
//! Shared types, error taxonomy, configuration, and the store/channel traits
//! every other StudyTrack crate builds on.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::StudyTrackConfig;
pub use error::{Result, StudyTrackError};
pub use traits::{MessagingChannel, TaskStore};
