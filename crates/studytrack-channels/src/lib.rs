//! # StudyTrack Channels
//! Outbound messaging adapters and webhook ingestion helpers.

pub mod evolution;
pub mod webhook;

pub use evolution::EvolutionChannel;
