//! Capability traits implemented by store and channel adapters.

pub mod channel;
pub mod store;

pub use channel::MessagingChannel;
pub use store::TaskStore;
