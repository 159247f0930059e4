//! Configuration models for queues, groups, and timeouts.

pub mod queue;

pub use queue::{GroupConfig, QueueConfig, QueueSettings, QueuesConfig, TimeoutPolicy};
