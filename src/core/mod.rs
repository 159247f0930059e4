//! Core queue abstractions: buckets, tasks, executors, events, and groups.

pub mod bucket_queue;
pub mod error;
pub mod events;
pub mod executor;
pub mod expiry;
mod group;
pub mod queue;
pub mod task;

pub use bucket_queue::BucketQueue;
pub use error::{AppResult, SchedulerError};
pub use events::{EventKind, QueueEvent};
pub use executor::{executor_fn, FnExecutor, TaskExecutor, TaskPayload};
pub use expiry::ExpiryState;
pub use queue::{Queue, QueueStats};
pub use task::{CompletionCallback, PushOptions, TaskEvent, TaskId};
