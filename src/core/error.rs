//! Error types for queue operations.

use thiserror::Error;

/// Errors produced by queue construction and bookkeeping.
///
/// Task failures are not errors of the queue: they surface as
/// [`QueueEvent::Failed`](crate::core::QueueEvent::Failed) events.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Concurrency must be at least one.
    #[error("'concurrency' must be greater than 0 (got {0})")]
    InvalidConcurrency(usize),
    /// A duration setting could not be parsed.
    #[error("invalid duration for `{field}`: {value}")]
    InvalidDuration {
        /// Configuration field name.
        field: String,
        /// Offending value.
        value: String,
    },
    /// Configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A queue was created outside a tokio runtime without a handle.
    #[error("no tokio runtime available (see `Queue::new_with_handle`)")]
    NoRuntime,
    /// Internal bookkeeping disagreed with the queue contents.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Application-facing result using anyhow, returned by executors.
pub type AppResult<T> = Result<T, anyhow::Error>;
