//! Task identifiers and queued task records.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier assigned to every pushed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Callback run once when a task completes successfully.
pub type CompletionCallback<P> = Box<dyn FnOnce(&TaskEvent<P>) + Send + 'static>;

/// Per-push options.
pub struct PushOptions<P> {
    /// Priority bucket; `None` means the lowest existing priority.
    pub priority: Option<usize>,
    /// Invoked exactly once, only on success.
    pub on_complete: Option<CompletionCallback<P>>,
}

impl<P> Default for PushOptions<P> {
    fn default() -> Self {
        Self {
            priority: None,
            on_complete: None,
        }
    }
}

impl<P> PushOptions<P> {
    /// Options with only a priority.
    #[must_use]
    pub const fn priority(priority: usize) -> Self {
        Self {
            priority: Some(priority),
            on_complete: None,
        }
    }

    /// Attach a completion callback.
    #[must_use]
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&TaskEvent<P>) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

impl<P> fmt::Debug for PushOptions<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushOptions")
            .field("priority", &self.priority)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// A task sitting in a bucket, owned by the queue until dequeued.
pub(crate) struct Task<P> {
    pub id: TaskId,
    pub payload: P,
    pub on_complete: Option<CompletionCallback<P>>,
}

impl<P: Clone> Task<P> {
    pub fn event(&self) -> TaskEvent<P> {
        TaskEvent {
            id: self.id,
            payload: self.payload.clone(),
        }
    }
}

/// Task data carried by lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent<P> {
    /// Task identifier returned by `push`.
    pub id: TaskId,
    /// Payload as pushed.
    pub payload: P,
}
