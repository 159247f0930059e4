//! Lifecycle events emitted by queues.
//!
//! Each queue keeps a list of unbounded subscriber channels. Groups forward
//! every event they emit to their parent, which forwards it further up, so a
//! root queue observes the activity of its whole group tree.

use std::fmt;

use super::task::TaskEvent;

/// Event kinds, printed with the names collaborators subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `new`
    New,
    /// `complete`
    Complete,
    /// `failed`
    Failed,
    /// `timeout`
    Timeout,
    /// `newgroup`
    NewGroup,
    /// `groupdestroy`
    GroupDestroy,
}

impl EventKind {
    /// Wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::NewGroup => "newgroup",
            Self::GroupDestroy => "groupdestroy",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event of a queue or one of its groups.
#[derive(Debug, Clone)]
pub enum QueueEvent<P> {
    /// A task was enqueued.
    New(TaskEvent<P>),
    /// The executor finished the task successfully.
    Complete(TaskEvent<P>),
    /// The executor returned an error or panicked.
    Failed {
        /// Affected task.
        task: TaskEvent<P>,
        /// Rendered error.
        error: String,
    },
    /// The task exceeded its time budget and was abandoned.
    Timeout(TaskEvent<P>),
    /// A group was created.
    NewGroup {
        /// Group key.
        name: String,
    },
    /// A group destroyed itself after being idle.
    GroupDestroy {
        /// Group key.
        name: String,
    },
}

impl<P> QueueEvent<P> {
    /// Kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::New(_) => EventKind::New,
            Self::Complete(_) => EventKind::Complete,
            Self::Failed { .. } => EventKind::Failed,
            Self::Timeout(_) => EventKind::Timeout,
            Self::NewGroup { .. } => EventKind::NewGroup,
            Self::GroupDestroy { .. } => EventKind::GroupDestroy,
        }
    }

    /// Task carried by task-level events.
    #[must_use]
    pub const fn task(&self) -> Option<&TaskEvent<P>> {
        match self {
            Self::New(task) | Self::Complete(task) | Self::Timeout(task) => Some(task),
            Self::Failed { task, .. } => Some(task),
            Self::NewGroup { .. } | Self::GroupDestroy { .. } => None,
        }
    }

    /// Group name carried by group-level events.
    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        match self {
            Self::NewGroup { name } | Self::GroupDestroy { name } => Some(name),
            _ => None,
        }
    }

    /// True for `complete`, `failed` and `timeout`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failed { .. } | Self::Timeout(_))
    }
}
