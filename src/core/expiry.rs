//! Idle-expiration state machine for groups.
//!
//! A group is destroyed only after two consecutive expiration ticks observe
//! it idle. The processing loop marks the group `Idle` when it drains and
//! `Active` when it dequeues work; ticks advance `Idle -> IdleConfirmed ->
//! Destroyed`. Any tick that sees queued or in-flight work resets to
//! `Active`.

/// Expiration state of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryState {
    /// Work was dequeued since the last tick.
    Active,
    /// No work observed; waiting for the first confirming tick.
    Idle,
    /// One tick has confirmed idleness; the next one destroys.
    IdleConfirmed,
    /// Terminal.
    Destroyed,
}

impl ExpiryState {
    /// Initial state of a freshly created group.
    #[must_use]
    pub const fn initial() -> Self {
        Self::Idle
    }

    /// Processing loop dequeued a task.
    pub fn mark_active(&mut self) {
        if *self != Self::Destroyed {
            *self = Self::Active;
        }
    }

    /// Processing loop observed zero in-flight and zero queued tasks.
    pub fn mark_idle(&mut self) {
        if *self == Self::Active {
            *self = Self::Idle;
        }
    }

    /// Advance on an expiration tick. Returns true exactly once, on the
    /// transition into [`ExpiryState::Destroyed`].
    pub fn tick(&mut self, busy: bool) -> bool {
        let next = match (*self, busy) {
            (Self::Destroyed, _) => return false,
            (_, true) => Self::Active,
            (Self::Active, false) => Self::Idle,
            (Self::Idle, false) => Self::IdleConfirmed,
            (Self::IdleConfirmed, false) => Self::Destroyed,
        };
        *self = next;
        next == Self::Destroyed
    }

    /// True once destroyed.
    #[must_use]
    pub fn is_destroyed(self) -> bool {
        self == Self::Destroyed
    }
}
