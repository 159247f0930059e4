//! Keyed sub-queues ("groups") and their idle expiration.
//!
//! `queue.group(key)` returns a queue dedicated to `key`, created on first
//! use with the parent's settings (concurrency 1 unless `groups.concurrency`
//! says otherwise) and the parent's executor. Its events bubble to the
//! parent. A ticker with period `groups.expiration` destroys the group once
//! two consecutive ticks find it idle; a later `group(key)` builds a fresh
//! one.

use std::sync::{Arc, Weak};

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::core::{QueueEvent, TaskPayload};

use super::queue::{Queue, Shared};

impl<P: TaskPayload> Queue<P> {
    /// Look up or lazily create the group for `name`.
    ///
    /// Repeated calls return handles to the same queue until it expires.
    pub fn group(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        let (group, created) = {
            let mut state = self.shared.state.lock();
            let live = state
                .groups
                .get(&name)
                .filter(|existing| !existing.shared.state.lock().expiry.is_destroyed())
                .cloned();
            match live {
                Some(existing) => (existing, false),
                None => {
                    let group = Self::from_parts(
                        self.shared.config.for_group(),
                        self.shared.group_settings.clone(),
                        self.shared.group_settings.clone(),
                        Some(name.clone()),
                        Some(Arc::downgrade(&self.shared)),
                        self.shared.runtime.clone(),
                    );
                    *group.shared.executor.write() = self.shared.executor.read().clone();
                    state.groups.insert(name.clone(), group.clone());
                    (group, true)
                }
            }
        };

        if created {
            debug!(queue = %self.shared.label(), group = %name, "group created");
            group.start_expiration_timer();
            self.shared.emit(QueueEvent::NewGroup { name });
        }
        group
    }

    /// Keys of the live groups, sorted.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.state.lock().groups.keys().cloned().collect();
        names.sort();
        names
    }

    fn start_expiration_timer(&self) {
        let period = self.shared.settings.expiration;
        if period.is_zero() {
            return;
        }
        let group = Arc::downgrade(&self.shared);
        let timer = self.shared.runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(group) = group.upgrade() else {
                    break;
                };
                if group.expiration_tick() {
                    Shared::destroy(&group);
                    break;
                }
            }
        });
        *self.shared.expiration_timer.lock() = Some(timer);
    }
}

impl<P: TaskPayload> Shared<P> {
    /// Advance the idle state machine; true when the group must go.
    fn expiration_tick(&self) -> bool {
        let mut state = self.state.lock();
        let busy = state.inflight > 0 || !state.buckets.is_empty();
        let destroy = state.expiry.tick(busy);
        debug!(queue = %self.label(), busy, state = ?state.expiry, "expiration tick");
        destroy
    }

    /// Unregister from the parent and announce `groupdestroy` there.
    fn destroy(this: &Arc<Self>) {
        // Called from the timer task itself; detaching ends it.
        drop(this.expiration_timer.lock().take());

        let Some(parent) = this.parent.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        let name = this.label().to_owned();
        let removed = {
            let mut state = parent.state.lock();
            let registered = state
                .groups
                .get(&name)
                .is_some_and(|current| Arc::ptr_eq(&current.shared, this));
            if registered {
                state.groups.remove(&name)
            } else {
                None
            }
        };
        drop(removed);

        debug!(queue = %parent.label(), group = %name, "group destroyed");
        parent.emit(QueueEvent::GroupDestroy { name });
    }
}
