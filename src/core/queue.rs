//! Task queue: concurrency gate, delay and timeout enforcement, lifecycle events.
//!
//! A queue drives itself. Every push and every finished task re-enters the
//! processing loop, which dequeues while there is spare concurrency. There is
//! no background ticking thread; the only timers are the per-task delay, the
//! timeout race, and the expiration ticker of groups.
//!
//! All work is spawned on the runtime handle captured at construction, so
//! a queue can be fed from threads outside the runtime.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::{QueueConfig, QueueSettings, TimeoutPolicy};
use crate::core::{
    BucketQueue, ExpiryState, PushOptions, QueueEvent, SchedulerError, TaskEvent, TaskExecutor,
    TaskId, TaskPayload,
};

use super::task::Task;

/// Point-in-time view of a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks currently executing.
    pub inflight: usize,
    /// Tasks waiting in buckets.
    pub queued: usize,
    /// Concurrency bound.
    pub concurrency: usize,
    /// Priority levels allocated.
    pub buckets: usize,
    /// Live groups.
    pub groups: usize,
    /// Open event receivers, as of the last emitted event.
    pub subscribers: usize,
}

pub(crate) struct QueueState<P: TaskPayload> {
    pub buckets: BucketQueue<Task<P>>,
    pub inflight: usize,
    pub expiry: ExpiryState,
    pub groups: HashMap<String, Queue<P>>,
}

pub(crate) struct Shared<P: TaskPayload> {
    pub config: QueueConfig,
    pub settings: QueueSettings,
    /// Settings every group of this queue is created with.
    pub group_settings: QueueSettings,
    /// Group key; `None` for a root queue.
    pub name: Option<String>,
    /// Back-reference used only to bubble events and unregister on destroy.
    pub parent: Option<Weak<Shared<P>>>,
    pub state: Mutex<QueueState<P>>,
    pub executor: RwLock<Option<Arc<dyn TaskExecutor<P>>>>,
    /// Unbounded so a slow subscriber never loses an event.
    pub subscribers: Mutex<Vec<mpsc::UnboundedSender<QueueEvent<P>>>>,
    pub runtime: Handle,
    pub expiration_timer: Mutex<Option<JoinHandle<()>>>,
}

/// Priority queue of background tasks.
///
/// Cloning yields another handle to the same queue. Work is spawned on the
/// tokio runtime the queue was created in (or was handed).
///
/// ```rust,ignore
/// let mail = Queue::new(QueueConfig::new().with_concurrency(4))?
///     .with_executor(executor_fn(send_mail));
///
/// mail.push(message);
/// mail.group(recipient).push(other_message);
/// ```
pub struct Queue<P: TaskPayload> {
    pub(crate) shared: Arc<Shared<P>>,
}

impl<P: TaskPayload> Clone for Queue<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: TaskPayload> fmt::Debug for Queue<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.shared.name)
            .field("settings", &self.shared.settings)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<P: TaskPayload> Queue<P> {
    /// Create a root queue on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails fast on zero concurrency (including `groups.concurrency`), an
    /// unparseable duration, or when called outside a tokio runtime.
    pub fn new(config: QueueConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        Self::new_with_handle(config, runtime)
    }

    /// Create a root queue that spawns its work on `runtime`.
    ///
    /// # Errors
    ///
    /// Same configuration errors as [`new`](Self::new).
    pub fn new_with_handle(config: QueueConfig, runtime: Handle) -> Result<Self, SchedulerError> {
        config.validate()?;
        let settings = config.resolve()?;
        let group_settings = config.for_group().resolve()?;
        Ok(Self::from_parts(
            config,
            settings,
            group_settings,
            None,
            None,
            runtime,
        ))
    }

    pub(crate) fn from_parts(
        config: QueueConfig,
        settings: QueueSettings,
        group_settings: QueueSettings,
        name: Option<String>,
        parent: Option<Weak<Shared<P>>>,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                settings,
                group_settings,
                name,
                parent,
                state: Mutex::new(QueueState {
                    buckets: BucketQueue::new(),
                    inflight: 0,
                    expiry: ExpiryState::initial(),
                    groups: HashMap::new(),
                }),
                executor: RwLock::new(None),
                subscribers: Mutex::new(Vec::new()),
                runtime,
                expiration_timer: Mutex::new(None),
            }),
        }
    }

    /// Builder-style [`set_executor`](Self::set_executor).
    #[must_use]
    pub fn with_executor<E>(self, executor: E) -> Self
    where
        E: TaskExecutor<P>,
    {
        self.set_executor(executor);
        self
    }

    /// Assign the executor. Tasks pushed before an executor exists wait in
    /// their buckets and start now. Groups created afterwards inherit it;
    /// existing groups keep the one they were created with.
    pub fn set_executor<E>(&self, executor: E)
    where
        E: TaskExecutor<P>,
    {
        self.set_shared_executor(Arc::new(executor));
    }

    /// Assign an executor that is already shared with other queues.
    pub fn set_shared_executor(&self, executor: Arc<dyn TaskExecutor<P>>) {
        *self.shared.executor.write() = Some(executor);
        Shared::process(&self.shared);
    }

    /// Enqueue `payload` at the lowest existing priority.
    pub fn push(&self, payload: P) -> TaskId {
        self.push_with(payload, PushOptions::default())
    }

    /// Enqueue `payload` at `priority` (0 is the highest).
    pub fn push_with_priority(&self, payload: P, priority: usize) -> TaskId {
        self.push_with(payload, PushOptions::priority(priority))
    }

    /// Enqueue `payload` with explicit options. Returns immediately; the
    /// outcome is reported through events and the optional callback.
    pub fn push_with(&self, payload: P, options: PushOptions<P>) -> TaskId {
        let task = Task {
            id: TaskId::generate(),
            payload,
            on_complete: options.on_complete,
        };
        let id = task.id;
        let event = task.event();

        {
            let mut state = self.shared.state.lock();
            if state.expiry.is_destroyed() {
                warn!(
                    queue = %self.shared.label(),
                    task = %id,
                    "push to a destroyed group; it is no longer registered with its parent"
                );
            }
            let priority = options
                .priority
                .unwrap_or_else(|| state.buckets.default_priority());
            state.buckets.push(priority, task);
            debug!(queue = %self.shared.label(), task = %id, priority, "task enqueued");
        }

        self.shared.emit(QueueEvent::New(event));
        Shared::process(&self.shared);
        id
    }

    /// Receive every event of this queue and of its groups, from now on.
    ///
    /// Delivery is lossless; dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<QueueEvent<P>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.subscribers.lock().push(tx);
        rx
    }

    /// Snapshot of counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.shared.state.lock();
        QueueStats {
            inflight: state.inflight,
            queued: state.buckets.len(),
            concurrency: self.shared.settings.concurrency,
            buckets: state.buckets.bucket_count(),
            groups: state.groups.len(),
            subscribers: self.shared.subscribers.lock().len(),
        }
    }

    /// Tasks currently executing.
    #[must_use]
    pub fn inflight(&self) -> usize {
        self.shared.state.lock().inflight
    }

    /// Tasks waiting to start.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.state.lock().buckets.len()
    }

    /// Resolved settings.
    #[must_use]
    pub fn settings(&self) -> &QueueSettings {
        &self.shared.settings
    }

    /// Configuration this queue was created from.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// True for queues created by [`group`](Self::group).
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.shared.parent.is_some()
    }

    /// Group key, `None` for a root queue.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.shared.name.as_deref()
    }

    /// True when both handles refer to the same queue.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<P: TaskPayload> Shared<P> {
    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("root")
    }

    /// Publish to local subscribers, then forward up the group chain.
    pub(crate) fn emit(&self, event: QueueEvent<P>) {
        debug!(queue = %self.label(), event = %event.kind(), "queue event");
        // A failed send means the receiver is gone.
        self.subscribers.lock().retain(|tx| tx.send(event.clone()).is_ok());
        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) {
            parent.emit(event);
        }
    }

    /// Start as many queued tasks as the concurrency bound allows.
    pub(crate) fn process(this: &Arc<Self>) {
        loop {
            let (task, executor) = {
                let mut state = this.state.lock();
                if state.inflight == 0 && state.buckets.is_empty() {
                    if this.parent.is_some() {
                        state.expiry.mark_idle();
                    }
                    return;
                }
                if state.inflight >= this.settings.concurrency || state.buckets.is_empty() {
                    return;
                }
                let Some(executor) = this.executor.read().clone() else {
                    debug!(queue = %this.label(), "no executor assigned, tasks stay queued");
                    return;
                };

                let (priority, task) = match state.buckets.pop_next() {
                    Ok(entry) => entry,
                    Err(e) => {
                        error!(queue = %this.label(), error = %e, "failed to dequeue");
                        return;
                    }
                };
                state.expiry.mark_active();
                state.inflight += 1;
                debug!(
                    queue = %this.label(),
                    task = %task.id,
                    priority,
                    inflight = state.inflight,
                    "starting task"
                );
                (task, executor)
            };

            this.runtime.spawn(Self::run(Arc::clone(this), task, executor));
        }
    }

    /// Execute one task: optional delay, then the executor raced against
    /// the timeout.
    async fn run(this: Arc<Self>, task: Task<P>, executor: Arc<dyn TaskExecutor<P>>) {
        let delay = this.settings.delay;
        let timeout = this.settings.timeout;

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let Task {
            id,
            payload,
            on_complete,
        } = task;
        let event = TaskEvent {
            id,
            payload: payload.clone(),
        };

        // The executor runs as its own task so a timeout can leave it behind.
        let mut handle = this.runtime.spawn(async move { executor.execute(payload).await });

        let joined = if timeout.is_zero() {
            Some((&mut handle).await)
        } else {
            tokio::time::timeout(timeout, &mut handle).await.ok()
        };

        let outcome = match joined {
            Some(Ok(Ok(()))) => {
                debug!(queue = %this.label(), task = %id, "task complete");
                if let Some(callback) = on_complete {
                    if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                        error!(queue = %this.label(), task = %id, "completion callback panicked");
                    }
                }
                QueueEvent::Complete(event)
            }
            Some(Ok(Err(err))) => {
                warn!(queue = %this.label(), task = %id, error = %err, "task failed");
                QueueEvent::Failed {
                    task: event,
                    error: format!("{err:#}"),
                }
            }
            Some(Err(join_err)) => {
                warn!(queue = %this.label(), task = %id, error = %join_err, "task panicked");
                QueueEvent::Failed {
                    task: event,
                    error: join_err.to_string(),
                }
            }
            None => {
                warn!(
                    queue = %this.label(),
                    task = %id,
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    policy = ?this.settings.timeout_policy,
                    "task timed out"
                );
                match this.settings.timeout_policy {
                    TimeoutPolicy::Abandon => drop(handle),
                    TimeoutPolicy::Cancel => handle.abort(),
                }
                QueueEvent::Timeout(event)
            }
        };

        Self::cycle(&this, outcome);
    }

    /// Free the slot of a finished task, report it, and look for more work.
    fn cycle(this: &Arc<Self>, outcome: QueueEvent<P>) {
        {
            let mut state = this.state.lock();
            state.inflight = state.inflight.saturating_sub(1);
        }
        this.emit(outcome);
        Self::process(this);
    }
}

impl<P: TaskPayload> Drop for Shared<P> {
    fn drop(&mut self) {
        if let Some(timer) = self.expiration_timer.get_mut().take() {
            timer.abort();
        }
    }
}
