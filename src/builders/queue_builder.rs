//! Build named queues from a [`QueuesConfig`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::{QueueConfig, QueuesConfig};
use crate::core::{Queue, SchedulerError, TaskExecutor, TaskPayload};

/// Create one queue per configured name, wiring the executor produced by
/// `executor_factory` for that name.
///
/// # Errors
///
/// Fails if the configuration is invalid, the factory refuses a queue, or
/// no tokio runtime is current.
pub fn build_queues<P, FE>(
    cfg: &QueuesConfig,
    mut executor_factory: FE,
) -> Result<HashMap<String, Queue<P>>, SchedulerError>
where
    P: TaskPayload,
    FE: FnMut(&str, &QueueConfig) -> Result<Arc<dyn TaskExecutor<P>>, SchedulerError>,
{
    cfg.validate()?;

    let mut queues = HashMap::with_capacity(cfg.queues.len());
    for (name, queue_cfg) in &cfg.queues {
        let executor = executor_factory(name, queue_cfg)?;
        let queue = Queue::new(queue_cfg.clone())?;
        queue.set_shared_executor(executor);
        debug!(queue = %name, settings = ?queue.settings(), "queue created");
        queues.insert(name.clone(), queue);
    }

    Ok(queues)
}
