//! Task execution trait and payload abstraction.

use std::future::Future;

use async_trait::async_trait;

use super::AppResult;

/// Marker trait for task payloads.
///
/// Payloads are cloned into lifecycle events and moved across tokio tasks.
pub trait TaskPayload: Clone + Send + Sync + 'static {}

/// Blanket implementation: any type meeting the requirements is a `TaskPayload`.
impl<T> TaskPayload for T where T: Clone + Send + Sync + 'static {}

/// Caller-supplied function that performs the work of a task.
///
/// `Ok(())` emits `complete`; `Err` emits `failed`. The queue does not retry.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prism_queue::core::{AppResult, TaskExecutor};
///
/// struct Mailer;
///
/// #[async_trait]
/// impl TaskExecutor<String> for Mailer {
///     async fn execute(&self, recipient: String) -> AppResult<()> {
///         send_mail(&recipient).await
///     }
/// }
/// ```
#[async_trait]
pub trait TaskExecutor<P>: Send + Sync + 'static
where
    P: TaskPayload,
{
    /// Run the task for `payload`.
    async fn execute(&self, payload: P) -> AppResult<()>;
}

/// Adapter turning an async closure into a [`TaskExecutor`].
#[derive(Clone)]
pub struct FnExecutor<F> {
    func: F,
}

/// Wrap `func` as an executor.
///
/// ```rust,ignore
/// let queue = Queue::new(QueueConfig::default())?
///     .with_executor(executor_fn(|n: u32| async move {
///         tracing::info!(n, "working");
///         Ok(())
///     }));
/// ```
pub const fn executor_fn<F>(func: F) -> FnExecutor<F> {
    FnExecutor { func }
}

#[async_trait]
impl<P, F, Fut> TaskExecutor<P> for FnExecutor<F>
where
    P: TaskPayload,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn execute(&self, payload: P) -> AppResult<()> {
        (self.func)(payload).await
    }
}
