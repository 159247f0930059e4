//! # Prism Queue
//!
//! Priority-bucketed background task queues with a concurrency gate,
//! per-task timeouts, and self-expiring keyed sub-queues.
//!
//! A [`Queue`](core::Queue) accepts payloads, orders them by priority
//! (0 is highest, FIFO within a level), and hands them to a caller-supplied
//! [`TaskExecutor`](core::TaskExecutor) while never running more than
//! `concurrency` of them at once. Each task may be delayed before it starts
//! and is raced against a timeout. Outcomes are reported as lifecycle
//! events rather than returned to the caller of `push`.
//!
//! ## Key Features
//!
//! - **Priority buckets**: unbounded priority levels, strict FIFO inside a level
//! - **Self-driving loop**: every push and every finished task re-enters scheduling
//! - **Abandon-on-timeout**: a timed-out executor is left running by default,
//!   or aborted with [`TimeoutPolicy::Cancel`](config::TimeoutPolicy::Cancel)
//! - **Groups**: `queue.group(key)` gives a per-key queue (e.g. one per mail
//!   recipient) that inherits settings, bubbles its events to the parent,
//!   and destroys itself after a period of inactivity
//! - **Lossless events**: every subscriber gets its own unbounded channel
//!
//! ## Example
//!
//! ```rust,ignore
//! use prism_queue::config::{GroupConfig, QueueConfig};
//! use prism_queue::core::{executor_fn, Queue, QueueEvent};
//!
//! let mail = Queue::new(
//!     QueueConfig::new()
//!         .with_concurrency(4)
//!         .with_timeout("30s")
//!         .with_groups(GroupConfig { expiration: Some("1m".into()), ..Default::default() }),
//! )?
//! .with_executor(executor_fn(|msg: Message| async move { smtp::send(msg).await }));
//!
//! let mut events = mail.subscribe();
//! mail.group(recipient.address.clone()).push(message);
//!
//! while let Some(event) = events.recv().await {
//!     if let QueueEvent::Failed { task, error } = event {
//!         tracing::warn!(%error, "retrying {}", task.id);
//!         mail.push(task.payload);
//!     }
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core queue abstractions, lifecycle events, and group management.
pub mod core;
/// Configuration models for queues, groups, and timeouts.
pub mod config;
/// Builders to construct named queues from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
