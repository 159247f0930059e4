//! Queue and group configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::duration::{resolve_ms, DurationSpec};

/// Default pause before each task starts.
pub const DEFAULT_DELAY: &str = ".5s";
/// Default time budget of a task.
pub const DEFAULT_TIMEOUT: &str = "1m";
/// Default group idle period.
pub const DEFAULT_EXPIRATION: &str = "10s";

/// What happens to an executor that overruns its timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Stop tracking the task but let its future run to completion.
    #[default]
    Abandon,
    /// Abort the task's future.
    Cancel,
}

/// Overrides applied to groups created by [`Queue::group`](crate::core::Queue::group).
///
/// Unset fields are inherited from the parent queue, except `concurrency`
/// which defaults to 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Delay before each group task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DurationSpec>,
    /// Concurrency of each group (default 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// Timeout of group tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<DurationSpec>,
    /// Idle period after which a group destroys itself (default 10s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DurationSpec>,
}

/// Queue configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Delay a free worker waits before starting a task (default 500ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DurationSpec>,
    /// Number of simultaneously running tasks (default 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// Time budget of a task (default 1 minute, 0 disables).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<DurationSpec>,
    /// Behavior on timeout.
    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,
    /// Settings for keyed sub-queues.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<GroupConfig>,
}

/// Settings resolved to concrete values, as used by a running queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    /// Pre-execution delay.
    pub delay: Duration,
    /// Task timeout; zero disables the race.
    pub timeout: Duration,
    /// Concurrency bound.
    pub concurrency: usize,
    /// Group idle period; zero disables expiration.
    pub expiration: Duration,
    /// Behavior on timeout.
    pub timeout_policy: TimeoutPolicy,
}

impl QueueConfig {
    /// Configuration with every setting at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pre-execution delay.
    #[must_use]
    pub fn with_delay(mut self, delay: impl Into<DurationSpec>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    /// Set the concurrency bound.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Set the task timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: impl Into<DurationSpec>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Set the timeout policy.
    #[must_use]
    pub const fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    /// Set the group overrides.
    #[must_use]
    pub fn with_groups(mut self, groups: GroupConfig) -> Self {
        self.groups = Some(groups);
        self
    }

    /// Resolve every setting, applying defaults.
    ///
    /// # Errors
    ///
    /// Fails on zero concurrency or an unparseable duration.
    pub fn resolve(&self) -> Result<QueueSettings, SchedulerError> {
        let concurrency = self.concurrency.unwrap_or(1);
        if concurrency == 0 {
            return Err(SchedulerError::InvalidConcurrency(concurrency));
        }
        let groups = self.groups.as_ref();
        Ok(QueueSettings {
            delay: Duration::from_millis(resolve_ms(self.delay.as_ref(), DEFAULT_DELAY, "delay")?),
            timeout: Duration::from_millis(resolve_ms(
                self.timeout.as_ref(),
                DEFAULT_TIMEOUT,
                "timeout",
            )?),
            concurrency,
            expiration: Duration::from_millis(resolve_ms(
                groups.and_then(|g| g.expiration.as_ref()),
                DEFAULT_EXPIRATION,
                "groups.expiration",
            )?),
            timeout_policy: self.timeout_policy,
        })
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Same conditions as [`resolve`](Self::resolve), plus zero group
    /// concurrency.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        self.resolve()?;
        self.for_group().resolve()?;
        Ok(())
    }

    /// Configuration of a group spawned by a queue with this configuration:
    /// the parent settings with concurrency forced to 1, then the `groups`
    /// overrides. The `groups` section itself is kept so nested groups
    /// inherit it.
    #[must_use]
    pub fn for_group(&self) -> Self {
        let mut merged = Self {
            concurrency: Some(1),
            ..self.clone()
        };
        if let Some(groups) = &self.groups {
            if groups.delay.is_some() {
                merged.delay.clone_from(&groups.delay);
            }
            if groups.concurrency.is_some() {
                merged.concurrency = groups.concurrency;
            }
            if groups.timeout.is_some() {
                merged.timeout.clone_from(&groups.timeout);
            }
        }
        merged
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] on malformed JSON and the
    /// [`validate`](Self::validate) errors otherwise.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read configuration from `QUEUE_*` environment variables, loading a
    /// `.env` file first when present.
    ///
    /// Recognized: `QUEUE_DELAY`, `QUEUE_CONCURRENCY`, `QUEUE_TIMEOUT`,
    /// `QUEUE_GROUP_DELAY`, `QUEUE_GROUP_CONCURRENCY`, `QUEUE_GROUP_TIMEOUT`,
    /// `QUEUE_GROUP_EXPIRATION`.
    ///
    /// # Errors
    ///
    /// Fails when a concurrency variable is not an integer or validation fails.
    pub fn from_env() -> Result<Self, SchedulerError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, SchedulerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let duration = |key: &str| lookup(key).map(DurationSpec::from);
        let count = |key: &str| -> Result<Option<usize>, SchedulerError> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<usize>()
                        .map_err(|e| SchedulerError::InvalidConfig(format!("{key}: {e}")))
                })
                .transpose()
        };

        let groups = GroupConfig {
            delay: duration("QUEUE_GROUP_DELAY"),
            concurrency: count("QUEUE_GROUP_CONCURRENCY")?,
            timeout: duration("QUEUE_GROUP_TIMEOUT"),
            expiration: duration("QUEUE_GROUP_EXPIRATION"),
        };
        let cfg = Self {
            delay: duration("QUEUE_DELAY"),
            concurrency: count("QUEUE_CONCURRENCY")?,
            timeout: duration("QUEUE_TIMEOUT"),
            timeout_policy: TimeoutPolicy::default(),
            groups: (groups != GroupConfig::default()).then_some(groups),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/// A named set of queues, e.g. one per background job module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueuesConfig {
    /// Map of queue name to configuration.
    pub queues: HashMap<String, QueueConfig>,
}

impl QueuesConfig {
    /// Validate all queues and ensure at least one exists.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] naming the first bad queue.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.queues.is_empty() {
            return Err(SchedulerError::InvalidConfig(
                "at least one queue must be defined".into(),
            ));
        }
        for (name, queue) in &self.queues {
            queue.validate().map_err(|e| {
                SchedulerError::InvalidConfig(format!("queue `{name}` invalid: {e}"))
            })?;
        }
        Ok(())
    }

    /// Parse a queue set from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Malformed JSON or any invalid queue.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
