//! Priority bucket queue: one FIFO list per priority level.
//!
//! Index 0 is the highest priority. Pushing to a priority beyond the current
//! bucket count grows the structure with empty buckets. Dequeue takes the
//! head of the lowest-indexed non-empty bucket, so ordering is
//! priority-then-arrival. There is no aging: a steady stream of high
//! priority work starves lower buckets.

use std::collections::VecDeque;

use crate::core::SchedulerError;

/// Ordered set of FIFO buckets indexed by priority.
#[derive(Debug)]
pub struct BucketQueue<T> {
    buckets: Vec<VecDeque<T>>,
    len: usize,
}

impl<T> Default for BucketQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BucketQueue<T> {
    /// Create an empty queue with no buckets.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buckets: Vec::new(),
            len: 0,
        }
    }

    /// Priority used when a caller does not pick one: the current bucket
    /// count, i.e. below every existing priority class.
    #[must_use]
    pub fn default_priority(&self) -> usize {
        self.buckets.len()
    }

    /// Append `item` to bucket `priority`, growing the bucket list as needed.
    pub fn push(&mut self, priority: usize, item: T) {
        if priority >= self.buckets.len() {
            self.buckets.resize_with(priority + 1, VecDeque::new);
        }
        self.buckets[priority].push_back(item);
        self.len += 1;
    }

    /// Remove the oldest item of the highest non-empty priority.
    ///
    /// Callers check [`len`](Self::len) first.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Invariant`] if every bucket is empty.
    pub fn pop_next(&mut self) -> Result<(usize, T), SchedulerError> {
        let found = self
            .buckets
            .iter_mut()
            .enumerate()
            .find_map(|(index, bucket)| bucket.pop_front().map(|item| (index, item)));

        match found {
            Some(entry) => {
                self.len -= 1;
                Ok(entry)
            }
            None => Err(SchedulerError::Invariant(format!(
                "expected the queue to contain entries since its size is {}",
                self.len
            ))),
        }
    }

    /// Total number of queued items across buckets.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when no bucket holds an item.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of priority levels allocated so far.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
