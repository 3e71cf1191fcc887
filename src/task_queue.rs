//! Thread-safe FIFO task queue with blocking and non-blocking consumers.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::types::Task;

/// A synchronized FIFO queue shared by generators and workers.
pub struct TaskQueue {
    inner: Mutex<VecDeque<Task>>,
    available: Condvar,
}

impl TaskQueue {
    /// Create an empty task queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Append a task and wake one blocked consumer.
    pub fn enqueue(&self, task: Task) {
        let mut guard = self.inner.lock().expect("task queue mutex poisoned");
        guard.push_back(task);
        self.available.notify_one();
    }

    /// Try to pop immediately without blocking.
    #[cfg(test)]
    pub fn try_dequeue(&self) -> Option<Task> {
        let mut guard = self.inner.lock().expect("task queue mutex poisoned");
        guard.pop_front()
    }

    /// Block until a task is available and return the oldest one.
    pub fn dequeue(&self) -> Task {
        let mut guard = self.inner.lock().expect("task queue mutex poisoned");
        loop {
            if let Some(task) = guard.pop_front() {
                return task;
            }
            // Wait releases the lock and re-acquires it before returning.
            guard = self.available.wait(guard).expect("condvar wait failed");
        }
    }

    /// Current number of queued tasks.
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("task queue mutex poisoned");
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
