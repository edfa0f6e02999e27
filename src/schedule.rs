//! Deferred-execution queue for continuation dispatch.
//!
//! The promise primitive consumes exactly one thing from its environment: a
//! way to defer a zero-argument action to run after the current synchronous
//! execution completes. [`Schedule`] is that seam; [`TaskQueue`] is the
//! provided implementation, a single-logical-thread FIFO driver in the
//! spirit of a microtask queue.
//!
//! # Determinism
//!
//! `TaskQueue` executes tasks in exactly the order they were deferred.
//! Tasks deferred while a pump is running join the back of the same queue
//! and run in the same pump, so a chain of continuations drains fully in
//! one `run_until_quiescent` call.
//!
//! # Example
//!
//! ```
//! use deferral::{Schedule, TaskQueue};
//!
//! let queue = TaskQueue::new();
//! queue.defer(Box::new(|| println!("later")));
//! assert!(!queue.is_quiescent());
//! let steps = queue.run_until_quiescent();
//! assert_eq!(steps, 1);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

/// A zero-argument action deferred to run after the current synchronous
/// call stack unwinds.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A scheduling seam: anything that can defer a [`Task`] for later
/// execution.
///
/// Implementations must preserve per-instance FIFO order: two tasks
/// deferred to the same scheduler, in order, run in that order.
pub trait Schedule: Send + Sync {
    /// Defers a task to run after the current synchronous execution
    /// completes.
    fn defer(&self, task: Task);
}

/// Configuration for a [`TaskQueue`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueConfig {
    /// Maximum number of tasks a single `run_until_quiescent` call may
    /// execute. `None` means unbounded (the default). A bounded pump that
    /// hits the limit stops with tasks still queued; `is_quiescent`
    /// distinguishes the two outcomes.
    pub max_steps: Option<u64>,
}

impl QueueConfig {
    /// Creates the default (unbounded) configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self { max_steps: None }
    }

    /// Sets the per-pump step limit.
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// Counters describing what a [`TaskQueue`] has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueMetrics {
    /// Total tasks ever deferred.
    pub deferred: u64,
    /// Total tasks executed.
    pub ran: u64,
    /// Deepest the queue has ever been.
    pub high_water: usize,
}

struct QueueInner {
    tasks: VecDeque<Task>,
    metrics: QueueMetrics,
}

/// A FIFO deferred-execution queue.
///
/// This is the reference [`Schedule`] implementation: deterministic,
/// single-logical-thread, driven explicitly by its owner via [`step`] or
/// [`run_until_quiescent`]. The queue's mutex is never held while a task
/// runs, so tasks may freely defer further work.
///
/// [`step`]: TaskQueue::step
/// [`run_until_quiescent`]: TaskQueue::run_until_quiescent
pub struct TaskQueue {
    inner: Mutex<QueueInner>,
    config: QueueConfig,
}

impl TaskQueue {
    /// Creates a new empty queue with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueueConfig::new())
    }

    /// Creates a new empty queue with the given configuration.
    #[must_use]
    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                tasks: VecDeque::new(),
                metrics: QueueMetrics::default(),
            }),
            config,
        }
    }

    /// Returns a reference to the configuration.
    #[must_use]
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Executes a single queued task.
    ///
    /// Returns `false` if the queue was empty. The queue lock is released
    /// before the task runs.
    pub fn step(&self) -> bool {
        let task = {
            let mut inner = self.inner.lock().expect("task queue lock poisoned");
            inner.tasks.pop_front()
        };
        let Some(task) = task else {
            return false;
        };
        task();
        let mut inner = self.inner.lock().expect("task queue lock poisoned");
        inner.metrics.ran += 1;
        true
    }

    /// Pumps the queue until it is empty or the configured step limit is
    /// reached, returning the number of tasks executed.
    pub fn run_until_quiescent(&self) -> u64 {
        let mut steps = 0u64;
        loop {
            if let Some(max) = self.config.max_steps {
                if steps >= max {
                    break;
                }
            }
            if !self.step() {
                break;
            }
            steps += 1;
        }
        steps
    }

    /// Returns true if no tasks are queued.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.inner
            .lock()
            .expect("task queue lock poisoned")
            .tasks
            .is_empty()
    }

    /// Returns the number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner
            .lock()
            .expect("task queue lock poisoned")
            .tasks
            .len()
    }

    /// Returns a snapshot of the queue's counters.
    #[must_use]
    pub fn metrics(&self) -> QueueMetrics {
        self.inner
            .lock()
            .expect("task queue lock poisoned")
            .metrics
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule for TaskQueue {
    fn defer(&self, task: Task) {
        let mut inner = self.inner.lock().expect("task queue lock poisoned");
        inner.tasks.push_back(task);
        inner.metrics.deferred += 1;
        let depth = inner.tasks.len();
        if depth > inner.metrics.high_water {
            inner.metrics.high_water = depth;
        }
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().expect("task queue lock poisoned");
        f.debug_struct("TaskQueue")
            .field("pending", &inner.tasks.len())
            .field("metrics", &inner.metrics)
            .field("config", &self.config)
            .finish()
    }
}
