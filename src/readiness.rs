//! Readiness gating for composed calls.
//!
//! A target may carry a readiness collaborator. While it reports not-ready,
//! composed calls register a one-time callback and suspend until the
//! collaborator fires it. A failure is handed to every waiting call
//! unchanged.
//!
//! [`TaskQueue`] is the bundled collaborator: it starts not-ready, queues
//! callbacks in FIFO order and drains them on [`TaskQueue::ready`] or
//! [`TaskQueue::fail`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{Result, WrapError};

/// One-time readiness callback. Receives `None` on readiness, `Some(err)` on failure.
pub type ReadyCallback = Box<dyn FnOnce(Option<WrapError>) + Send>;

/// External readiness signal consulted before each composed call.
pub trait Readiness: Send + Sync + 'static {
    /// Check if calls may proceed immediately.
    fn is_ready(&self) -> bool;

    /// Register a callback invoked exactly once when readiness is reached or fails.
    fn add_task(&self, task: ReadyCallback);
}

/// Shared readiness reference.
pub type ReadinessRef = Arc<dyn Readiness>;

/// Suspend until `readiness` reports ready.
///
/// Returns immediately if already ready. A dropped callback counts as a
/// readiness failure.
pub async fn wait_ready(readiness: &dyn Readiness) -> Result<()> {
    if readiness.is_ready() {
        return Ok(());
    }

    let (tx, rx) = oneshot::channel();
    readiness.add_task(Box::new(move |error| {
        let _ = tx.send(error);
    }));

    match rx.await {
        Ok(None) => Ok(()),
        Ok(Some(error)) => Err(error),
        Err(_) => Err(WrapError::NotReady(
            "readiness callback dropped".to_string(),
        )),
    }
}

#[derive(Debug, Default)]
enum Status {
    #[default]
    Pending,
    Ready,
    Failed(WrapError),
}

#[derive(Default)]
struct QueueState {
    status: Status,
    tasks: VecDeque<ReadyCallback>,
}

/// Task queue that holds callbacks until the owner opens it.
///
/// Clones share state, so one clone can be handed to a target while the
/// owner keeps another to signal readiness.
#[derive(Clone, Default)]
pub struct TaskQueue {
    /// Lock-free fast path for `is_ready`.
    ready: Arc<AtomicBool>,
    state: Arc<Mutex<QueueState>>,
}

impl TaskQueue {
    /// Create a new queue in the not-ready state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that is already ready.
    pub fn ready_now() -> Self {
        let queue = Self::new();
        queue.ready();
        queue
    }

    /// Mark the queue ready and run every queued callback with `None`.
    ///
    /// Has no effect once the queue is ready or failed.
    pub fn ready(&self) {
        let tasks = {
            let mut state = self.state.lock();
            if !matches!(state.status, Status::Pending) {
                return;
            }
            state.status = Status::Ready;
            self.ready.store(true, Ordering::Release);
            std::mem::take(&mut state.tasks)
        };

        tracing::debug!("Task queue ready, releasing {} waiting calls", tasks.len());
        for task in tasks {
            task(None);
        }
    }

    /// Mark the queue failed and run every queued callback with `error`.
    ///
    /// Callbacks added later receive the same error. Has no effect once the
    /// queue is ready or failed.
    pub fn fail(&self, error: WrapError) {
        let tasks = {
            let mut state = self.state.lock();
            if !matches!(state.status, Status::Pending) {
                return;
            }
            state.status = Status::Failed(error.clone());
            std::mem::take(&mut state.tasks)
        };

        tracing::warn!("Task queue failed: {}", error);
        for task in tasks {
            task(Some(error.clone()));
        }
    }

    /// Number of callbacks waiting for readiness.
    pub fn pending_count(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Check if the queue has failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.state.lock().status, Status::Failed(_))
    }
}

impl Readiness for TaskQueue {
    #[inline]
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn add_task(&self, task: ReadyCallback) {
        let outcome = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            match &state.status {
                Status::Pending => {
                    state.tasks.push_back(task);
                    return;
                }
                Status::Ready => None,
                Status::Failed(error) => Some(error.clone()),
            }
        };
        // Callbacks run outside the lock so they may touch the queue.
        task(outcome);
    }
}
