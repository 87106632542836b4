// Listen queue shared between the capture callbacks and the submission worker
// One mutex guards the queue, the current listen and the liveness flag; one condvar
// wakes the worker for new work or shutdown

use crate::listen::{CurrentListen, Listen};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Where the submission worker currently is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    WaitingForWork,
    BackoffWait,
    Submitting,
    Stopped,
}

#[derive(Debug)]
pub struct QueueState {
    pending: Vec<Listen>,
    pub current: CurrentListen,
    live: bool,
    worker: WorkerState,
}

impl QueueState {
    pub fn push(&mut self, listen: Listen) {
        self.pending.push(listen);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug)]
pub struct ListenQueue {
    state: Mutex<QueueState>,
    wakeup: Condvar,
}

impl Default for ListenQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: Vec::new(),
                current: CurrentListen::default(),
                live: true,
                worker: WorkerState::WaitingForWork,
            }),
            wakeup: Condvar::new(),
        }
    }

    /// Lock the shared state. A panic on another thread does not make the listens invalid,
    /// so a poisoned lock is recovered.
    pub fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake the worker so it re-checks the queue and liveness
    pub fn notify(&self) {
        self.wakeup.notify_all();
    }

    pub fn push(&self, listen: Listen) {
        self.lock().push(listen);
        self.notify();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every pending listen in submission order
    pub fn snapshot(&self) -> Vec<Listen> {
        self.lock().pending.clone()
    }

    /// Remove the first `count` listens once they were submitted successfully.
    /// Listens queued while the request was in flight stay in the queue.
    pub fn remove_submitted(&self, count: usize) {
        let mut state = self.lock();
        let count = count.min(state.pending.len());
        state.pending.drain(..count);
    }

    pub fn is_live(&self) -> bool {
        self.lock().live
    }

    /// Stop the worker. Pending listens are left in place and dropped with the queue.
    pub fn shutdown(&self) {
        self.lock().live = false;
        self.notify();
    }

    pub fn worker_state(&self) -> WorkerState {
        self.lock().worker
    }

    pub(crate) fn set_worker_state(&self, worker: WorkerState) {
        self.lock().worker = worker;
    }

    /// Block until there is something to submit, then return a snapshot of the queue.
    /// Returns `None` once the queue is shut down.
    pub(crate) fn wait_for_work(&self) -> Option<Vec<Listen>> {
        let mut state = self.lock();
        state.worker = WorkerState::WaitingForWork;
        let state = self
            .wakeup
            .wait_while(state, |s| s.live && s.pending.is_empty())
            .unwrap_or_else(PoisonError::into_inner);

        if !state.live {
            return None;
        }
        Some(state.pending.clone())
    }

    /// Sleep for `delay` unless the queue is shut down first. New listens do not cut the
    /// wait short. Returns whether the queue is still live.
    pub(crate) fn wait_backoff(&self, delay: Duration) -> bool {
        // A delay too large for an Instant means waiting until shutdown
        let deadline = Instant::now().checked_add(delay);
        let mut state = self.lock();
        state.worker = WorkerState::BackoffWait;

        while state.live {
            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    self.wakeup
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .wakeup
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }

        state.live
    }
}
