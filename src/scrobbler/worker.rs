// Submission worker
// A single background thread drains the listen queue and submits it as one batch,
// backing off and retrying the whole batch after any failure

use super::error::SubmitError;
use super::listenbrainz::{Endpoint, SubmitRequest};
use super::queue::{ListenQueue, WorkerState};
use super::traits::Transport;
use crate::listen::Listen;
use backoff::backoff::{Backoff, Constant};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(60);

type Outcome = Option<Result<u16, SubmitError>>;

/// Lets the owner of the worker abandon an in-flight request
#[derive(Clone, Default)]
pub struct InterruptHandle {
    inner: Arc<Mutex<InterruptInner>>,
}

#[derive(Default)]
struct InterruptInner {
    killed: bool,
    waiter: Option<Sender<Outcome>>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InterruptInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Interrupt the current request, if any, and every later one
    pub fn kill(&self) {
        let mut inner = self.lock();
        inner.killed = true;
        if let Some(waiter) = inner.waiter.take() {
            let _ = waiter.send(None);
        }
    }

    pub fn is_killed(&self) -> bool {
        self.lock().killed
    }

    /// Run a blocking request on a helper thread and wait for either its result or a kill.
    /// An abandoned request keeps running until its own timeouts end it; its result is
    /// discarded.
    pub fn run<F>(&self, request: F) -> Result<u16, SubmitError>
    where
        F: FnOnce() -> Result<u16, SubmitError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Outcome>();
        {
            let mut inner = self.lock();
            if inner.killed {
                return Err(SubmitError::Interrupted);
            }
            inner.waiter = Some(tx.clone());
        }

        let spawned = thread::Builder::new()
            .name("listen-request".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(request))
                    .unwrap_or(Err(SubmitError::NoResponse));
                let _ = tx.send(Some(result));
            });

        let outcome = match spawned {
            Ok(_) => match rx.recv() {
                Ok(Some(result)) => result,
                Ok(None) => Err(SubmitError::Interrupted),
                Err(_) => Err(SubmitError::NoResponse),
            },
            Err(e) => Err(SubmitError::Thread(e)),
        };

        self.lock().waiter = None;
        outcome
    }
}

/// Owner handle of the background submission thread
pub struct Submitter {
    queue: Arc<ListenQueue>,
    interrupt: InterruptHandle,
    thread: Option<JoinHandle<()>>,
}

impl Submitter {
    /// Start the worker thread on `queue`
    pub fn spawn(
        queue: Arc<ListenQueue>,
        transport: Arc<dyn Transport>,
        endpoint: Endpoint,
        retry_interval: Duration,
    ) -> std::io::Result<Self> {
        let interrupt = InterruptHandle::new();
        let worker = Worker {
            queue: Arc::clone(&queue),
            transport,
            endpoint,
            interrupt: interrupt.clone(),
            retry_interval,
        };

        let thread = thread::Builder::new()
            .name("listen-submitter".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            queue,
            interrupt,
            thread: Some(thread),
        })
    }

    /// Stop the worker and wait for its thread to exit. Unsent listens are dropped.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.queue.shutdown();
        self.interrupt.kill();

        if thread.join().is_err() {
            log::error!("Submission worker panicked");
        }

        let dropped = self.queue.len();
        if dropped > 0 {
            log::info!("Dropping {} unsent listen(s)", dropped);
        }
    }
}

impl Drop for Submitter {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    queue: Arc<ListenQueue>,
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
    interrupt: InterruptHandle,
    retry_interval: Duration,
}

impl Worker {
    fn run(self) {
        let mut backoff = Constant::new(self.retry_interval);
        let mut should_wait = false;

        log::debug!("{}: Submission worker started", self.endpoint.name);

        loop {
            if should_wait {
                let delay = backoff.next_backoff().unwrap_or(self.retry_interval);
                log::debug!("{}: Retrying in {}s", self.endpoint.name, delay.as_secs());
                if !self.queue.wait_backoff(delay) {
                    break;
                }
            }

            let Some(batch) = self.queue.wait_for_work() else {
                break;
            };

            self.queue.set_worker_state(WorkerState::Submitting);
            match self.submit(&batch) {
                Ok(()) => {
                    self.queue.remove_submitted(batch.len());
                    log::info!(
                        "{}: Submitted {} listen(s)",
                        self.endpoint.name,
                        batch.len()
                    );
                    backoff.reset();
                    should_wait = false;
                }
                Err(SubmitError::Interrupted) => {
                    log::debug!("{}: Submission interrupted", self.endpoint.name);
                    should_wait = true;
                }
                Err(SubmitError::Unauthorized) => {
                    log::error!(
                        "{}: Authentication error, check the user token",
                        self.endpoint.name
                    );
                    should_wait = true;
                }
                Err(e) => {
                    log::warn!("{}: Could not transmit listens: {}", self.endpoint.name, e);
                    should_wait = true;
                }
            }
        }

        self.queue.set_worker_state(WorkerState::Stopped);
        log::debug!("{}: Submission worker stopped", self.endpoint.name);
    }

    /// Submit one batch; the queue lock is not held here
    fn submit(&self, batch: &[Listen]) -> Result<(), SubmitError> {
        let request = SubmitRequest::new(&self.endpoint, batch)?;
        let transport = Arc::clone(&self.transport);
        let status = self.interrupt.run(move || transport.send(&request))?;
        SubmitError::check_status(status)
    }
}
