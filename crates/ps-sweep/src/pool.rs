//! Fixed-size worker pool with bounded tasks-per-worker retirement.
//!
//! Submission is fire-and-forget: [`WorkerPool::submit`] hands the task to
//! the shared queue and returns a [`TaskHandle`] immediately. The aggregator
//! drains handles strictly in submission order, which keeps best-candidate
//! tie-break deterministic even though workers complete out of order.
//!
//! Workers are plain OS threads. After completing `max_tasks_per_worker`
//! tasks a worker spawns its own replacement and exits, bounding memory
//! growth from long-running numeric internals. A panicking evaluator is
//! caught and surfaced as that candidate's failure; it never takes the pool
//! down.
//!
//! The pool shares a cancellation token with the drain side. Once the token
//! is set, workers report each remaining queued task as cancelled instead
//! of running it, so `join()` returns as soon as in-flight tasks finish
//! rather than after the whole queue has executed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use ps_types::{Candidate, CandidateOutcome, Evaluation, PsResult, SweepError};

/// How often a cancellable wait re-checks the cancellation token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

type Task = Box<dyn FnOnce() -> PsResult<Evaluation> + Send + 'static>;

struct QueuedTask {
    candidate: Candidate,
    run: Task,
    result_tx: Sender<CandidateOutcome>,
}

struct PoolShared {
    task_rx: Receiver<QueuedTask>,
    max_tasks: Option<usize>,
    cancel: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    next_worker_id: AtomicUsize,
}

/// Handle to one submitted task, returned immediately on submission.
/// Yields exactly one [`CandidateOutcome`].
#[derive(Debug)]
pub struct TaskHandle {
    candidate: Candidate,
    result_rx: Receiver<CandidateOutcome>,
}

impl TaskHandle {
    pub fn candidate(&self) -> Candidate {
        self.candidate
    }

    /// Block until the task finishes. A worker lost without reporting is
    /// surfaced as this candidate's failure rather than a panic.
    pub fn wait(self) -> CandidateOutcome {
        match self.result_rx.recv() {
            Ok(outcome) => outcome,
            Err(_) => CandidateOutcome::Failed {
                candidate: self.candidate,
                error: SweepError::WorkerLost {
                    candidate: self.candidate,
                }
                .to_string(),
            },
        }
    }

    /// Block until the task finishes, the timeout elapses, or the
    /// cancellation token is set, whichever comes first.
    ///
    /// The timeout clock starts here, when the drain reaches this handle,
    /// not at submission. It bounds the wait for this slot's result on top
    /// of the time already spent draining earlier slots; queue wait before
    /// the drain arrives is not counted separately.
    pub fn wait_cancellable(
        self,
        cancel: &AtomicBool,
        timeout: Option<Duration>,
    ) -> CandidateOutcome {
        let started = Instant::now();
        loop {
            if cancel.load(Ordering::Relaxed) {
                return CandidateOutcome::Failed {
                    candidate: self.candidate,
                    error: "cancelled".to_string(),
                };
            }
            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    return CandidateOutcome::Failed {
                        candidate: self.candidate,
                        error: SweepError::TaskTimeout {
                            candidate: self.candidate,
                            seconds: limit.as_secs(),
                        }
                        .to_string(),
                    };
                }
            }
            match self.result_rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(outcome) => return outcome,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return CandidateOutcome::Failed {
                        candidate: self.candidate,
                        error: SweepError::WorkerLost {
                            candidate: self.candidate,
                        }
                        .to_string(),
                    }
                }
            }
        }
    }
}

/// Fixed-size pool of evaluator workers.
pub struct WorkerPool {
    task_tx: Option<Sender<QueuedTask>>,
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Spawn `workers` threads consuming from a shared queue. Setting
    /// `cancel` makes workers skip queued tasks, reporting them cancelled.
    pub fn new(
        workers: usize,
        max_tasks_per_worker: Option<usize>,
        cancel: Arc<AtomicBool>,
    ) -> PsResult<Self> {
        let (task_tx, task_rx) = unbounded();
        let shared = Arc::new(PoolShared {
            task_rx,
            max_tasks: max_tasks_per_worker,
            cancel,
            handles: Mutex::new(Vec::new()),
            next_worker_id: AtomicUsize::new(0),
        });

        for _ in 0..workers.max(1) {
            spawn_worker(&shared)?;
        }

        Ok(Self {
            task_tx: Some(task_tx),
            shared,
        })
    }

    /// Fire-and-forget submission. Returns the handle the aggregator will
    /// drain in submission order.
    pub fn submit<F>(&self, candidate: Candidate, run: F) -> PsResult<TaskHandle>
    where
        F: FnOnce() -> PsResult<Evaluation> + Send + 'static,
    {
        let task_tx = self.task_tx.as_ref().ok_or(SweepError::PoolClosed)?;
        let (result_tx, result_rx) = bounded(1);
        task_tx
            .send(QueuedTask {
                candidate,
                run: Box::new(run),
                result_tx,
            })
            .map_err(|_| SweepError::PoolClosed)?;
        Ok(TaskHandle {
            candidate,
            result_rx,
        })
    }

    /// Stop accepting submissions. Tasks already queued still run.
    pub fn close(&mut self) {
        self.task_tx = None;
    }

    /// Close and wait for every worker thread to drain the queue and exit.
    pub fn join(mut self) {
        self.task_tx = None;
        // Retiring workers push their replacement's handle before exiting,
        // so an empty vec means every thread has been joined.
        loop {
            let handle = self.shared.handles.lock().pop();
            match handle {
                Some(handle) => {
                    let _ = handle.join();
                }
                None => break,
            }
        }
    }
}

fn spawn_worker(shared: &Arc<PoolShared>) -> PsResult<()> {
    let id = shared.next_worker_id.fetch_add(1, Ordering::Relaxed);
    let worker_shared = Arc::clone(shared);
    let handle = thread::Builder::new()
        .name(format!("sweep-worker-{id}"))
        .spawn(move || worker_loop(worker_shared))?;
    shared.handles.lock().push(handle);
    Ok(())
}

fn worker_loop(shared: Arc<PoolShared>) {
    let mut completed = 0usize;

    while let Ok(task) = shared.task_rx.recv() {
        let QueuedTask {
            candidate,
            run,
            result_tx,
        } = task;

        // Once cancelled, drain the queue without executing: report each
        // remaining slot so the aggregator and join() return promptly.
        if shared.cancel.load(Ordering::Relaxed) {
            let _ = result_tx.send(CandidateOutcome::Failed {
                candidate,
                error: "cancelled".to_string(),
            });
            continue;
        }

        let outcome = match catch_unwind(AssertUnwindSafe(run)) {
            Ok(Ok(evaluation)) => CandidateOutcome::Completed(evaluation),
            Ok(Err(err)) => {
                warn!("Candidate {candidate} failed: {err}");
                CandidateOutcome::Failed {
                    candidate,
                    error: err.to_string(),
                }
            }
            Err(payload) => {
                let message = panic_message(payload);
                warn!("Candidate {candidate} panicked: {message}");
                CandidateOutcome::Failed {
                    candidate,
                    error: format!("evaluator panicked: {message}"),
                }
            }
        };

        // The handle may already have been dropped (cancelled drain).
        let _ = result_tx.send(outcome);

        completed += 1;
        if let Some(ceiling) = shared.max_tasks {
            if completed >= ceiling {
                debug!("Worker retiring after {completed} tasks");
                if let Err(err) = spawn_worker(&shared) {
                    warn!("Failed to spawn replacement worker: {err}");
                }
                return;
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
