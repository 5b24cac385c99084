//! The single-worker execution engine.
//!
//! One dedicated thread drains a FIFO of [`Task`]s. Every piece of state the
//! worker shares with foreground threads sits behind one mutex; foreground
//! callers only ever block inside [`QueueHandle::wait_idle`].

use std::collections::VecDeque;
use std::ops::Deref;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use chrono::Utc;
use opentelemetry::KeyValue;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::task::{Task, TaskContext, TaskFailure, TaskId};
use crate::error::{Error, Result};
use crate::telemetry::{metrics, task as task_telemetry};

type IdleCallback = Box<dyn FnMut() + Send + 'static>;

/// Observable state of the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    /// Nothing pending, nothing executing.
    Idle,
    /// Draining. `task` is `None` between two tasks.
    Running {
        task: Option<TaskId>,
        label: Option<String>,
    },
    /// Abort requested; waiting for the executing task to return.
    AbortRequested,
}

struct RunningTask {
    id: TaskId,
    label: Option<String>,
    started: Instant,
}

struct QueueState {
    pending: VecDeque<Task>,
    current: Option<RunningTask>,
    /// False exactly when the engine is Idle.
    busy: bool,
    abort_requested: bool,
    /// Cancelled by `abort`; replaced once the aborted cycle drains.
    cancel: CancellationToken,
    exceptions: Vec<TaskFailure>,
    last_status: Option<String>,
    active_time: Duration,
    shutdown: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    work_ready: Condvar,
    became_idle: Condvar,
    on_idle: Mutex<Option<IdleCallback>>,
    worker_thread: OnceLock<ThreadId>,
}

impl Shared {
    fn fire_idle(&self) {
        // Taken out of the slot so the callback may call `on_idle` itself.
        let callback = self.on_idle.lock().take();
        let Some(mut callback) = callback else {
            return;
        };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback())) {
            warn!(panic = %panic_message(&*panic), "idle callback panicked");
        }
        // Held across the reinsert so a concurrent drop cannot miss it.
        let state = self.state.lock();
        if state.shutdown {
            return;
        }
        let mut slot = self.on_idle.lock();
        if slot.is_none() {
            *slot = Some(callback);
        }
    }
}

/// Cheap, cloneable handle to a running engine.
///
/// Everything except `wait_idle` returns promptly. Pipeline stages keep one
/// of these to schedule work; pollers use it to read status.
#[derive(Clone)]
pub struct QueueHandle {
    shared: Arc<Shared>,
}

impl QueueHandle {
    /// Append a task at the tail of the pending queue.
    ///
    /// Accepted even after an abort; the worker discards it at its next
    /// dequeue boundary instead of running it.
    pub fn enqueue(&self, task: Task) {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            drop(state);
            warn!(task_id = %task.id, label = ?task.label, "engine shut down, task dropped");
            return;
        }
        debug!(task_id = %task.id, label = ?task.label, "task enqueued");
        state.pending.push_back(task);
        state.busy = true;
        metrics::tasks_enqueued().add(1, &[]);
        self.shared.work_ready.notify_one();
    }

    /// Request cooperative cancellation.
    ///
    /// Waiting tasks are dropped without running and the cycle's
    /// cancellation token fires. The executing task is left alone. No-op
    /// when idle or when an abort is already pending.
    pub fn abort(&self) {
        let mut state = self.shared.state.lock();
        if !state.busy || state.abort_requested {
            return;
        }
        state.abort_requested = true;
        state.cancel.cancel();
        let discarded = std::mem::take(&mut state.pending);
        drop(state);

        info!(discarded = discarded.len(), "abort requested");
        record_discarded(discarded);
    }

    /// Block until the engine is idle.
    ///
    /// Errors with [`Error::WaitOnWorker`] when called from inside a task,
    /// which would otherwise never return.
    pub fn wait_idle(&self) -> Result<()> {
        self.check_not_worker()?;
        let mut state = self.shared.state.lock();
        while state.busy {
            self.shared.became_idle.wait(&mut state);
        }
        Ok(())
    }

    /// Like [`wait_idle`](Self::wait_idle) but gives up after `timeout`.
    /// Returns whether the engine is idle.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> Result<bool> {
        self.check_not_worker()?;
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.busy {
            if self
                .shared
                .became_idle
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return Ok(!state.busy);
            }
        }
        Ok(true)
    }

    pub fn is_idle(&self) -> bool {
        !self.shared.state.lock().busy
    }

    pub fn is_aborting(&self) -> bool {
        self.shared.state.lock().abort_requested
    }

    pub fn state(&self) -> WorkerState {
        let state = self.shared.state.lock();
        if !state.busy {
            WorkerState::Idle
        } else if state.abort_requested {
            WorkerState::AbortRequested
        } else {
            WorkerState::Running {
                task: state.current.as_ref().map(|c| c.id),
                label: state.current.as_ref().and_then(|c| c.label.clone()),
            }
        }
    }

    /// Tasks waiting to start (excludes the executing one).
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Most recent status published by a task, if any.
    pub fn last_status(&self) -> Option<String> {
        self.shared.state.lock().last_status.clone()
    }

    /// Total time spent executing tasks, including the one running now.
    pub fn active_time(&self) -> Duration {
        let state = self.shared.state.lock();
        let in_flight = state
            .current
            .as_ref()
            .map(|c| c.started.elapsed())
            .unwrap_or_default();
        state.active_time + in_flight
    }

    /// Drain the captured failures, oldest first.
    pub fn fetch_exceptions(&self) -> Vec<TaskFailure> {
        std::mem::take(&mut self.shared.state.lock().exceptions)
    }

    pub(crate) fn set_status(&self, status: impl Into<String>) {
        self.shared.state.lock().last_status = Some(status.into());
    }

    fn check_not_worker(&self) -> Result<()> {
        match self.shared.worker_thread.get() {
            Some(id) if *id == thread::current().id() => Err(Error::WaitOnWorker),
            _ => Ok(()),
        }
    }
}

/// The execution engine. Owns the worker thread.
///
/// Dereferences to [`QueueHandle`] for the non-blocking operations.
/// Dropping the engine drops any tasks still waiting and joins the worker
/// after the executing task returns.
pub struct WorkQueue {
    handle: QueueHandle,
    worker: Option<JoinHandle<()>>,
}

impl WorkQueue {
    /// Create an idle engine and start its worker thread.
    pub fn new() -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                current: None,
                busy: false,
                abort_requested: false,
                cancel: CancellationToken::new(),
                exceptions: Vec::new(),
                last_status: None,
                active_time: Duration::ZERO,
                shutdown: false,
            }),
            work_ready: Condvar::new(),
            became_idle: Condvar::new(),
            on_idle: Mutex::new(None),
            worker_thread: OnceLock::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("migrate-worker".to_string())
            .spawn(move || run_worker(worker_shared))?;
        let _ = shared.worker_thread.set(worker.thread().id());

        Ok(Self {
            handle: QueueHandle { shared },
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    /// Register the drain callback, replacing any previous one.
    ///
    /// Runs on the worker thread once per drain, before waiters in
    /// `wait_idle` are released.
    pub fn on_idle<F>(&self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        *self.handle.shared.on_idle.lock() = Some(Box::new(callback));
    }

    pub fn clear_on_idle(&self) {
        self.handle.shared.on_idle.lock().take();
    }
}

impl Deref for WorkQueue {
    type Target = QueueHandle;

    fn deref(&self) -> &QueueHandle {
        &self.handle
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        let shared = &self.handle.shared;
        let leftover = {
            let mut state = shared.state.lock();
            state.shutdown = true;
            std::mem::take(&mut state.pending)
        };
        shared.work_ready.notify_all();
        // The callback usually holds a handle back to us.
        drop(shared.on_idle.lock().take());
        if !leftover.is_empty() {
            debug!(discarded = leftover.len(), "engine dropped with pending tasks");
        }
        drop(leftover);

        if let Some(worker) = self.worker.take() {
            // Joining ourselves would hang; the worker exits on its own.
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
        drop(shared.on_idle.lock().take());
    }
}

fn run_worker(shared: Arc<Shared>) {
    let handle = QueueHandle {
        shared: Arc::clone(&shared),
    };
    let mut state = shared.state.lock();

    loop {
        if state.shutdown {
            break;
        }

        if state.abort_requested && !state.pending.is_empty() {
            let discarded = std::mem::take(&mut state.pending);
            MutexGuard::unlocked(&mut state, || record_discarded(discarded));
            continue;
        }

        if let Some(task) = state.pending.pop_front() {
            let cancel = state.cancel.clone();
            if let Some(label) = &task.label {
                state.last_status = Some(label.clone());
            }
            let started = Instant::now();
            state.current = Some(RunningTask {
                id: task.id,
                label: task.label.clone(),
                started,
            });

            let failure = MutexGuard::unlocked(&mut state, || execute(&handle, task, cancel));

            state.active_time += started.elapsed();
            state.current = None;
            if let Some(failure) = failure {
                state.exceptions.push(failure);
            }
            continue;
        }

        if state.busy {
            // Drained. The callback runs first so that by the time
            // `wait_idle` returns its bookkeeping is done.
            MutexGuard::unlocked(&mut state, || shared.fire_idle());
            if state.pending.is_empty() {
                state.busy = false;
                if state.abort_requested {
                    state.abort_requested = false;
                    state.cancel = CancellationToken::new();
                }
                info!(
                    active_ms = state.active_time.as_millis() as u64,
                    failures = state.exceptions.len(),
                    "work queue idle"
                );
                shared.became_idle.notify_all();
            }
            continue;
        }

        shared.work_ready.wait(&mut state);
    }

    state.busy = false;
    state.current = None;
    let leftover = std::mem::take(&mut state.pending);
    shared.became_idle.notify_all();
    drop(state);
    drop(leftover);
    debug!("worker thread exiting");
}

fn execute(handle: &QueueHandle, task: Task, cancel: CancellationToken) -> Option<TaskFailure> {
    let Task { id, label, body } = task;
    let span = task_telemetry::start_task_span(label.as_deref(), &id);
    let _entered = span.enter();

    let ctx = TaskContext::new(id, label.clone(), handle.clone(), cancel);
    let started = Instant::now();
    let result = catch_unwind(AssertUnwindSafe(|| body(&ctx)));
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    let (outcome, cause) = match result {
        Ok(Ok(())) => ("ok", None),
        Ok(Err(e)) => ("error", Some(e)),
        Err(panic) => (
            "panic",
            Some(anyhow::anyhow!("task panicked: {}", panic_message(&*panic))),
        ),
    };

    task_telemetry::record_task_outcome(&span, outcome);
    let attrs = [KeyValue::new("result", outcome)];
    metrics::tasks_executed().add(1, &attrs);
    metrics::task_duration_ms().record(duration_ms, &attrs);

    cause.map(|cause| {
        warn!(task_id = %id, label = ?label, error = %format!("{cause:#}"), "task failed");
        TaskFailure {
            task_id: id,
            label,
            cause,
            captured_at: Utc::now(),
        }
    })
}

fn record_discarded(discarded: VecDeque<Task>) {
    if discarded.is_empty() {
        return;
    }
    metrics::tasks_discarded().add(discarded.len() as u64, &[]);
    for task in &discarded {
        debug!(task_id = %task.id, label = ?task.label, "task discarded by abort");
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
