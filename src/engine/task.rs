//! Tasks and the context handed to a running task body.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::queue::QueueHandle;

/// Body of a task. Runs once, on the worker thread.
pub type TaskFn = Box<dyn FnOnce(&TaskContext) -> anyhow::Result<()> + Send + 'static>;

/// Newtype for task IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// A schedulable unit of work with an optional human-readable label.
///
/// Immutable once built; the engine owns it from `enqueue` until it has run.
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) label: Option<String>,
    pub(crate) body: TaskFn,
}

impl Task {
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(&TaskContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            id: TaskId::new(),
            label: None,
            body: Box::new(body),
        }
    }

    /// Shorthand for `Task::new(body).label(label)`.
    pub fn labeled<F>(label: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(&TaskContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self::new(body).label(label)
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn label_str(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// What a task body sees while it runs.
///
/// Lets the body publish status, schedule continuations, and observe an
/// abort request. The engine never stops a body on its own; long bodies
/// should check [`TaskContext::is_cancelled`] at convenient points.
pub struct TaskContext {
    id: TaskId,
    label: Option<String>,
    queue: QueueHandle,
    cancel: CancellationToken,
}

impl TaskContext {
    pub(crate) fn new(
        id: TaskId,
        label: Option<String>,
        queue: QueueHandle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            label,
            queue,
            cancel,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Publish a progress string for pollers.
    pub fn set_status(&self, status: impl Into<String>) {
        self.queue.set_status(status);
    }

    /// Schedule a continuation. It lands behind everything already pending.
    pub fn enqueue(&self, task: Task) {
        self.queue.enqueue(task);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token cancelled when an abort is requested during this drain cycle.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Handle to the engine running this task.
    pub fn queue(&self) -> &QueueHandle {
        &self.queue
    }
}

/// A failure captured while a task ran.
#[derive(Debug)]
pub struct TaskFailure {
    pub task_id: TaskId,
    pub label: Option<String>,
    pub cause: anyhow::Error,
    pub captured_at: DateTime<Utc>,
}

impl TaskFailure {
    /// Multi-line report: which task failed, then the full cause chain.
    pub fn report(&self) -> String {
        let mut out = format!(
            "[{}] task {} ({}) failed: {}",
            self.captured_at.format("%Y-%m-%d %H:%M:%S"),
            self.task_id,
            self.label.as_deref().unwrap_or("unlabeled"),
            self.cause
        );
        for cause in self.cause.chain().skip(1) {
            out.push_str("\n    caused by: ");
            out.push_str(&cause.to_string());
        }
        out
    }
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{label}: {:#}", self.cause),
            None => write!(f, "task {}: {:#}", self.task_id, self.cause),
        }
    }
}
