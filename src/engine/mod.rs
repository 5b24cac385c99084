//! Execution engine: a single-worker FIFO task queue with cooperative abort,
//! continuations, progress status, and failure aggregation.

pub mod queue;
pub mod task;

pub use queue::{QueueHandle, WorkQueue, WorkerState};
pub use task::{Task, TaskContext, TaskFailure, TaskFn, TaskId};
