//! Task execution span helpers.

use tracing::Span;

use crate::engine::TaskId;

/// Start a span covering one task body.
///
/// `task.outcome` is declared empty and filled by [`record_task_outcome`].
pub fn start_task_span(label: Option<&str>, task_id: &TaskId) -> Span {
    tracing::info_span!(
        "task.execute",
        "task.id" = %task_id,
        "task.label" = label.unwrap_or("unlabeled"),
        "task.outcome" = tracing::field::Empty,
    )
}

/// Record how the task ended ("ok", "error" or "panic").
pub fn record_task_outcome(span: &Span, outcome: &str) {
    span.record("task.outcome", outcome);
}

/// Span for one pipeline stage task (analyze, build, export).
pub fn start_stage_span(stage: &str) -> Span {
    tracing::debug_span!("pipeline.stage", "pipeline.stage" = stage)
}
