//! Metric instrument factories.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("repo-migrate")
}

/// Counter: tasks appended to the engine queue.
pub fn tasks_enqueued() -> Counter<u64> {
    meter()
        .u64_counter("migrate.tasks.enqueued")
        .with_description("Number of tasks enqueued")
        .build()
}

/// Counter: task bodies that ran to an end.
/// Labels: `result` ("ok" | "error" | "panic").
pub fn tasks_executed() -> Counter<u64> {
    meter()
        .u64_counter("migrate.tasks.executed")
        .with_description("Number of tasks executed")
        .build()
}

/// Counter: queued tasks dropped without running because of an abort.
pub fn tasks_discarded() -> Counter<u64> {
    meter()
        .u64_counter("migrate.tasks.discarded")
        .with_description("Number of queued tasks discarded by abort")
        .build()
}

/// Histogram: task body duration in milliseconds.
/// Labels: `result`.
pub fn task_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("migrate.task.duration_ms")
        .with_description("Task execution duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Counter: changesets produced by the grouping stage.
pub fn changesets_built() -> Counter<u64> {
    meter()
        .u64_counter("migrate.changesets.built")
        .with_description("Number of changesets assembled")
        .build()
}

/// Counter: changeset export attempts.
/// Labels: `result` ("ok" | "error" | "skipped").
pub fn changesets_exported() -> Counter<u64> {
    meter()
        .u64_counter("migrate.changesets.exported")
        .with_description("Number of changesets written to the target")
        .build()
}
