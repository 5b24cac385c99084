//! Analysis stage: discover files and read their revisions.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context as _;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::exclude::ExcludeMatcher;
use super::source::HistorySource;
use crate::engine::{QueueHandle, Task, TaskContext};
use crate::model::Revision;
use crate::runlog::RunLog;
use crate::telemetry::task::start_stage_span;

/// Collects every revision of every file in a project.
///
/// Counters are updated as files are read, so pollers see them grow.
pub struct RevisionAnalyzer {
    source: Arc<dyn HistorySource>,
    excludes: ExcludeMatcher,
    log: RunLog,
    file_count: AtomicUsize,
    excluded_count: AtomicUsize,
    revision_count: AtomicUsize,
    revisions: Mutex<Vec<Revision>>,
}

impl RevisionAnalyzer {
    pub fn new(source: Arc<dyn HistorySource>, log: RunLog) -> Self {
        Self {
            source,
            excludes: ExcludeMatcher::default(),
            log,
            file_count: AtomicUsize::new(0),
            excluded_count: AtomicUsize::new(0),
            revision_count: AtomicUsize::new(0),
            revisions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_excludes(mut self, excludes: ExcludeMatcher) -> Self {
        self.excludes = excludes;
        self
    }

    /// Queue analysis of `project`.
    ///
    /// One task lists the files and queues a read task per file. `then` is
    /// queued behind those reads, so it starts only after all of them ran.
    pub fn add_project(
        self: &Arc<Self>,
        queue: &QueueHandle,
        project: impl Into<String>,
        then: Option<Task>,
    ) {
        let project = project.into();
        let analyzer = Arc::clone(self);
        queue.enqueue(Task::labeled(
            format!("Analyzing {project}"),
            move |ctx| analyzer.scan_project(ctx, &project, then),
        ));
    }

    fn scan_project(
        self: &Arc<Self>,
        ctx: &TaskContext,
        project: &str,
        then: Option<Task>,
    ) -> anyhow::Result<()> {
        let _span = start_stage_span("analyze").entered();
        let files = self
            .source
            .project_files(project)
            .with_context(|| format!("listing files of {project}"))?;

        let mut queued = 0usize;
        for path in files {
            if self.excludes.is_excluded(&path) {
                self.excluded_count.fetch_add(1, Ordering::Relaxed);
                self.log.write_line(format!("Excluding: {path}"));
                continue;
            }
            let analyzer = Arc::clone(self);
            ctx.enqueue(Task::labeled(format!("Reading {path}"), move |ctx| {
                analyzer.read_file(ctx, &path)
            }));
            queued += 1;
        }
        info!(project, files = queued, "project scanned");

        if let Some(then) = then {
            ctx.enqueue(then);
        }
        Ok(())
    }

    fn read_file(&self, ctx: &TaskContext, path: &str) -> anyhow::Result<()> {
        let revisions = self
            .source
            .revisions(path)
            .with_context(|| format!("reading history of {path}"))?;

        let count = revisions.len();
        debug!(path, revisions = count, "file read");
        self.log.write_line(format!("{path}: {count} revision(s)"));

        self.revisions.lock().extend(revisions);
        self.file_count.fetch_add(1, Ordering::Relaxed);
        self.revision_count.fetch_add(count, Ordering::Relaxed);
        ctx.set_status(format!(
            "Files: {}, revisions: {}",
            self.file_count(),
            self.revision_count()
        ));
        Ok(())
    }

    /// Files whose history has been read.
    pub fn file_count(&self) -> usize {
        self.file_count.load(Ordering::Relaxed)
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded_count.load(Ordering::Relaxed)
    }

    pub fn revision_count(&self) -> usize {
        self.revision_count.load(Ordering::Relaxed)
    }

    /// Snapshot of the revisions read so far, in read order.
    pub fn revisions(&self) -> Vec<Revision> {
        self.revisions.lock().clone()
    }
}
