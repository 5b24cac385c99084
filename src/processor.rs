//! Run driver: validates parameters, wires the stages onto one engine, and
//! either waits for the run (batch) or returns at once (interactive).

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info};

use crate::engine::{TaskFailure, WorkQueue};
use crate::error::{Error, Result};
use crate::monitor::Progress;
use crate::params::ProcessParameters;
use crate::pipeline::{
    ChangesetBuilder, ChangesetExporter, ChangesetWriter, ExcludeMatcher, HistorySource,
    JournalWriter, ManifestSource, RevisionAnalyzer,
};
use crate::runlog::RunLog;

/// Performs a migration with one engine.
///
/// The drain callback registered in [`Processor::new`] moves captured task
/// failures into the run log and into [`take_failures`](Self::take_failures),
/// then closes the run log.
pub struct Processor {
    params: ProcessParameters,
    queue: WorkQueue,
    log: RunLog,
    failures: Arc<Mutex<Vec<TaskFailure>>>,
    analyzer: Option<Arc<RevisionAnalyzer>>,
    builder: Option<Arc<ChangesetBuilder>>,
    exporter: Option<Arc<ChangesetExporter>>,
    interactive: bool,
}

impl Processor {
    pub fn new(params: ProcessParameters) -> Result<Self> {
        let queue = WorkQueue::new()?;
        let log = RunLog::null();
        let failures = Arc::new(Mutex::new(Vec::new()));

        let handle = queue.handle();
        let idle_log = log.clone();
        let idle_failures = Arc::clone(&failures);
        queue.on_idle(move || {
            let exceptions = handle.fetch_exceptions();
            for failure in &exceptions {
                error!(task_id = %failure.task_id, "{failure}");
                idle_log.write_line(failure.report());
            }
            idle_log.close();
            idle_failures.lock().extend(exceptions);
        });

        Ok(Self {
            params,
            queue,
            log,
            failures,
            analyzer: None,
            builder: None,
            exporter: None,
            interactive: false,
        })
    }

    pub fn params(&self) -> &ProcessParameters {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ProcessParameters {
        &mut self.params
    }

    /// Interactive runs return from `process` as soon as work is queued.
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn analyzer(&self) -> Option<&Arc<RevisionAnalyzer>> {
        self.analyzer.as_ref()
    }

    pub fn builder(&self) -> Option<&Arc<ChangesetBuilder>> {
        self.builder.as_ref()
    }

    pub fn exporter(&self) -> Option<&Arc<ChangesetExporter>> {
        self.exporter.as_ref()
    }

    /// Run against the manifest in `source_dir`, exporting journal records
    /// to `target_dir` when one is set.
    pub fn process(&mut self) -> Result<()> {
        let writer = self
            .params
            .target_dir
            .as_deref()
            .map(|dir| Arc::new(JournalWriter::new(dir)) as Arc<dyn ChangesetWriter>);
        self.start(
            |params| {
                let dir = params.source_dir.as_deref().ok_or_else(|| {
                    Error::Config("missing required parameter: source".to_string())
                })?;
                Ok(Arc::new(ManifestSource::open(dir)?) as Arc<dyn HistorySource>)
            },
            writer,
        )
    }

    /// Run with caller-supplied collaborators. `source_dir` is not consulted.
    pub fn process_with(
        &mut self,
        source: Arc<dyn HistorySource>,
        writer: Option<Arc<dyn ChangesetWriter>>,
    ) -> Result<()> {
        self.start(move |_| Ok(source), writer)
    }

    fn start<F>(&mut self, open_source: F, writer: Option<Arc<dyn ChangesetWriter>>) -> Result<()>
    where
        F: FnOnce(&ProcessParameters) -> Result<Arc<dyn HistorySource>>,
    {
        if !self.queue.is_idle() {
            return Err(Error::Other("a migration is already running".to_string()));
        }

        self.log.open(self.params.log_file.as_deref())?;
        self.log_parameters();

        // Nothing is queued until everything checkable up front has passed.
        let (source, excludes) = match self.prepare(open_source) {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(error = %e, "migration not started");
                self.log.write_line(format!("ERROR: {e}"));
                self.log.close();
                return Err(e);
            }
        };

        let analyzer = Arc::new(
            RevisionAnalyzer::new(source, self.log.clone()).with_excludes(excludes),
        );
        let builder = Arc::new(
            ChangesetBuilder::new(self.log.clone())
                .any_comment_threshold(self.params.any_comment_threshold()?)
                .same_comment_threshold(self.params.same_comment_threshold()?),
        );
        let exporter = writer.map(|writer| {
            Arc::new(
                ChangesetExporter::new(writer, Arc::clone(&builder), self.log.clone())
                    .email_domain(self.params.email_domain.clone())
                    .default_comment(self.params.default_comment.clone())
                    .ignore_errors(self.params.ignore_errors),
            )
        });

        let export_task = exporter.as_ref().map(|e| e.export_task());
        let build_task = builder.build_task(Arc::clone(&analyzer), export_task);
        analyzer.add_project(&self.queue.handle(), self.params.project.clone(), Some(build_task));

        self.analyzer = Some(analyzer);
        self.builder = Some(builder);
        self.exporter = exporter;
        info!(project = %self.params.project, interactive = self.interactive, "migration started");

        if !self.interactive {
            self.queue.wait_idle()?;
        }
        Ok(())
    }

    fn prepare<F>(&self, open_source: F) -> Result<(Arc<dyn HistorySource>, ExcludeMatcher)>
    where
        F: FnOnce(&ProcessParameters) -> Result<Arc<dyn HistorySource>>,
    {
        self.params.validate()?;
        let excludes = ExcludeMatcher::new(self.params.exclude_paths.as_deref().unwrap_or(""))?;
        let source = open_source(&self.params)?;
        source.project_files(&self.params.project)?;
        Ok((source, excludes))
    }

    fn log_parameters(&self) {
        let p = &self.params;
        let shown = |v: Option<&std::path::Path>| {
            v.map(|p| p.display().to_string()).unwrap_or_default()
        };
        self.log
            .write_line(format!("repo-migrate version {}", env!("CARGO_PKG_VERSION")));
        self.log
            .write_line(format!("Source directory: {}", shown(p.source_dir.as_deref())));
        self.log.write_line(format!("Project: {}", p.project));
        self.log.write_line(format!(
            "Exclusions: {}",
            p.exclude_paths.as_deref().unwrap_or("")
        ));
        self.log
            .write_line(format!("Target directory: {}", shown(p.target_dir.as_deref())));
        self.log
            .write_line(format!("Email domain: {}", p.email_domain));
        self.log
            .write_line(format!("Default comment: {}", p.default_comment));
        self.log
            .write_line(format!("Ignore errors: {}", p.ignore_errors));
        self.log
            .write_line(format!("Any comment seconds: {}", p.any_comment_seconds));
        self.log
            .write_line(format!("Same comment seconds: {}", p.same_comment_seconds));
    }

    /// Request a cooperative stop.
    pub fn abort(&self) {
        self.queue.abort();
    }

    pub fn wait_idle(&self) -> Result<()> {
        self.queue.wait_idle()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    /// Failures gathered at drain time since the last call.
    pub fn take_failures(&self) -> Vec<TaskFailure> {
        std::mem::take(&mut *self.failures.lock())
    }

    /// Non-blocking snapshot for pollers.
    pub fn progress(&self) -> Progress {
        Progress {
            status: self.queue.last_status(),
            elapsed: self.queue.active_time(),
            files: self.analyzer.as_ref().map_or(0, |a| a.file_count()),
            revisions: self.analyzer.as_ref().map_or(0, |a| a.revision_count()),
            changesets: self.builder.as_ref().map_or(0, |b| b.changeset_count()),
            exported: self.exporter.as_ref().map_or(0, |e| e.exported_count()),
            pending: self.queue.pending_count(),
            idle: self.queue.is_idle(),
            aborting: self.queue.is_aborting(),
        }
    }
}
