//! Export stage: write changesets to the target, one task per changeset.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::builder::ChangesetBuilder;
use crate::engine::{Task, TaskContext};
use crate::error::Result;
use crate::model::{Action, Changeset};
use crate::params::DEFAULT_EMAIL_DOMAIN;
use crate::runlog::RunLog;
use crate::telemetry::{metrics, task::start_stage_span};

/// Destination for exported commits.
pub trait ChangesetWriter: Send + Sync {
    /// Called once before the first commit.
    fn prepare(&self) -> Result<()>;

    fn write(&self, record: &CommitRecord) -> Result<()>;
}

/// One changeset as it lands in the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sequence: usize,
    pub author: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub changes: Vec<FileChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub version: u32,
    pub action: Action,
}

/// Writes each commit as `<target>/changesets/NNNNN.json`.
#[derive(Debug, Clone)]
pub struct JournalWriter {
    dir: PathBuf,
}

impl JournalWriter {
    pub fn new(target: &Path) -> Self {
        Self {
            dir: target.join("changesets"),
        }
    }

    pub fn record_path(&self, sequence: usize) -> PathBuf {
        self.dir.join(format!("{sequence:05}.json"))
    }
}

impl ChangesetWriter for JournalWriter {
    fn prepare(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn write(&self, record: &CommitRecord) -> Result<()> {
        let file = File::create(self.record_path(record.sequence))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Drives a [`ChangesetWriter`] over the builder's changesets.
///
/// Each changeset is its own task, and each task queues the next one, so an
/// abort stops the export between two commits. A failed write ends the chain
/// unless `ignore_errors` is set.
pub struct ChangesetExporter {
    writer: Arc<dyn ChangesetWriter>,
    builder: Arc<ChangesetBuilder>,
    log: RunLog,
    email_domain: String,
    default_comment: String,
    ignore_errors: bool,
    exported: AtomicUsize,
    failed: AtomicUsize,
}

impl ChangesetExporter {
    pub fn new(writer: Arc<dyn ChangesetWriter>, builder: Arc<ChangesetBuilder>, log: RunLog) -> Self {
        Self {
            writer,
            builder,
            log,
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            default_comment: String::new(),
            ignore_errors: false,
            exported: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn email_domain(mut self, domain: impl Into<String>) -> Self {
        self.email_domain = domain.into();
        self
    }

    pub fn default_comment(mut self, comment: impl Into<String>) -> Self {
        self.default_comment = comment.into();
        self
    }

    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_errors = ignore;
        self
    }

    /// Task that prepares the target and starts the per-changeset chain.
    pub fn export_task(self: &Arc<Self>) -> Task {
        let exporter = Arc::clone(self);
        Task::labeled("Exporting changesets", move |ctx| {
            let _span = start_stage_span("export").entered();
            exporter
                .writer
                .prepare()
                .context("preparing export target")?;
            let total = exporter.builder.changeset_count();
            exporter
                .log
                .write_line(format!("Exporting {total} changeset(s)"));
            if total > 0 {
                ctx.enqueue(exporter.changeset_task(0));
            }
            Ok(())
        })
    }

    fn changeset_task(self: &Arc<Self>, index: usize) -> Task {
        let exporter = Arc::clone(self);
        Task::labeled(format!("Exporting changeset {}", index + 1), move |ctx| {
            exporter.export_one(ctx, index)
        })
    }

    fn export_one(self: &Arc<Self>, ctx: &TaskContext, index: usize) -> anyhow::Result<()> {
        let Some(cs) = self.builder.changeset(index) else {
            return Ok(());
        };
        let total = self.builder.changeset_count();
        ctx.set_status(format!("Exporting changeset {}/{total}", cs.id));

        let record = self.record_for(&cs);
        match self.writer.write(&record) {
            Ok(()) => {
                self.exported.fetch_add(1, Ordering::Relaxed);
                metrics::changesets_exported().add(1, &[KeyValue::new("result", "ok")]);
            }
            Err(e) if self.ignore_errors => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                metrics::changesets_exported().add(1, &[KeyValue::new("result", "skipped")]);
                warn!(changeset = cs.id, error = %e, "export failed, continuing");
                self.log
                    .write_line(format!("Ignoring error on changeset {}: {e}", cs.id));
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                metrics::changesets_exported().add(1, &[KeyValue::new("result", "error")]);
                return Err(anyhow::Error::new(e)
                    .context(format!("exporting changeset {} of {total}", cs.id)));
            }
        }

        if ctx.is_cancelled() {
            self.log
                .write_line(format!("Export cancelled after changeset {}", cs.id));
            return Ok(());
        }
        if index + 1 < total {
            ctx.enqueue(self.changeset_task(index + 1));
        } else {
            info!(
                exported = self.exported_count(),
                failed = self.failed_count(),
                "export finished"
            );
        }
        Ok(())
    }

    /// Commit data for one changeset.
    pub fn record_for(&self, cs: &Changeset) -> CommitRecord {
        CommitRecord {
            sequence: cs.id,
            author: cs.author.clone(),
            email: self.email_for(&cs.author),
            timestamp: cs.ended_at,
            message: cs
                .comment
                .clone()
                .unwrap_or_else(|| self.default_comment.clone()),
            changes: cs
                .revisions
                .iter()
                .map(|r| FileChange {
                    path: r.path.clone(),
                    version: r.version,
                    action: r.action,
                })
                .collect(),
        }
    }

    /// `alice` -> `alice@<domain>`; spaces become dots.
    pub fn email_for(&self, author: &str) -> String {
        if author.contains('@') {
            return author.to_string();
        }
        let user = author.trim().to_lowercase().replace(' ', ".");
        format!("{user}@{}", self.email_domain)
    }

    pub fn exported_count(&self) -> usize {
        self.exported.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}
