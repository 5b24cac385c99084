//! Changeset assembly stage.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use super::analyzer::RevisionAnalyzer;
use crate::engine::Task;
use crate::model::{Changeset, Revision};
use crate::params::{DEFAULT_ANY_COMMENT_SECONDS, DEFAULT_SAME_COMMENT_SECONDS};
use crate::runlog::RunLog;
use crate::telemetry::{metrics, task::start_stage_span};

/// Groups revisions into changesets.
///
/// Consecutive revisions (by time) join the open changeset when they share
/// its author, do not touch a file it already contains, and either carry the
/// same comment within `same_comment_threshold` or follow within
/// `any_comment_threshold`. Two different non-empty comments never join.
pub struct ChangesetBuilder {
    any_comment_threshold: Duration,
    same_comment_threshold: Duration,
    log: RunLog,
    changesets: Mutex<Vec<Changeset>>,
}

impl ChangesetBuilder {
    pub fn new(log: RunLog) -> Self {
        Self {
            any_comment_threshold: Duration::from_secs_f64(DEFAULT_ANY_COMMENT_SECONDS),
            same_comment_threshold: Duration::from_secs_f64(DEFAULT_SAME_COMMENT_SECONDS),
            log,
            changesets: Mutex::new(Vec::new()),
        }
    }

    pub fn any_comment_threshold(mut self, threshold: Duration) -> Self {
        self.any_comment_threshold = threshold;
        self
    }

    pub fn same_comment_threshold(mut self, threshold: Duration) -> Self {
        self.same_comment_threshold = threshold;
        self
    }

    /// Task that groups everything `analyzer` has read, then queues `then`.
    pub fn build_task(self: &Arc<Self>, analyzer: Arc<RevisionAnalyzer>, then: Option<Task>) -> Task {
        let builder = Arc::clone(self);
        Task::labeled("Building changesets", move |ctx| {
            let _span = start_stage_span("build").entered();
            let revisions = analyzer.revisions();
            ctx.set_status(format!(
                "Building changesets from {} revisions",
                revisions.len()
            ));

            let built = builder.group(revisions);
            for cs in &built {
                builder.log.write_line(format!(
                    "Changeset {} - {} ({} file(s), {}): {}",
                    cs.id,
                    cs.ended_at.format("%Y-%m-%d %H:%M:%S"),
                    cs.revisions.len(),
                    cs.author,
                    cs.comment.as_deref().unwrap_or("")
                ));
            }
            metrics::changesets_built().add(built.len() as u64, &[]);
            info!(changesets = built.len(), "changesets built");
            *builder.changesets.lock() = built;

            if let Some(then) = then {
                ctx.enqueue(then);
            }
            Ok(())
        })
    }

    /// Group revisions into changesets in commit order.
    pub fn group(&self, mut revisions: Vec<Revision>) -> Vec<Changeset> {
        revisions.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.path.cmp(&b.path))
                .then_with(|| a.version.cmp(&b.version))
        });

        let mut done = Vec::new();
        let mut open: Option<Changeset> = None;
        for revision in revisions {
            if let Some(cs) = open.as_mut() {
                if self.joins(cs, &revision) {
                    cs.push(revision);
                    continue;
                }
            }
            done.extend(open.take());
            open = Some(Changeset::open(done.len() + 1, revision));
        }
        done.extend(open);
        done
    }

    fn joins(&self, cs: &Changeset, revision: &Revision) -> bool {
        if cs.author != revision.author || cs.contains_path(&revision.path) {
            return false;
        }
        let gap = (revision.timestamp - cs.ended_at)
            .to_std()
            .unwrap_or_default();
        match (cs.comment.as_deref(), revision.trimmed_comment()) {
            (Some(open), Some(next)) if open != next => false,
            (Some(_), Some(_)) => gap <= self.same_comment_threshold,
            _ => gap <= self.any_comment_threshold,
        }
    }

    pub fn changeset_count(&self) -> usize {
        self.changesets.lock().len()
    }

    pub fn changeset(&self, index: usize) -> Option<Changeset> {
        self.changesets.lock().get(index).cloned()
    }

    pub fn changesets(&self) -> Vec<Changeset> {
        self.changesets.lock().clone()
    }
}
