//! Core data model.
//!
//! A revision is one recorded change to one file in the source history. A
//! changeset is a group of revisions that were most likely committed together
//! and become a single commit in the target repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// One historical change to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Full source path of the file (e.g. `$/proj/src/main.c`).
    pub path: String,

    /// Per-file version number, starting at 1.
    pub version: u32,

    pub author: String,

    pub timestamp: DateTime<Utc>,

    /// Check-in comment. Empty comments are normalised to `None`.
    pub comment: Option<String>,

    pub action: Action,
}

impl Revision {
    /// Comment with surrounding whitespace removed, or `None` when blank.
    pub fn trimmed_comment(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// What a revision did to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Add,
    Edit,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Add => "add",
            Action::Edit => "edit",
            Action::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Changeset
// ---------------------------------------------------------------------------

/// Revisions grouped into one logical commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// 1-based position in commit order.
    pub id: usize,
    pub author: String,
    /// Time of the earliest revision.
    pub started_at: DateTime<Utc>,
    /// Time of the latest revision. Used as the commit time.
    pub ended_at: DateTime<Utc>,
    pub comment: Option<String>,
    pub revisions: Vec<Revision>,
}

impl Changeset {
    pub(crate) fn open(id: usize, first: Revision) -> Self {
        Self {
            id,
            author: first.author.clone(),
            started_at: first.timestamp,
            ended_at: first.timestamp,
            comment: first.trimmed_comment().map(str::to_string),
            revisions: vec![first],
        }
    }

    pub(crate) fn push(&mut self, revision: Revision) {
        if self.comment.is_none() {
            self.comment = revision.trimmed_comment().map(str::to_string);
        }
        self.ended_at = self.ended_at.max(revision.timestamp);
        self.revisions.push(revision);
    }

    /// Does this changeset already touch `path`?
    pub fn contains_path(&self, path: &str) -> bool {
        self.revisions.iter().any(|r| r.path == path)
    }
}
