//! Source history access.
//!
//! [`ManifestSource`] reads a `history.toml` export of the legacy database:
//!
//! ```toml
//! [[file]]
//! path = "$/proj/src/main.c"
//!
//! [[file.revision]]
//! author = "alice"
//! time = "2009-03-01T10:00:00Z"
//! comment = "initial import"
//! ```
//!
//! `version` defaults to the revision's position (1-based) and `action` to
//! `add` for the first revision and `edit` afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{Action, Revision};

pub const MANIFEST_FILE: &str = "history.toml";

/// Read access to the legacy repository.
pub trait HistorySource: Send + Sync {
    /// Every file path beneath `project`, sorted.
    ///
    /// Fails when `project` does not exist or names a file.
    fn project_files(&self, project: &str) -> Result<Vec<String>>;

    /// All revisions of one file, oldest first.
    fn revisions(&self, path: &str) -> Result<Vec<Revision>>;
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "file")]
    files: Vec<ManifestFile>,
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    path: String,
    #[serde(default, rename = "revision")]
    revisions: Vec<ManifestRevision>,
}

#[derive(Debug, Deserialize)]
struct ManifestRevision {
    version: Option<u32>,
    author: String,
    time: DateTime<Utc>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    action: Option<Action>,
}

/// History loaded from a TOML manifest.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    files: BTreeMap<String, Vec<Revision>>,
}

impl ManifestSource {
    /// Load `<dir>/history.toml`.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::InvalidSource(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        let manifest_path = dir.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&manifest_path).map_err(|e| {
            Error::InvalidSource(format!("cannot read {}: {e}", manifest_path.display()))
        })?;
        Self::parse(&text)
    }

    /// Parse manifest text directly.
    pub fn parse(text: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(text)?;
        let mut files = BTreeMap::new();

        for file in manifest.files {
            let path = normalize_path(&file.path);
            if !path.starts_with("$/") {
                return Err(Error::InvalidSource(format!(
                    "file path must start with $/: {}",
                    file.path
                )));
            }
            let revisions = file
                .revisions
                .into_iter()
                .enumerate()
                .map(|(i, rev)| Revision {
                    path: path.clone(),
                    version: rev.version.unwrap_or(i as u32 + 1),
                    author: rev.author,
                    timestamp: rev.time,
                    comment: rev.comment.filter(|c| !c.trim().is_empty()),
                    action: rev
                        .action
                        .unwrap_or(if i == 0 { Action::Add } else { Action::Edit }),
                })
                .collect();
            if files.insert(path.clone(), revisions).is_some() {
                return Err(Error::InvalidSource(format!("duplicate file entry: {path}")));
            }
        }

        Ok(Self { files })
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl HistorySource for ManifestSource {
    fn project_files(&self, project: &str) -> Result<Vec<String>> {
        let project = normalize_path(project);
        if project == "$" {
            return if self.files.is_empty() {
                Err(Error::InvalidProject(project))
            } else {
                Ok(self.files.keys().cloned().collect())
            };
        }
        if !project.starts_with("$/") {
            return Err(Error::InvalidProject(project));
        }
        if self.files.contains_key(&project) {
            return Err(Error::NotAProject(project));
        }

        let prefix = format!("{project}/");
        let files: Vec<String> = self
            .files
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(path, _)| path.clone())
            .collect();
        if files.is_empty() {
            return Err(Error::InvalidProject(project));
        }
        Ok(files)
    }

    fn revisions(&self, path: &str) -> Result<Vec<Revision>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Other(format!("no such file in history: {path}")))
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "$".to_string()
    } else {
        trimmed.to_string()
    }
}
