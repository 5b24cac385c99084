//! Parameters for one migration run, loaded from the command line.

use std::path::PathBuf;
use std::time::Duration;

use crate::cmdline::CommandLine;
use crate::error::{Error, Result};

pub const DEFAULT_PROJECT: &str = "$";
pub const DEFAULT_EMAIL_DOMAIN: &str = "localhost";
pub const DEFAULT_ANY_COMMENT_SECONDS: f64 = 30.0;
pub const DEFAULT_SAME_COMMENT_SECONDS: f64 = 600.0;

const KNOWN_FLAGS: &[&str] = &[
    "?",
    "help",
    "source",
    "project",
    "exclude",
    "target",
    "emaildomain",
    "comment",
    "log",
    "ignoreerrors",
    "anycomment",
    "samecomment",
    "auto",
];

/// Everything a run needs to know before the first task is enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessParameters {
    /// Directory holding the source history.
    pub source_dir: Option<PathBuf>,
    /// Project path inside the source history.
    pub project: String,
    /// `;`-separated wildcard patterns of paths to skip.
    pub exclude_paths: Option<String>,
    /// Export directory. No export stage runs without one.
    pub target_dir: Option<PathBuf>,
    pub email_domain: String,
    /// Commit message used when a changeset has no comment.
    pub default_comment: String,
    pub log_file: Option<PathBuf>,
    /// Keep exporting after a changeset fails to write.
    pub ignore_errors: bool,
    pub any_comment_seconds: f64,
    pub same_comment_seconds: f64,
    /// Batch mode: block until the run is finished.
    pub auto_execute: bool,
}

impl Default for ProcessParameters {
    fn default() -> Self {
        Self {
            source_dir: None,
            project: DEFAULT_PROJECT.to_string(),
            exclude_paths: None,
            target_dir: None,
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            default_comment: String::new(),
            log_file: None,
            ignore_errors: false,
            any_comment_seconds: DEFAULT_ANY_COMMENT_SECONDS,
            same_comment_seconds: DEFAULT_SAME_COMMENT_SECONDS,
            auto_execute: false,
        }
    }
}

impl ProcessParameters {
    /// Apply a tokenized command line on top of the current values.
    ///
    /// Bare values fill the source and then the target directory when those
    /// flags are absent. Does nothing when help was requested.
    pub fn load(&mut self, cmdline: &CommandLine) -> Result<()> {
        if cmdline.help_requested() {
            return Ok(());
        }

        if let Some(unknown) = cmdline.names().find(|n| !KNOWN_FLAGS.iter().any(|k| k == n)) {
            return Err(Error::Config(format!("unknown parameter: {unknown}")));
        }

        let mut positional = cmdline.values().iter().filter(|v| !v.is_empty());

        if let Some(dir) = flag_value(cmdline, "source")? {
            self.source_dir = Some(PathBuf::from(dir));
        } else if let Some(dir) = positional.next() {
            self.source_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = flag_value(cmdline, "target")? {
            self.target_dir = Some(PathBuf::from(dir));
        } else if let Some(dir) = positional.next() {
            self.target_dir = Some(PathBuf::from(dir));
        }
        if let Some(extra) = positional.next() {
            return Err(Error::Config(format!("unexpected argument: {extra}")));
        }

        if let Some(project) = flag_value(cmdline, "project")? {
            self.project = project.to_string();
        }
        if let Some(patterns) = flag_value(cmdline, "exclude")? {
            self.exclude_paths = Some(patterns.to_string());
        }
        if let Some(domain) = flag_value(cmdline, "emaildomain")? {
            self.email_domain = domain.to_string();
        }
        if let Some(comment) = cmdline.get("comment") {
            self.default_comment = comment.value.clone();
        }
        if let Some(log) = flag_value(cmdline, "log")? {
            self.log_file = Some(PathBuf::from(log));
        }
        if let Some(secs) = seconds_value(cmdline, "anycomment")? {
            self.any_comment_seconds = secs;
        }
        if let Some(secs) = seconds_value(cmdline, "samecomment")? {
            self.same_comment_seconds = secs;
        }
        if let Some(on) = switch_value(cmdline, "ignoreerrors")? {
            self.ignore_errors = on;
        }
        if let Some(on) = switch_value(cmdline, "auto")? {
            self.auto_execute = on;
        }

        Ok(())
    }

    /// Check the values required to start a run.
    pub fn validate(&self) -> Result<()> {
        if self.source_dir.is_none() {
            return Err(Error::Config(
                "missing required parameter: source".to_string(),
            ));
        }
        if self.project.trim().is_empty() {
            return Err(Error::Config("project path is empty".to_string()));
        }
        self.any_comment_threshold()?;
        self.same_comment_threshold()?;
        Ok(())
    }

    pub fn any_comment_threshold(&self) -> Result<Duration> {
        seconds_to_duration("anycomment", self.any_comment_seconds)
    }

    pub fn same_comment_threshold(&self) -> Result<Duration> {
        seconds_to_duration("samecomment", self.same_comment_seconds)
    }

    /// Usage text shown for `/?`, `-?` or `--help`.
    pub fn help_message() -> String {
        format!(
            "\
Usage: repo-migrate [options] [source-dir [target-dir]]

Options (prefix with --, - or /; values follow a colon):
  source:<dir>          directory containing history.toml
  project:<path>        project to migrate (default: {DEFAULT_PROJECT})
  exclude:<patterns>    ;-separated wildcard paths to skip (* ? **)
  target:<dir>          directory receiving exported changesets
  emaildomain:<domain>  domain for author e-mail addresses (default: {DEFAULT_EMAIL_DOMAIN})
  comment:<text>        commit message for changesets without a comment
  log:<file>            append a run log to this file
  ignoreerrors          keep exporting after a changeset fails to write
  anycomment:<secs>     max gap between changes with any comments (default: {DEFAULT_ANY_COMMENT_SECONDS})
  samecomment:<secs>    max gap between changes with the same comment (default: {DEFAULT_SAME_COMMENT_SECONDS})
  auto                  run to completion without the progress monitor
  ?, help               show this message

Example:
  repo-migrate /auto --source:C:\\history --target:out \"--comment:Imported change\""
        )
    }
}

/// Value of a flag that needs one. A bare `--name` is an error.
fn flag_value<'a>(cmdline: &'a CommandLine, name: &str) -> Result<Option<&'a str>> {
    match cmdline.get(name) {
        None => Ok(None),
        Some(p) if p.value.is_empty() => Err(Error::Config(format!(
            "parameter {}{name} requires a value",
            p.flag
        ))),
        Some(p) => Ok(Some(p.value.as_str())),
    }
}

fn seconds_value(cmdline: &CommandLine, name: &str) -> Result<Option<f64>> {
    let Some(raw) = flag_value(cmdline, name)? else {
        return Ok(None);
    };
    let secs = raw.trim().parse::<f64>().map_err(|_| {
        Error::Config(format!(
            "parameter {name} must be a non-negative number of seconds, got {raw:?}"
        ))
    })?;
    seconds_to_duration(name, secs)?;
    Ok(Some(secs))
}

/// Rejects negative, non-finite and out-of-range values.
fn seconds_to_duration(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        Error::Config(format!(
            "parameter {name} must be a non-negative number of seconds, got {secs}"
        ))
    })
}

/// A switch is on when present, optionally with an explicit true/false.
fn switch_value(cmdline: &CommandLine, name: &str) -> Result<Option<bool>> {
    let Some(p) = cmdline.get(name) else {
        return Ok(None);
    };
    match p.value.to_ascii_lowercase().as_str() {
        "" | "true" | "yes" | "1" => Ok(Some(true)),
        "false" | "no" | "0" => Ok(Some(false)),
        other => Err(Error::Config(format!(
            "parameter {name} expects true or false, got {other:?}"
        ))),
    }
}
