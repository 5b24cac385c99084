//! Per-run diagnostic log file.
//!
//! Stages write to it from the worker thread while tasks run; the drain
//! callback writes the captured failures and closes it. Handles are cheap
//! clones of one shared sink, so reopening is visible to every stage.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::Result;

#[derive(Clone, Default)]
pub struct RunLog {
    sink: Arc<Mutex<Option<BufWriter<File>>>>,
}

impl RunLog {
    /// A log that discards everything until [`open`](Self::open) is called.
    pub fn null() -> Self {
        Self::default()
    }

    /// Open `path` for appending, replacing any current sink. `None` turns
    /// the log into a null sink.
    pub fn open(&self, path: Option<&Path>) -> Result<()> {
        let writer = match path {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(BufWriter::new(file))
            }
            None => None,
        };
        let previous = std::mem::replace(&mut *self.sink.lock(), writer);
        if let Some(mut previous) = previous {
            let _ = previous.flush();
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Append one line. Write errors are reported through tracing and
    /// otherwise ignored.
    pub fn write_line(&self, line: impl AsRef<str>) {
        let mut sink = self.sink.lock();
        let Some(writer) = sink.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{}", line.as_ref()) {
            warn!(error = %e, "run log write failed");
        }
    }

    /// Flush and close. Later writes are dropped until reopened.
    pub fn close(&self) {
        if let Some(mut writer) = self.sink.lock().take() {
            if let Err(e) = writer.flush() {
                warn!(error = %e, "run log flush failed");
            }
        }
    }
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog")
            .field("open", &self.is_open())
            .finish()
    }
}
