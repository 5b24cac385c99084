//! Foreground progress polling.
//!
//! The monitor never blocks the worker: every tick takes a snapshot through
//! the engine's non-blocking reads and hands it to the caller.

use std::time::Duration;

use crate::processor::Processor;

/// One snapshot of a run's progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Progress {
    pub status: Option<String>,
    pub elapsed: Duration,
    pub files: usize,
    pub revisions: usize,
    pub changesets: usize,
    pub exported: usize,
    pub pending: usize,
    pub idle: bool,
    pub aborting: bool,
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status.as_deref().unwrap_or("Idle");
        write!(
            f,
            "{status} | Elapsed: {} | Files: {} | Revisions: {} | Changesets: {}",
            format_elapsed(self.elapsed),
            self.files,
            self.revisions,
            self.changesets
        )?;
        if self.exported > 0 {
            write!(f, " | Exported: {}", self.exported)?;
        }
        if self.aborting {
            f.write_str(" | aborting")?;
        }
        Ok(())
    }
}

/// `h:mm:ss.fff`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let ms = total_ms % 1000;
    let secs = (total_ms / 1000) % 60;
    let mins = (total_ms / 60_000) % 60;
    let hours = total_ms / 3_600_000;
    format!("{hours}:{mins:02}:{secs:02}.{ms:03}")
}

/// Poll `processor` every `interval` until it is idle.
///
/// `on_tick` sees every snapshot, including the final idle one, which is
/// also returned. The first tick fires immediately.
pub async fn watch<F>(processor: &Processor, interval: Duration, mut on_tick: F) -> Progress
where
    F: FnMut(&Progress),
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let progress = processor.progress();
        on_tick(&progress);
        if progress.idle {
            return progress;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formats_like_a_clock() {
        assert_eq!(format_elapsed(Duration::ZERO), "0:00:00.000");
        assert_eq!(
            format_elapsed(Duration::from_millis(3_723_045)),
            "1:02:03.045"
        );
    }

    #[test]
    fn display_falls_back_to_idle() {
        let progress = Progress {
            files: 2,
            revisions: 5,
            changesets: 1,
            idle: true,
            ..Progress::default()
        };
        assert_eq!(
            progress.to_string(),
            "Idle | Elapsed: 0:00:00.000 | Files: 2 | Revisions: 5 | Changesets: 1"
        );
    }
}
