// ── Progress reporting – console rendering of a cycle ────────────────────────

use crate::sftp::error::DrillError;
use crate::sftp::types::TransferProgress;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use crossterm::cursor::MoveUp;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::io::{Stdout, Write};
use std::sync::Mutex as StdMutex;
use tracing::debug;

/// Receives the values a cycle produces; how they are shown is up to the
/// implementation.
pub trait ProgressReporter: Send + Sync {
    fn cycle_started(&self, at: DateTime<Utc>);

    /// Called before each iteration's copy.
    fn iteration(&self, progress: &TransferProgress);

    fn cycle_finished(&self, progress: &TransferProgress, at: DateTime<Utc>);

    fn cycle_failed(&self, progress: &TransferProgress, error: &DrillError, at: DateTime<Utc>);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn cycle_started(&self, _at: DateTime<Utc>) {}
    fn iteration(&self, _progress: &TransferProgress) {}
    fn cycle_finished(&self, _progress: &TransferProgress, _at: DateTime<Utc>) {}
    fn cycle_failed(&self, _progress: &TransferProgress, _error: &DrillError, _at: DateTime<Utc>) {}
}

// ── Console ──────────────────────────────────────────────────────────────────

/// Timestamped start/finish lines with a single progress line that is
/// rewritten in place for every iteration.
pub struct ConsoleReporter<W: Write + Send> {
    out: StdMutex<W>,
    tz: Tz,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout(tz: Tz) -> Self {
        Self::new(std::io::stdout(), tz)
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W, tz: Tz) -> Self {
        Self {
            out: StdMutex::new(out),
            tz,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }

    fn stamp(&self, at: DateTime<Utc>) -> String {
        format_timestamp(at, self.tz)
    }

    fn write_with<F>(&self, render: F)
    where
        F: FnOnce(&mut W) -> std::io::Result<()>,
    {
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = render(&mut out).and_then(|_| out.flush()) {
            debug!("console write failed: {}", e);
        }
    }
}

impl<W: Write + Send> ProgressReporter for ConsoleReporter<W> {
    fn cycle_started(&self, at: DateTime<Utc>) {
        let stamp = self.stamp(at);
        // The blank line is the slot the progress line overwrites.
        self.write_with(|out| writeln!(out, "({}) fake upload starting...\n", stamp));
    }

    fn iteration(&self, progress: &TransferProgress) {
        self.write_with(|out| {
            queue!(out, MoveUp(1), Clear(ClearType::CurrentLine))?;
            writeln!(out, "{}", progress_line(progress.percent(), progress))
        });
    }

    fn cycle_finished(&self, progress: &TransferProgress, at: DateTime<Utc>) {
        let stamp = self.stamp(at);
        self.write_with(|out| {
            queue!(out, MoveUp(1), Clear(ClearType::CurrentLine))?;
            writeln!(out, "{}", progress_line(100.0, progress))?;
            writeln!(out, "({}) fake upload finished", stamp)
        });
    }

    fn cycle_failed(&self, progress: &TransferProgress, error: &DrillError, at: DateTime<Utc>) {
        let stamp = self.stamp(at);
        self.write_with(|out| {
            queue!(out, MoveUp(1), Clear(ClearType::CurrentLine))?;
            writeln!(
                out,
                "({}) fake upload failed after {:.6} Megabyte: {}",
                stamp, progress.total_megabytes_copied, error
            )
        });
    }
}

pub fn progress_line(percent: f64, progress: &TransferProgress) -> String {
    format!(
        "{:.6}%: {:.6} Megabyte copied",
        percent, progress.total_megabytes_copied
    )
}

/// Unpadded `Y-M-D H:M:S` in the schedule's time zone, e.g. `2024-1-2 4:0:0`.
pub fn format_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz)
        .format("%Y-%-m-%-d %-H:%-M:%-S")
        .to_string()
}
