// ── Cycle runner – repeated copy-then-remove with progress accounting ────────

use crate::sftp::error::{DrillError, DrillResult};
use crate::sftp::file_ops::RemoteFs;
use crate::sftp::progress::ProgressReporter;
use crate::sftp::service::Connector;
use crate::sftp::transfer;
use crate::sftp::types::*;
use chrono::Utc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

pub struct CycleRunner<C, R> {
    connector: C,
    reporter: R,
    chunk_size: usize,
}

impl<C: Connector, R: ProgressReporter> CycleRunner<C, R> {
    pub fn new(connector: C, reporter: R, chunk_size: usize) -> Self {
        Self {
            connector,
            reporter,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Run `job.repeat_count` iterations in order. The first error ends the
    /// cycle; nothing is retried.
    pub fn run(
        &self,
        job: &CopyJobSpec,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, CycleFailure> {
        let cycle_id = Uuid::new_v4().to_string();
        let span = info_span!("cycle", id = %cycle_id);
        let _entered = span.enter();

        let started_at = Utc::now();
        let clock = Instant::now();
        let mut progress = TransferProgress::new(job.repeat_count);

        info!(
            source = %job.source_path,
            destination = %job.destination_dir.display(),
            count = job.repeat_count,
            "cycle starting"
        );
        self.reporter.cycle_started(started_at);

        for index in 0..job.repeat_count {
            progress.iteration_index = index;
            self.reporter.iteration(&progress);

            if let Err(error) = self.run_iteration(job, cancel, &mut progress) {
                warn!(iteration = index, %error, "cycle aborted");
                self.reporter.cycle_failed(&progress, &error, Utc::now());
                return Err(CycleFailure {
                    cycle_id,
                    error,
                    progress,
                });
            }
        }

        progress.iteration_index = job.repeat_count;
        let finished_at = Utc::now();
        self.reporter.cycle_finished(&progress, finished_at);

        let elapsed_secs = clock.elapsed().as_secs_f64();
        let report = CycleReport {
            cycle_id,
            started_at,
            finished_at,
            iterations: job.repeat_count,
            total_bytes: progress.total_bytes_copied,
            megabytes: progress.total_megabytes_copied,
            elapsed_secs,
            average_mib_per_sec: if elapsed_secs > 0.0 {
                progress.total_megabytes_copied / elapsed_secs
            } else {
                0.0
            },
        };
        info!(
            megabytes = report.megabytes,
            mib_per_sec = report.average_mib_per_sec,
            "cycle finished"
        );
        Ok(report)
    }

    /// Copy over one session, close it, then delete over another. The delete
    /// only happens when the local copy has the remote's full length.
    fn run_iteration(
        &self,
        job: &CopyJobSpec,
        cancel: &CancellationToken,
        progress: &mut TransferProgress,
    ) -> DrillResult<()> {
        if cancel.is_cancelled() {
            return Err(DrillError::Cancelled);
        }

        let outcome = {
            let session = self.connector.connect()?;
            let expected = session.file_size(&job.source_path)?;
            let mut reader = session.open_read(&job.source_path)?;
            let outcome = transfer::copy_remote_file(
                &mut reader,
                &job.source_path,
                &job.destination_dir,
                self.chunk_size,
                cancel,
            )?;
            if outcome.bytes != expected {
                return Err(DrillError::SizeMismatch {
                    path: job.source_path.clone(),
                    expected,
                    copied: outcome.bytes,
                });
            }
            outcome
        };
        progress.record_copy(outcome.bytes);
        debug!(
            iteration = progress.iteration_index,
            bytes = outcome.bytes,
            total_mb = progress.total_megabytes_copied,
            "iteration copied"
        );

        match job.cleanup {
            CleanupTarget::Remote => {
                let session = self.connector.connect()?;
                session.remove(&job.source_path)?;
            }
            CleanupTarget::Local => {
                std::fs::remove_file(&outcome.local_path)
                    .map_err(|e| DrillError::local("remove", &outcome.local_path, e))?;
            }
        }
        Ok(())
    }
}
