// ── Scheduler trigger – one cycle per day at a local wall-clock time ─────────

use crate::sftp::error::{DrillError, DrillResult};
use crate::sftp::types::{CycleFailure, CycleReport, ScheduledTrigger};
use chrono::{DateTime, Days, Duration as ChronoDuration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub type CycleOutcome = Result<CycleReport, CycleFailure>;

// ── Trigger ──────────────────────────────────────────────────────────────────

/// A validated [`ScheduledTrigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    time_of_day: NaiveTime,
    tz: Tz,
}

impl DailyTrigger {
    pub fn new(time_of_day: NaiveTime, tz: Tz) -> Self {
        Self { time_of_day, tz }
    }

    /// Accepts `HH:MM` or `HH:MM:SS` and an IANA zone name.
    pub fn parse(trigger: &ScheduledTrigger) -> DrillResult<Self> {
        let text = trigger.time_of_day.trim();
        let time_of_day = NaiveTime::parse_from_str(text, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
            .map_err(|e| {
                DrillError::Config(format!("invalid time of day '{}': {}", trigger.time_of_day, e))
            })?;
        let tz = trigger.timezone.trim().parse::<Tz>().map_err(|e| {
            DrillError::Config(format!("unknown time zone '{}': {}", trigger.timezone, e))
        })?;
        Ok(Self { time_of_day, tz })
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.time_of_day
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// First firing strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> DrillResult<DateTime<Tz>> {
        let local = after.with_timezone(&self.tz);
        next_firing(&local, self.time_of_day).ok_or_else(|| {
            DrillError::Config(format!("no firing after {} is representable", local))
        })
    }

    /// Next firing after the one at `last_fired`, never earlier than `now`.
    ///
    /// A wake-up that lands slightly before the wall-clock target would
    /// otherwise find the same firing again.
    pub fn rearm(
        &self,
        now: DateTime<Utc>,
        last_fired: Option<DateTime<Utc>>,
    ) -> DrillResult<DateTime<Tz>> {
        let from = last_fired.map_or(now, |last| now.max(last));
        self.next_after(from)
    }
}

/// Next local occurrence of `at` strictly after `after`, in `after`'s zone.
///
/// A time inside a DST gap moves forward to the first instant that exists;
/// an ambiguous time uses the earlier of its two instants.
pub fn next_firing<T: TimeZone>(after: &DateTime<T>, at: NaiveTime) -> Option<DateTime<T>> {
    let tz = after.timezone();
    let today = after.naive_local().date();
    (0..=2u64)
        .filter_map(|days| today.checked_add_days(Days::new(days)))
        .filter_map(|date| resolve_local(&tz, date.and_time(at)))
        .find(|candidate| candidate > after)
}

fn resolve_local<T: TimeZone>(tz: &T, local: NaiveDateTime) -> Option<DateTime<T>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=180)
            .map(|minutes| local + ChronoDuration::minutes(minutes))
            .find_map(|shifted| tz.from_local_datetime(&shifted).earliest()),
    }
}

// ── One-at-a-time guard ──────────────────────────────────────────────────────

/// Held while a cycle runs; a second firing cannot start until it drops.
#[derive(Debug, Default)]
pub struct FiringGuard {
    busy: AtomicBool,
}

pub struct FiringPermit {
    guard: Arc<FiringGuard>,
}

impl FiringGuard {
    pub fn try_acquire(self: &Arc<Self>) -> Option<FiringPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FiringPermit {
                guard: Arc::clone(self),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FiringPermit {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

// ── Scheduler ────────────────────────────────────────────────────────────────

pub struct DailyScheduler {
    trigger: DailyTrigger,
    guard: Arc<FiringGuard>,
}

impl DailyScheduler {
    pub fn new(trigger: DailyTrigger) -> Self {
        Self {
            trigger,
            guard: Arc::new(FiringGuard::default()),
        }
    }

    pub fn guard(&self) -> &Arc<FiringGuard> {
        &self.guard
    }

    /// Run `cycle` once now on the blocking pool and wait for it.
    ///
    /// Returns `None` when another cycle still holds the guard (the firing
    /// is skipped) or the cycle panicked.
    pub async fn fire<F>(&self, cycle: Arc<F>) -> Option<CycleOutcome>
    where
        F: Fn() -> CycleOutcome + Send + Sync + 'static,
    {
        let Some(permit) = self.guard.try_acquire() else {
            warn!("previous cycle still running; skipping this firing");
            return None;
        };

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            cycle()
        });

        match task.await {
            Ok(Ok(report)) => {
                info!(
                    cycle = %report.cycle_id,
                    megabytes = report.megabytes,
                    elapsed_secs = report.elapsed_secs,
                    "scheduled cycle completed"
                );
                Some(Ok(report))
            }
            Ok(Err(failure)) => {
                error!(cycle = %failure.cycle_id, "{}", failure);
                Some(Err(failure))
            }
            Err(e) => {
                error!("cycle task panicked: {}", e);
                None
            }
        }
    }

    /// Fire `cycle` every day at the trigger time until `cancel` fires or a
    /// cycle fails with a setup error.
    ///
    /// Firings missed while a cycle overran are not replayed; the next one
    /// is computed from the moment the previous cycle returned.
    pub async fn run<F>(&self, cycle: Arc<F>, cancel: CancellationToken) -> DrillResult<()>
    where
        F: Fn() -> CycleOutcome + Send + Sync + 'static,
    {
        let mut last_fired: Option<DateTime<Utc>> = None;
        loop {
            let next = self.trigger.rearm(Utc::now(), last_fired)?;
            info!(next = %next, "next cycle scheduled");

            let wait = (next.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or_default();

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("scheduler stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {}
            }

            last_fired = Some(next.with_timezone(&Utc));
            continue_after(self.fire(Arc::clone(&cycle)).await)?;
        }
    }
}

/// `Err` when a firing's outcome must end the schedule: only setup errors
/// do; every other cycle failure is already logged by [`DailyScheduler::fire`].
pub fn continue_after(outcome: Option<CycleOutcome>) -> DrillResult<()> {
    match outcome {
        Some(Err(failure)) if failure.error.is_setup() => Err(failure.error),
        _ => Ok(()),
    }
}
