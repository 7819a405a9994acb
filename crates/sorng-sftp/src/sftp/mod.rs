// ── sorng-sftp / sftp module ──────────────────────────────────────────────────
//
// SFTP download drill:
//   • Password-authenticated sessions with optional known_hosts checking
//   • Streaming remote → local copy with fsync and cancellation
//   • Repeat-count cycles with megabyte accounting and console progress
//   • Daily wall-clock trigger in a configurable IANA time zone

pub mod types;
pub mod error;
pub mod config;
pub mod service;
pub mod file_ops;
pub mod transfer;
pub mod progress;
pub mod cycle;
pub mod schedule;

pub use config::DrillConfig;
pub use cycle::CycleRunner;
pub use error::{DrillError, DrillResult};
pub use file_ops::RemoteFs;
pub use progress::{ConsoleReporter, ProgressReporter, SilentReporter};
pub use schedule::{continue_after, next_firing, CycleOutcome, DailyScheduler, DailyTrigger, FiringGuard};
pub use service::{Connector, SftpConnector, SftpSession};
pub use types::*;
