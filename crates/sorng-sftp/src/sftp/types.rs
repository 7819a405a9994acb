// ── Types ─────────────────────────────────────────────────────────────────────

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::sftp::error::DrillError;

/// One mebibyte; the unit progress is accounted in.
pub const BYTES_PER_MEGABYTE: f64 = 1_048_576.0;

// ── Serde default helpers ────────────────────────────────────────────────────

fn default_sftp_port() -> u16 {
    22
}
fn default_repeat_count() -> u32 {
    10
}
fn default_destination_dir() -> PathBuf {
    std::env::temp_dir()
}
fn default_time_of_day() -> String {
    "04:00".to_string()
}
fn default_timezone() -> String {
    "Asia/Tehran".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    30
}
fn default_io_timeout_secs() -> u64 {
    300
}
fn default_chunk_size() -> u64 {
    1_048_576 // 1 MiB
}

// ── Remote endpoint ──────────────────────────────────────────────────────────

/// Where to connect and how to log in. Password authentication only.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEndpoint {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_sftp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Off by default: the configured host name is trusted as-is and the
    /// server key is only logged. When on, the key must match an entry in
    /// `known_hosts_path` (or `~/.ssh/known_hosts`).
    #[serde(default)]
    pub verify_host_identity: bool,
    #[serde(default)]
    pub known_hosts_path: Option<PathBuf>,
}

impl RemoteEndpoint {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RemoteEndpoint {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_sftp_port(),
            username: String::new(),
            password: String::new(),
            verify_host_identity: false,
            known_hosts_path: None,
        }
    }
}

impl fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("verify_host_identity", &self.verify_host_identity)
            .field("known_hosts_path", &self.known_hosts_path)
            .finish()
    }
}

// ── Timeouts & I/O sizing ────────────────────────────────────────────────────

/// Deadlines applied to every blocking network call. `0` disables a limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferLimits {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            io_timeout_secs: default_io_timeout_secs(),
            chunk_size: default_chunk_size(),
        }
    }
}

// ── Copy job ─────────────────────────────────────────────────────────────────

/// Which copy is removed once an iteration's transfer has succeeded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CleanupTarget {
    #[default]
    Remote,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyJobSpec {
    #[serde(default)]
    pub source_path: String,
    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
    #[serde(default)]
    pub cleanup: CleanupTarget,
}

impl Default for CopyJobSpec {
    fn default() -> Self {
        Self {
            source_path: String::new(),
            destination_dir: default_destination_dir(),
            repeat_count: default_repeat_count(),
            cleanup: CleanupTarget::default(),
        }
    }
}

// ── Schedule ─────────────────────────────────────────────────────────────────

/// Daily firing rule, e.g. `04:00` in `Asia/Tehran`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTrigger {
    #[serde(default = "default_time_of_day")]
    pub time_of_day: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ScheduledTrigger {
    fn default() -> Self {
        Self {
            time_of_day: default_time_of_day(),
            timezone: default_timezone(),
        }
    }
}

// ── Progress ─────────────────────────────────────────────────────────────────

/// Running totals for one cycle. Created fresh by every cycle run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    pub total_megabytes_copied: f64,
    pub total_bytes_copied: u64,
    pub iteration_index: u32,
    pub total_iterations: u32,
}

impl TransferProgress {
    pub fn new(total_iterations: u32) -> Self {
        Self {
            total_megabytes_copied: 0.0,
            total_bytes_copied: 0,
            iteration_index: 0,
            total_iterations,
        }
    }

    /// Percentage of iterations completed before the current one.
    pub fn percent(&self) -> f64 {
        if self.total_iterations == 0 {
            return 100.0;
        }
        self.iteration_index as f64 / self.total_iterations as f64 * 100.0
    }

    pub fn record_copy(&mut self, bytes: u64) {
        self.total_bytes_copied += bytes;
        self.total_megabytes_copied += bytes as f64 / BYTES_PER_MEGABYTE;
    }
}

/// Result of a single copy-engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub local_path: PathBuf,
    pub bytes: u64,
}

// ── Cycle outcome ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub cycle_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub iterations: u32,
    pub total_bytes: u64,
    pub megabytes: f64,
    pub elapsed_secs: f64,
    pub average_mib_per_sec: f64,
}

/// A cycle that stopped early, with the totals reached before the error.
#[derive(Debug)]
pub struct CycleFailure {
    pub cycle_id: String,
    pub error: DrillError,
    pub progress: TransferProgress,
}

impl fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle {} failed at iteration {}/{}: {}",
            self.cycle_id,
            self.progress.iteration_index + 1,
            self.progress.total_iterations,
            self.error
        )
    }
}

impl std::error::Error for CycleFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
