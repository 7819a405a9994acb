// ── Drill configuration – JSON file, then overrides ──────────────────────────

use crate::sftp::error::{DrillError, DrillResult};
use crate::sftp::schedule::DailyTrigger;
use crate::sftp::types::{CopyJobSpec, RemoteEndpoint, ScheduledTrigger, TransferLimits};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything one drill process needs. Every field has a default so a
/// config file only has to name what differs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillConfig {
    #[serde(default)]
    pub endpoint: RemoteEndpoint,
    #[serde(default)]
    pub job: CopyJobSpec,
    #[serde(default)]
    pub schedule: ScheduledTrigger,
    #[serde(default)]
    pub limits: TransferLimits,
}

impl DrillConfig {
    pub fn from_json_str(text: &str) -> DrillResult<Self> {
        serde_json::from_str(text).map_err(|e| DrillError::Config(format!("bad config JSON: {}", e)))
    }

    pub fn from_json_file(path: &Path) -> DrillResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DrillError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Reject values that could only fail later, and hand back the parsed
    /// trigger so callers do not parse it twice.
    pub fn validate(&self) -> DrillResult<DailyTrigger> {
        if self.endpoint.host.trim().is_empty() {
            return Err(DrillError::Config("remote host is required".into()));
        }
        if self.job.source_path.is_empty() {
            return Err(DrillError::Config("source path is required".into()));
        }
        if !self.job.source_path.starts_with('/') {
            return Err(DrillError::Config(format!(
                "source path '{}' must be absolute",
                self.job.source_path
            )));
        }
        if self.limits.chunk_size == 0 {
            return Err(DrillError::Config("chunk size must be greater than zero".into()));
        }
        if usize::try_from(self.limits.chunk_size).is_err() {
            return Err(DrillError::Config(format!(
                "chunk size {} does not fit in memory",
                self.limits.chunk_size
            )));
        }
        DailyTrigger::parse(&self.schedule)
    }

    /// Chunk size as a buffer length; only meaningful after [`validate`](Self::validate).
    pub fn chunk_len(&self) -> usize {
        usize::try_from(self.limits.chunk_size).unwrap_or(usize::MAX)
    }
}
