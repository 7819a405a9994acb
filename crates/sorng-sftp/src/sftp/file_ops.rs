// ── Remote file client – open for reading, stat, delete ─────────────────────

use crate::sftp::error::{DrillError, DrillResult};
use crate::sftp::service::SftpSession;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// The remote side of a session: read-only access plus delete.
pub trait RemoteFs {
    type Reader: Read;

    fn open_read(&self, path: &str) -> DrillResult<Self::Reader>;

    fn remove(&self, path: &str) -> DrillResult<()>;

    fn file_size(&self, path: &str) -> DrillResult<u64>;
}

impl RemoteFs for SftpSession {
    type Reader = ssh2::File;

    fn open_read(&self, path: &str) -> DrillResult<ssh2::File> {
        self.channel()?
            .open(Path::new(path))
            .map_err(|e| DrillError::RemoteOpen {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    fn remove(&self, path: &str) -> DrillResult<()> {
        self.channel()?
            .unlink(Path::new(path))
            .map_err(|e| DrillError::RemoteDelete {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        info!(address = %self.address(), path, "SFTP deleted file");
        Ok(())
    }

    fn file_size(&self, path: &str) -> DrillResult<u64> {
        let stat = self
            .channel()?
            .stat(Path::new(path))
            .map_err(|e| DrillError::RemoteOpen {
                path: path.to_string(),
                message: format!("stat failed: {}", e),
            })?;
        Ok(stat.size.unwrap_or(0))
    }
}
