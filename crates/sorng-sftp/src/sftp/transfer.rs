// ── Copy engine – stream a remote file into a local one ──────────────────────

use crate::sftp::error::{DrillError, DrillResult};
use crate::sftp::types::CopyOutcome;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Local file name for a remote source: its base name inside `dest_dir`.
pub fn local_destination(dest_dir: &Path, source_path: &str) -> DrillResult<PathBuf> {
    let name = Path::new(source_path).file_name().ok_or_else(|| {
        DrillError::Config(format!("source path '{}' has no file name", source_path))
    })?;
    Ok(dest_dir.join(name))
}

/// Copy everything `reader` yields into `dest_dir/<base name>`, creating or
/// truncating the file, then flush it to disk.
///
/// There is no resume: a failure mid-stream leaves a truncated local file.
pub fn copy_remote_file<R: Read>(
    reader: &mut R,
    source_path: &str,
    dest_dir: &Path,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> DrillResult<CopyOutcome> {
    let local_path = local_destination(dest_dir, source_path)?;
    let mut local_file =
        File::create(&local_path).map_err(|e| DrillError::local("create", &local_path, e))?;

    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut copied: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(DrillError::Cancelled);
        }

        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(DrillError::RemoteRead {
                    path: source_path.to_string(),
                    source: e,
                })
            }
        };

        local_file
            .write_all(&buf[..n])
            .map_err(|e| DrillError::local("write", &local_path, e))?;
        copied += n as u64;
    }

    local_file
        .sync_all()
        .map_err(|e| DrillError::local("sync", &local_path, e))?;

    debug!(source = source_path, local = %local_path.display(), bytes = copied, "copy complete");

    Ok(CopyOutcome {
        local_path,
        bytes: copied,
    })
}
