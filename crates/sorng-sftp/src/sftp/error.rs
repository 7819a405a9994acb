// ── Error taxonomy ───────────────────────────────────────────────────────────

use std::path::PathBuf;
use thiserror::Error;

pub type DrillResult<T> = Result<T, DrillError>;

#[derive(Debug, Error)]
pub enum DrillError {
    /// Bad configuration; fatal before scheduling starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Resolve, TCP, handshake, host identity or authentication failure.
    #[error("connection to {address} failed: {message}")]
    Connection { address: String, message: String },

    #[error("cannot open remote '{path}': {message}")]
    RemoteOpen { path: String, message: String },

    #[error("read from remote '{path}' failed: {source}")]
    RemoteRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The copy ended at a different length than the remote reported.
    #[error("copy of '{path}' incomplete: {copied} of {expected} bytes")]
    SizeMismatch {
        path: String,
        expected: u64,
        copied: u64,
    },

    #[error("cannot delete remote '{path}': {message}")]
    RemoteDelete { path: String, message: String },

    #[error("local {op} of {shown} failed: {source}", shown = .path.display())]
    LocalIo {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cycle cancelled")]
    Cancelled,
}

impl DrillError {
    pub(crate) fn connection(address: &str, message: impl Into<String>) -> Self {
        DrillError::Connection {
            address: address.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn local(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DrillError::LocalIo {
            op,
            path: path.into(),
            source,
        }
    }

    /// Setup errors terminate the process; everything else only ends a cycle.
    pub fn is_setup(&self) -> bool {
        matches!(self, DrillError::Config(_))
    }
}
