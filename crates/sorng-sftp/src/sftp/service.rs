// ── Connection factory – authenticated SSH sessions with an SFTP channel ─────

use crate::sftp::error::{DrillError, DrillResult};
use crate::sftp::file_ops::RemoteFs;
use crate::sftp::types::*;
use base64::Engine;
use ssh2::{CheckResult, KnownHostFileKind, Session, Sftp};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Produces a fresh, authenticated session per call. Callers own the
/// session and release it by dropping it.
pub trait Connector: Send + Sync {
    type Session: RemoteFs;

    fn connect(&self) -> DrillResult<Self::Session>;
}

// ── Live session ─────────────────────────────────────────────────────────────

pub struct SftpSession {
    address: String,
    // Dropped before the SSH disconnect in `Drop`.
    sftp: Option<Sftp>,
    session: Session,
}

impl SftpSession {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn channel(&self) -> DrillResult<&Sftp> {
        self.sftp
            .as_ref()
            .ok_or_else(|| DrillError::connection(&self.address, "SFTP channel already closed"))
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        self.sftp.take();
        if let Err(e) = self.session.disconnect(None, "Client disconnecting", None) {
            debug!(address = %self.address, "SSH disconnect failed: {}", e);
        }
        debug!(address = %self.address, "SFTP session closed");
    }
}

// ── Connector over ssh2 ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SftpConnector {
    endpoint: RemoteEndpoint,
    limits: TransferLimits,
}

impl SftpConnector {
    pub fn new(endpoint: RemoteEndpoint, limits: TransferLimits) -> Self {
        Self { endpoint, limits }
    }

    fn open_tcp(&self, address: &str) -> Result<TcpStream, String> {
        let socket_addr = address
            .to_socket_addrs()
            .map_err(|e| format!("cannot resolve '{}': {}", address, e))?
            .next()
            .ok_or_else(|| format!("'{}' resolved to no addresses", address))?;

        let tcp = match self.limits.connect_timeout_secs {
            0 => TcpStream::connect(socket_addr),
            secs => TcpStream::connect_timeout(&socket_addr, Duration::from_secs(secs)),
        }
        .map_err(|e| format!("TCP connection to {} failed: {}", socket_addr, e))?;

        tcp.set_nonblocking(false)
            .map_err(|e| format!("failed to set blocking mode: {}", e))?;
        Ok(tcp)
    }

    // ── Host identity ────────────────────────────────────────────────────────

    fn check_host_identity(&self, session: &Session) -> Result<(), String> {
        let fingerprint = host_key_fingerprint(session)
            .unwrap_or_else(|| "<unavailable>".to_string());

        if !self.endpoint.verify_host_identity {
            warn!(
                host = %self.endpoint.host,
                %fingerprint,
                "host identity not verified (verifyHostIdentity is off)"
            );
            return Ok(());
        }

        let (key, _) = session
            .host_key()
            .ok_or("server presented no host key")?;

        let path = self
            .endpoint
            .known_hosts_path
            .clone()
            .or_else(default_known_hosts_path)
            .ok_or("no known_hosts file configured and no home directory found")?;

        let mut known = session
            .known_hosts()
            .map_err(|e| format!("cannot initialise known_hosts: {}", e))?;
        known
            .read_file(&path, KnownHostFileKind::OpenSSH)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;

        match known.check_port(&self.endpoint.host, self.endpoint.port, key) {
            CheckResult::Match => {
                debug!(host = %self.endpoint.host, %fingerprint, "host key verified");
                Ok(())
            }
            CheckResult::NotFound => Err(format!(
                "host key {} for '{}' not found in '{}'",
                fingerprint,
                self.endpoint.host,
                path.display()
            )),
            CheckResult::Mismatch => Err(format!(
                "host key {} for '{}' does not match '{}'",
                fingerprint,
                self.endpoint.host,
                path.display()
            )),
            CheckResult::Failure => Err("host key check failed".to_string()),
        }
    }

    // ── Authentication ───────────────────────────────────────────────────────

    fn authenticate(&self, session: &Session) -> Result<&'static str, String> {
        let username = &self.endpoint.username;
        let password = &self.endpoint.password;

        if session.userauth_password(username, password).is_ok() && session.authenticated() {
            return Ok("password");
        }

        // Some servers only offer keyboard-interactive for password logins.
        struct PasswordPrompt<'a> {
            password: &'a str,
        }

        impl ssh2::KeyboardInteractivePrompt for PasswordPrompt<'_> {
            fn prompt(
                &mut self,
                _username: &str,
                _instructions: &str,
                prompts: &[ssh2::Prompt],
            ) -> Vec<String> {
                prompts.iter().map(|_| self.password.to_string()).collect()
            }
        }

        let mut prompt = PasswordPrompt { password };
        if session
            .userauth_keyboard_interactive(username, &mut prompt)
            .is_ok()
            && session.authenticated()
        {
            return Ok("keyboard-interactive");
        }

        Err(format!("password rejected for user '{}'", username))
    }
}

impl Connector for SftpConnector {
    type Session = SftpSession;

    fn connect(&self) -> DrillResult<SftpSession> {
        let address = self.endpoint.address();
        debug!(%address, "SFTP connecting");

        let tcp = self
            .open_tcp(&address)
            .map_err(|e| DrillError::connection(&address, e))?;

        let mut session = Session::new()
            .map_err(|e| DrillError::connection(&address, format!("cannot create SSH session: {}", e)))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(io_timeout_millis(self.limits.io_timeout_secs));
        session
            .handshake()
            .map_err(|e| DrillError::connection(&address, format!("SSH handshake failed: {}", e)))?;

        self.check_host_identity(&session)
            .map_err(|e| DrillError::connection(&address, e))?;

        let method = self
            .authenticate(&session)
            .map_err(|e| DrillError::connection(&address, format!("authentication failed: {}", e)))?;

        let sftp = session
            .sftp()
            .map_err(|e| DrillError::connection(&address, format!("SFTP subsystem unavailable: {}", e)))?;

        info!(%address, method, "SFTP session established");

        Ok(SftpSession {
            address,
            sftp: Some(sftp),
            session,
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// `ssh2` takes milliseconds as `u32`; `0` means no timeout.
fn io_timeout_millis(secs: u64) -> u32 {
    secs.saturating_mul(1000).min(u32::MAX as u64) as u32
}

fn default_known_hosts_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("known_hosts"))
}

fn host_key_fingerprint(session: &Session) -> Option<String> {
    session
        .host_key_hash(ssh2::HashType::Sha256)
        .map(|bytes| {
            format!(
                "SHA256:{}",
                base64::engine::general_purpose::STANDARD_NO_PAD.encode(bytes)
            )
        })
}
