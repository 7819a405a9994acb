//! Runs one real cycle against an OpenSSH server.
//!
//! Needs `--features docker-e2e -- --ignored` and these variables:
//! `SORNG_E2E_SFTP_HOST`, `SORNG_E2E_SFTP_PORT` (default 22),
//! `SORNG_E2E_SFTP_USER`, `SORNG_E2E_SFTP_PASSWORD`.
#![cfg(feature = "docker-e2e")]

use sorng_sftp::sftp::*;
use std::io::Write;
use std::net::TcpStream;
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn endpoint_from_env() -> RemoteEndpoint {
    let var = |name: &str| std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"));
    RemoteEndpoint {
        host: var("SORNG_E2E_SFTP_HOST"),
        port: std::env::var("SORNG_E2E_SFTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(22),
        username: var("SORNG_E2E_SFTP_USER"),
        password: var("SORNG_E2E_SFTP_PASSWORD"),
        ..RemoteEndpoint::default()
    }
}

/// Upload `data` to `path` with a plain ssh2 session.
fn seed_remote_file(endpoint: &RemoteEndpoint, path: &str, data: &[u8]) {
    let tcp = TcpStream::connect(endpoint.address()).unwrap();
    let mut session = ssh2::Session::new().unwrap();
    session.set_tcp_stream(tcp);
    session.handshake().unwrap();
    session
        .userauth_password(&endpoint.username, &endpoint.password)
        .unwrap();
    let sftp = session.sftp().unwrap();
    let mut file = sftp.create(Path::new(path)).unwrap();
    file.write_all(data).unwrap();
}

#[test]
#[ignore = "needs a live SFTP server"]
fn test_single_iteration_copies_and_removes_remote_file() {
    let endpoint = endpoint_from_env();
    let remote_path = format!("/tmp/sorng-drill-{}.bin", std::process::id());
    let data = vec![0x42u8; 3 * 1_048_576];
    seed_remote_file(&endpoint, &remote_path, &data);

    let dir = tempfile::tempdir().unwrap();
    let connector = SftpConnector::new(endpoint.clone(), TransferLimits::default());
    let runner = CycleRunner::new(connector.clone(), SilentReporter, 1_048_576);
    let job = CopyJobSpec {
        source_path: remote_path.clone(),
        destination_dir: dir.path().to_path_buf(),
        repeat_count: 1,
        cleanup: CleanupTarget::Remote,
    };

    let report = runner.run(&job, &CancellationToken::new()).unwrap();
    assert!((report.megabytes - 3.0).abs() < 1e-9);

    let local = dir.path().join(Path::new(&remote_path).file_name().unwrap());
    assert_eq!(std::fs::read(local).unwrap(), data);

    // The source is gone, so the next open fails.
    let session = connector.connect().unwrap();
    assert!(session.file_size(&remote_path).is_err());
}

#[test]
#[ignore = "needs a live SFTP server"]
fn test_wrong_password_is_connection_error() {
    let endpoint = RemoteEndpoint {
        password: "definitely-not-the-password".into(),
        ..endpoint_from_env()
    };
    let connector = SftpConnector::new(endpoint, TransferLimits::default());
    assert!(matches!(
        connector.connect(),
        Err(DrillError::Connection { .. })
    ));
}
