use sorng_sftp::sftp::*;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const TEN_MIB: usize = 10 * 1_048_576;

/// In-memory server whose file reappears after every delete, so a long
/// cycle sees the same source each iteration.
#[derive(Default)]
struct MemoryServer {
    files: Mutex<Vec<(String, Vec<u8>)>>,
    deletes: AtomicUsize,
}

impl MemoryServer {
    fn with_file(path: &str, data: Vec<u8>) -> Arc<Self> {
        let server = Self::default();
        server.files.lock().unwrap().push((path.to_string(), data));
        Arc::new(server)
    }

    fn lookup(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, d)| d.clone())
    }
}

struct MemoryConnector(Arc<MemoryServer>);
struct MemorySession(Arc<MemoryServer>);

impl Connector for MemoryConnector {
    type Session = MemorySession;

    fn connect(&self) -> DrillResult<MemorySession> {
        Ok(MemorySession(self.0.clone()))
    }
}

impl RemoteFs for MemorySession {
    type Reader = Cursor<Vec<u8>>;

    fn open_read(&self, path: &str) -> DrillResult<Self::Reader> {
        self.0
            .lookup(path)
            .map(Cursor::new)
            .ok_or_else(|| DrillError::RemoteOpen {
                path: path.to_string(),
                message: "no such file".into(),
            })
    }

    fn remove(&self, path: &str) -> DrillResult<()> {
        self.0.lookup(path).ok_or_else(|| DrillError::RemoteDelete {
            path: path.to_string(),
            message: "no such file".into(),
        })?;
        self.0.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn file_size(&self, path: &str) -> DrillResult<u64> {
        Ok(self.0.lookup(path).map(|d| d.len() as u64).unwrap_or(0))
    }
}

fn job(dest: &std::path::Path, count: u32) -> CopyJobSpec {
    CopyJobSpec {
        source_path: "/data/test.bin".into(),
        destination_dir: dest.to_path_buf(),
        repeat_count: count,
        cleanup: CleanupTarget::Remote,
    }
}

#[test]
fn test_three_ten_mib_copies_report_thirty_megabytes() {
    let dir = tempfile::tempdir().unwrap();
    let server = MemoryServer::with_file("/data/test.bin", vec![0x5a; TEN_MIB]);
    let reporter = ConsoleReporter::new(Vec::new(), chrono_tz::Asia::Tehran);
    let runner = CycleRunner::new(MemoryConnector(server.clone()), reporter, 1_048_576);

    let report = runner
        .run(&job(dir.path(), 3), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.iterations, 3);
    assert_eq!(report.total_bytes, 3 * TEN_MIB as u64);
    assert!((report.megabytes - 30.0).abs() < 1e-9);
    assert_eq!(server.deletes.load(Ordering::SeqCst), 3);

    let local = dir.path().join("test.bin");
    assert_eq!(std::fs::metadata(&local).unwrap().len(), TEN_MIB as u64);

    let text = String::from_utf8(runner.into_reporter().into_inner()).unwrap();
    assert!(text.contains("fake upload starting...\n\n"));
    assert!(text.contains("0.000000%: 0.000000 Megabyte copied\n"));
    assert!(text.contains("33.333333%: 10.000000 Megabyte copied\n"));
    assert!(text.contains("66.666667%: 20.000000 Megabyte copied\n"));
    assert!(text.contains("100.000000%: 30.000000 Megabyte copied\n"));
    assert!(text.trim_end().ends_with("fake upload finished"));
}

#[test]
fn test_missing_source_fails_first_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let server = MemoryServer::with_file("/data/other.bin", vec![1; 16]);
    let runner = CycleRunner::new(MemoryConnector(server.clone()), SilentReporter, 4096);

    let failure = runner
        .run(&job(dir.path(), 5), &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(failure.error, DrillError::RemoteOpen { .. }));
    assert_eq!(failure.progress.iteration_index, 0);
    assert_eq!(failure.progress.total_bytes_copied, 0);
    assert_eq!(server.deletes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scheduler_fire_drives_a_full_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let server = MemoryServer::with_file("/data/test.bin", vec![7; 4096]);
    let runner = Arc::new(CycleRunner::new(
        MemoryConnector(server.clone()),
        SilentReporter,
        1024,
    ));
    let spec = job(dir.path(), 2);
    let cancel = CancellationToken::new();

    let trigger = DailyTrigger::parse(&ScheduledTrigger::default()).unwrap();
    let scheduler = DailyScheduler::new(trigger);
    let cycle = Arc::new(move || runner.run(&spec, &cancel));

    let report = scheduler.fire(cycle).await.unwrap().unwrap();
    assert_eq!(report.iterations, 2);
    assert_eq!(report.total_bytes, 8192);
    assert_eq!(server.deletes.load(Ordering::SeqCst), 2);
}
