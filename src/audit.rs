//! Append-only, size-rotated audit trail.
//!
//! Three independent channels — command trail, credential trail, and
//! alerts — each backed by its own rotating log file. The sink is
//! constructed once at startup and shared via `Arc`; sessions never
//! build their own. Each channel serializes its writers behind its own
//! mutex so a record line is appended atomically and rotation of one
//! channel never blocks the others.
//!
//! Audit writes must not take a session down: failures are reported via
//! operational logging and otherwise swallowed.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::AuditConfig;

const COMMAND_LOG: &str = "cmd_audits.log";
const CREDENTIAL_LOG: &str = "creds_audits.log";
const ALERT_LOG: &str = "alerts.log";

/// One size-rotated, line-oriented log file.
struct RotatingLog {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    // Serializes append + rotation; the file is reopened per record,
    // which keeps rotation trivial and record lines whole.
    lock: Mutex<()>,
}

impl RotatingLog {
    fn new(path: PathBuf, max_bytes: u64, backups: usize) -> Self {
        Self {
            path,
            max_bytes,
            backups,
            lock: Mutex::new(()),
        }
    }

    /// Appends one `<timestamp> <message>` line, rotating first if the
    /// line would push the file past the size threshold.
    async fn append(&self, message: &str) -> io::Result<()> {
        let line = format!(
            "{} {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            message
        );

        let _guard = self.lock.lock().await;

        let current = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        if current > 0 && current + line.len() as u64 > self.max_bytes {
            self.rotate().await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await
    }

    /// Shifts `log.1` .. `log.N-1` up by one (dropping the oldest) and
    /// moves the live file to `log.1`. Caller holds the lock.
    async fn rotate(&self) -> io::Result<()> {
        if self.backups == 0 {
            return fs::remove_file(&self.path).await;
        }
        let backup = |i: usize| PathBuf::from(format!("{}.{}", self.path.display(), i));
        let _ = fs::remove_file(backup(self.backups)).await;
        for i in (1..self.backups).rev() {
            let _ = fs::rename(backup(i), backup(i + 1)).await;
        }
        fs::rename(&self.path, backup(1)).await
    }
}

/// The process-wide audit sink.
pub struct AuditSink {
    command: RotatingLog,
    credential: RotatingLog,
    alert: RotatingLog,
}

impl AuditSink {
    pub fn open(config: &AuditConfig) -> Self {
        let log = |name: &str| {
            RotatingLog::new(config.dir.join(name), config.max_bytes, config.backups)
        };
        Self {
            command: log(COMMAND_LOG),
            credential: log(CREDENTIAL_LOG),
            alert: log(ALERT_LOG),
        }
    }

    /// Records to the command trail (every typed line, every response
    /// summary, every exec request).
    pub async fn command(&self, message: &str) {
        if let Err(e) = self.command.append(message).await {
            warn!("Command audit write failed: {e}");
        }
    }

    /// Records a captured credential attempt.
    pub async fn credential(&self, message: &str) {
        if let Err(e) = self.credential.append(message).await {
            warn!("Credential audit write failed: {e}");
        }
    }

    /// Records an operator alert.
    pub async fn alert(&self, message: &str) {
        if let Err(e) = self.alert.append(message).await {
            warn!("Alert audit write failed: {e}");
        }
    }

    /// Path of the command trail file (used by tests and tooling).
    pub fn command_log_path(&self) -> &Path {
        &self.command.path
    }

    pub fn credential_log_path(&self) -> &Path {
        &self.credential.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink_in(dir: &Path, max_bytes: u64, backups: usize) -> AuditSink {
        AuditSink::open(&AuditConfig {
            dir: dir.to_path_buf(),
            max_bytes,
            backups,
        })
    }

    #[tokio::test]
    async fn test_record_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(dir.path(), 10_000, 2);
        sink.command("10.0.0.1 executed command: ls").await;

        let content = std::fs::read_to_string(dir.path().join(COMMAND_LOG)).unwrap();
        let line = content.lines().next().unwrap();
        // <timestamp> <message>
        assert!(line.ends_with("10.0.0.1 executed command: ls"));
        assert!(line.starts_with(&Local::now().format("%Y-").to_string()));
    }

    #[tokio::test]
    async fn test_channels_are_independent_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(dir.path(), 10_000, 2);
        sink.command("a command").await;
        sink.credential("10.0.0.1, root, hunter2").await;
        sink.alert("suspicious activity").await;

        let cmd = std::fs::read_to_string(dir.path().join(COMMAND_LOG)).unwrap();
        let creds = std::fs::read_to_string(dir.path().join(CREDENTIAL_LOG)).unwrap();
        let alerts = std::fs::read_to_string(dir.path().join(ALERT_LOG)).unwrap();
        assert!(cmd.contains("a command"));
        assert!(creds.contains("hunter2"));
        assert!(alerts.contains("suspicious"));
        assert!(!cmd.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_rotation_shifts_backups() {
        let dir = tempfile::tempdir().unwrap();
        // Threshold small enough that each record forces a rotation
        let sink = sink_in(dir.path(), 40, 2);
        sink.command("first record, long enough to fill the file").await;
        sink.command("second record, long enough to fill the file").await;
        sink.command("third record, long enough to fill the file").await;

        let live = std::fs::read_to_string(dir.path().join(COMMAND_LOG)).unwrap();
        let one =
            std::fs::read_to_string(dir.path().join(format!("{COMMAND_LOG}.1"))).unwrap();
        let two =
            std::fs::read_to_string(dir.path().join(format!("{COMMAND_LOG}.2"))).unwrap();
        assert!(live.contains("third"));
        assert!(one.contains("second"));
        assert!(two.contains("first"));
    }

    #[tokio::test]
    async fn test_rotation_drops_oldest_beyond_backup_count() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(dir.path(), 40, 1);
        sink.command("record one, long enough to force rotation").await;
        sink.command("record two, long enough to force rotation").await;
        sink.command("record three, long enough to force rotation").await;

        assert!(dir.path().join(format!("{COMMAND_LOG}.1")).exists());
        assert!(!dir.path().join(format!("{COMMAND_LOG}.2")).exists());
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_interleave_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = std::sync::Arc::new(sink_in(dir.path(), 1_000_000, 2));

        let mut handles = Vec::new();
        for i in 0..20 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                for j in 0..10 {
                    sink.command(&format!("writer-{i} record-{j}")).await;
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let content = std::fs::read_to_string(dir.path().join(COMMAND_LOG)).unwrap();
        assert_eq!(content.lines().count(), 200);
        for line in content.lines() {
            assert!(line.contains("writer-"), "mangled line: {line}");
            assert!(line.contains("record-"), "mangled line: {line}");
        }
    }
}
