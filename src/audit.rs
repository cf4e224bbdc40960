//! Audit log of every decision and outcome of a run.
//!
//! The audit log is the operator-facing record: one line per event in the form
//! `YYYY-MM-DD HH:MM:SS_LEVEL  : message`, with a blank line separating runs.
//! It is append-only and never truncated. An [`AuditLog`] instance is created
//! once per run and handed to every component that records events.
//!
//! Each event is also mirrored to `tracing` so it shows up in the diagnostic
//! log configured by [`crate::logging`].

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Failed to create audit log directory {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open audit log {path}: {source}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Format one audit record (without the trailing newline).
pub fn format_record(timestamp: &DateTime<Local>, level: Severity, message: &str) -> String {
    format!(
        "{}_{:<7}: {}",
        timestamp.format(TIMESTAMP_FORMAT),
        level.label(),
        message
    )
}

/// Append-only audit log sink.
///
/// Writes are best-effort: a failed write is reported through
/// `tracing::warn!` and never interrupts processing.
pub struct AuditLog {
    writer: Box<dyn Write + Send>,
    path: Option<Utf8PathBuf>,
    write_failures: usize,
}

impl AuditLog {
    /// Open (or create) the audit log file in append mode.
    ///
    /// The parent directory is created if it does not exist.
    pub fn open(path: &Utf8Path) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| AuditError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| AuditError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!("Audit log opened: {}", path);

        Ok(Self {
            writer: Box::new(file),
            path: Some(path.to_path_buf()),
            write_failures: 0,
        })
    }

    /// Build an audit log on top of an arbitrary writer.
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
            path: None,
            write_failures: 0,
        }
    }

    /// Mark the start of a new run with a blank line.
    pub fn begin_session(&mut self) {
        tracing::debug!("Audit session started");
        self.write_line("");
    }

    /// Record an event with the given severity.
    pub fn log_event(&mut self, level: Severity, message: impl AsRef<str>) {
        let message = message.as_ref();

        match level {
            Severity::Info => tracing::info!(target: "audit", "{}", message),
            Severity::Warning => tracing::warn!(target: "audit", "{}", message),
            Severity::Error => tracing::error!(target: "audit", "{}", message),
        }

        let line = format_record(&Local::now(), level, message);
        self.write_line(&line);
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.log_event(Severity::Info, message);
    }

    pub fn warning(&mut self, message: impl AsRef<str>) {
        self.log_event(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.log_event(Severity::Error, message);
    }

    /// Flush buffered records and release the sink.
    pub fn close(mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("Failed to flush audit log: {}", e);
        }
        if self.write_failures > 0 {
            tracing::warn!(
                "{} audit record(s) could not be written during this run",
                self.write_failures
            );
        }
    }

    /// Location of the backing file, if file-backed.
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Number of records that failed to be written.
    pub fn write_failures(&self) -> usize {
        self.write_failures
    }

    fn write_line(&mut self, line: &str) {
        let result = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());

        if let Err(e) = result {
            if self.write_failures == 0 {
                tracing::warn!("Failed to write audit record: {}", e);
            }
            self.write_failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_format_record_pads_level() {
        let ts = Local.with_ymd_and_hms(2025, 3, 14, 8, 5, 9).unwrap();

        assert_eq!(
            format_record(&ts, Severity::Info, "hello"),
            "2025-03-14 08:05:09_INFO   : hello"
        );
        assert_eq!(
            format_record(&ts, Severity::Warning, "careful"),
            "2025-03-14 08:05:09_WARNING: careful"
        );
        assert_eq!(
            format_record(&ts, Severity::Error, "boom"),
            "2025-03-14 08:05:09_ERROR  : boom"
        );
    }

    #[test]
    fn test_open_creates_parent_and_appends() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let path = dir.join("log").join("app.log");

        let mut log = AuditLog::open(&path).unwrap();
        log.begin_session();
        log.info("first run");
        log.close();

        let mut log = AuditLog::open(&path).unwrap();
        log.begin_session();
        log.error("second run");
        log.close();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "");
        assert!(lines[1].ends_with("_INFO   : first run"));
        assert_eq!(lines[2], "");
        assert!(lines[3].ends_with("_ERROR  : second run"));
    }

    #[test]
    fn test_write_failures_are_absorbed() {
        let mut log = AuditLog::from_writer(FailingWriter);
        log.begin_session();
        log.warning("lost");

        assert_eq!(log.write_failures(), 2);
        assert!(log.path().is_none());
        log.close();
    }

    #[derive(Clone, Default)]
    struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_events_mirrored_to_tracing_under_audit_target() {
        let captured = CapturedOutput::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        let mut log = AuditLog::from_writer(io::sink());
        tracing::subscriber::with_default(subscriber, || {
            log.info("Processing folder: T:/A");
            log.warning("Folder does not exist: T:/B");
            log.error("Failed to open file: T:/A/50x30_a.btw");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("INFO audit: Processing folder: T:/A"));
        assert!(lines[1].contains("WARN audit: Folder does not exist: T:/B"));
        assert!(lines[2].contains("ERROR audit: Failed to open file: T:/A/50x30_a.btw"));
    }
}
