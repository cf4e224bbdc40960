// Run report
//
// Tallies the outcome of every label file processed in a run.

use crate::models::{FileRecord, ProcessingOutcome};
use camino::Utf8PathBuf;
use std::time::{Duration, Instant};

/// Summary of one batch run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Number of files whose printer was changed and saved
    pub changed: usize,

    /// Number of files skipped because no prefix matched
    pub skipped: usize,

    /// Number of files the application could not open
    pub open_failed: usize,

    /// Number of files that raised an error while being processed
    pub errors: usize,

    /// Folders that existed at enumeration time
    pub folders_processed: usize,

    /// Folders that were missing or unreadable at enumeration time
    pub folders_missing: Vec<Utf8PathBuf>,

    /// Every candidate file in processing order
    pub records: Vec<FileRecord>,

    start_time: Instant,
    elapsed: Option<Duration>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            changed: 0,
            skipped: 0,
            open_failed: 0,
            errors: 0,
            folders_processed: 0,
            folders_missing: Vec::new(),
            records: Vec::new(),
            start_time: Instant::now(),
            elapsed: None,
        }
    }

    /// Record the outcome of one file
    pub fn record(&mut self, record: FileRecord) {
        match record.outcome {
            ProcessingOutcome::Changed { .. } => self.changed += 1,
            ProcessingOutcome::Skipped(_) => self.skipped += 1,
            ProcessingOutcome::OpenFailed => self.open_failed += 1,
            ProcessingOutcome::ProcessingError { .. } => self.errors += 1,
        }
        self.records.push(record);
    }

    pub fn record_folder_processed(&mut self) {
        self.folders_processed += 1;
    }

    pub fn record_folder_missing(&mut self, folder: Utf8PathBuf) {
        self.folders_missing.push(folder);
    }

    /// Stop the run clock
    pub fn finish(&mut self) {
        self.elapsed = Some(self.start_time.elapsed());
    }

    /// Total number of candidate files seen
    pub fn total(&self) -> usize {
        self.changed + self.skipped + self.open_failed + self.errors
    }

    pub fn failures(&self) -> usize {
        self.open_failed + self.errors
    }

    /// Run duration, measured up to [`finish`](Self::finish) if it was called
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.start_time.elapsed())
    }

    /// Outcomes recorded for files with the given name
    pub fn outcomes_for(&self, file_name: &str) -> Vec<&ProcessingOutcome> {
        self.records
            .iter()
            .filter(|r| r.file_name == file_name)
            .map(|r| &r.outcome)
            .collect()
    }

    /// One-line summary used in the audit log
    pub fn summary(&self) -> String {
        format!(
            "Finished: {} changed, {} skipped, {} failed to open, {} errors ({} folder(s), {} missing)",
            self.changed,
            self.skipped,
            self.open_failed,
            self.errors,
            self.folders_processed,
            self.folders_missing.len()
        )
    }

    /// Log the report to the diagnostic log
    pub fn log_summary(&self) {
        tracing::info!("=== Run Summary ===");
        tracing::info!("Duration: {:.2}s", self.elapsed().as_secs_f64());
        tracing::info!(
            "Files: {} changed, {} skipped, {} open failures, {} errors",
            self.changed,
            self.skipped,
            self.open_failed,
            self.errors
        );
        tracing::info!(
            "Folders: {} processed, {} missing",
            self.folders_processed,
            self.folders_missing.len()
        );
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
