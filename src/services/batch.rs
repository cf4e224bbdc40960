//! Batch processing of label folders.
//!
//! A run validates the environment, opens exactly one automation session,
//! walks every configured folder in order and every candidate file in each
//! folder, and finally quits the session. Per-file failures are isolated:
//! each file yields exactly one [`ProcessingOutcome`] and the batch always
//! moves on to the next file. Only validation and session creation are fatal.

use crate::audit::AuditLog;
use crate::models::{AppSettings, FileRecord, PrinterMapping, ProcessingOutcome, SkipReason};
use crate::report::RunReport;
use crate::services::automation::{Automation, AutomationError, LabelSession, SaveOption};
use crate::services::validation::{ValidationError, validate};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use thiserror::Error;

/// Fatal errors that abort a run before any file is processed
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to create BarTender session: {0}")]
    SessionCreationFailed(#[source] AutomationError),
}

/// Owns the automation session for the duration of a run.
///
/// The session is quit exactly once: explicitly through [`quit`](Self::quit),
/// or on drop if the run unwinds before reaching it.
pub struct SessionGuard {
    session: Box<dyn LabelSession>,
    closed: bool,
}

impl SessionGuard {
    pub fn new(session: Box<dyn LabelSession>) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    pub fn session(&mut self) -> &mut dyn LabelSession {
        self.session.as_mut()
    }

    /// Quit the application without saving pending changes.
    ///
    /// Documents are saved explicitly before they are closed, so discarding
    /// here never loses a completed change.
    pub fn quit(mut self) -> Result<(), AutomationError> {
        self.closed = true;
        self.session.quit(SaveOption::DoNotSaveChanges)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            tracing::warn!("Session dropped without explicit quit, terminating");
            if let Err(e) = self.session.quit(SaveOption::DoNotSaveChanges) {
                tracing::error!("Failed to quit session: {}", e);
            }
        }
    }
}

/// Create a session through `automation` and hide the application window.
pub fn start_session(automation: &dyn Automation) -> Result<SessionGuard, RunError> {
    let session = automation
        .dispatch()
        .map_err(RunError::SessionCreationFailed)?;
    let mut guard = SessionGuard::new(session);

    // If this fails the guard quits the half-initialized session on return
    guard
        .session()
        .set_visible(false)
        .map_err(RunError::SessionCreationFailed)?;

    tracing::info!("Automation session started");
    Ok(guard)
}

/// List candidate label files in `folder`, sorted by name.
///
/// Only regular files (or links to them) whose UTF-8 name ends with
/// `extension` are returned. Other entries are ignored silently.
pub fn list_label_files(
    folder: &Utf8Path,
    extension: &str,
) -> io::Result<Vec<(String, Utf8PathBuf)>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(folder)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {}: {}", folder, e);
                continue;
            }
        };

        let Ok(name) = entry.file_name().into_string() else {
            tracing::debug!("Skipping non UTF-8 entry in {}", folder);
            continue;
        };

        if !name.ends_with(extension) {
            continue;
        }

        let path = folder.join(&name);
        if !path.is_file() {
            continue;
        }

        files.push((name, path));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Drives the per-folder, per-file state machine of a run
pub struct BatchProcessor<'a> {
    mapping: &'a PrinterMapping,
    extension: &'a str,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(mapping: &'a PrinterMapping, extension: &'a str) -> Self {
        Self { mapping, extension }
    }

    /// Process every folder with an open session, then quit the session.
    pub fn run(
        &self,
        mut session: SessionGuard,
        folders: &[Utf8PathBuf],
        audit: &mut AuditLog,
    ) -> RunReport {
        let mut report = RunReport::new();

        for folder in folders {
            self.process_folder(session.session(), folder, audit, &mut report);
        }

        if let Err(e) = session.quit() {
            audit.error(format!("Failed to quit BarTender: {}", e));
        }

        report.finish();
        audit.info(report.summary());
        report.log_summary();
        report
    }

    /// Process all candidate files of a single folder.
    ///
    /// A folder that vanished since validation is reported as a warning and
    /// skipped; the run continues with the next folder.
    pub fn process_folder(
        &self,
        session: &mut dyn LabelSession,
        folder: &Utf8Path,
        audit: &mut AuditLog,
        report: &mut RunReport,
    ) {
        if !folder.is_dir() {
            audit.warning(format!("Folder does not exist: {}", folder));
            report.record_folder_missing(folder.to_path_buf());
            return;
        }

        audit.info(format!("Processing folder: {}", folder));

        let files = match list_label_files(folder, self.extension) {
            Ok(files) => files,
            Err(e) => {
                audit.warning(format!("Failed to read folder {}: {}", folder, e));
                report.record_folder_missing(folder.to_path_buf());
                return;
            }
        };
        report.record_folder_processed();

        tracing::debug!("{} candidate file(s) in {}", files.len(), folder);

        for (file_name, path) in files {
            let outcome = self.process_file(session, &path, &file_name);
            log_outcome(audit, &file_name, &outcome);
            report.record(FileRecord {
                path,
                file_name,
                outcome,
            });
        }
    }

    /// Resolve the printer for one file and apply it.
    ///
    /// Files without a matching prefix are never opened. After a successful
    /// open, a failure in setting the printer or saving triggers a best-effort
    /// close so no document is left open in the session.
    pub fn process_file(
        &self,
        session: &mut dyn LabelSession,
        path: &Utf8Path,
        file_name: &str,
    ) -> ProcessingOutcome {
        let Some(printer) = self.mapping.resolve(file_name) else {
            return ProcessingOutcome::Skipped(SkipReason::NoPrefixMatch);
        };

        let handle = match session.open(path) {
            Ok(Some(handle)) => handle,
            Ok(None) => return ProcessingOutcome::OpenFailed,
            Err(e) => {
                return ProcessingOutcome::ProcessingError {
                    detail: e.to_string(),
                };
            }
        };

        let applied = session
            .set_printer(handle, printer)
            .and_then(|_| session.save(handle));

        if let Err(e) = applied {
            if let Err(close_err) = session.close(handle, SaveOption::DoNotSaveChanges) {
                tracing::warn!("Failed to close {} after error: {}", file_name, close_err);
            }
            return ProcessingOutcome::ProcessingError {
                detail: e.to_string(),
            };
        }

        match session.close(handle, SaveOption::DoNotSaveChanges) {
            Ok(()) => ProcessingOutcome::Changed {
                printer: printer.to_string(),
            },
            Err(e) => ProcessingOutcome::ProcessingError {
                detail: e.to_string(),
            },
        }
    }
}

fn log_outcome(audit: &mut AuditLog, file_name: &str, outcome: &ProcessingOutcome) {
    match outcome {
        ProcessingOutcome::Changed { printer } => {
            audit.info(format!(
                "Printer \"{}\" successfully set for file: {}",
                printer, file_name
            ));
        }
        ProcessingOutcome::Skipped(reason) => {
            audit.info(format!("Skipped file ({}): {}", reason, file_name));
        }
        ProcessingOutcome::OpenFailed => {
            audit.error(format!("Failed to open file: {}", file_name));
        }
        ProcessingOutcome::ProcessingError { detail } => {
            audit.error(format!("Error while processing file {}: {}", file_name, detail));
        }
    }
}

/// Run a complete printer reassignment.
///
/// 1. Marks a new session in the audit log
/// 2. Validates the environment; on failure nothing else happens
/// 3. Calls `before_session` (stale-process termination in the binary)
/// 4. Opens one automation session and processes every folder
///
/// # Errors
/// [`RunError::Validation`] or [`RunError::SessionCreationFailed`]; both are
/// also recorded in the audit log. Per-file failures are never errors here.
pub fn change_printer_for_files<F>(
    automation: &dyn Automation,
    settings: &AppSettings,
    extension: &str,
    audit: &mut AuditLog,
    before_session: F,
) -> Result<RunReport, RunError>
where
    F: FnOnce(&mut AuditLog),
{
    audit.begin_session();

    if let Err(e) = validate(&settings.paths.bartender_path, &settings.paths.labels_folders) {
        audit.error(e.to_string());
        return Err(e.into());
    }

    before_session(audit);

    let session = match start_session(automation) {
        Ok(session) => session,
        Err(e) => {
            audit.error(e.to_string());
            return Err(e);
        }
    };

    let processor = BatchProcessor::new(&settings.printer_mapping, extension);
    Ok(processor.run(session, &settings.paths.labels_folders, audit))
}
