use crate::models::PrinterMapping;
use camino::Utf8PathBuf;
use std::time::Duration;

/// Native extension of BarTender label documents (case-sensitive suffix)
pub const LABEL_EXTENSION: &str = ".btw";

/// Default location of the audit log when `log_file_path` is not configured
pub const DEFAULT_LOG_FILE_PATH: &str = "./log/app.log";

/// Process names terminated before a session is opened
pub const DEFAULT_STALE_PROCESSES: &[&str] = &["cmdr.exe", "bartend.exe"];

pub const DEFAULT_TERMINATE_TIMEOUT_SECS: u64 = 30;

/// Filesystem locations from the `[Paths]` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
    /// BarTender executable; its existence is the installation check
    pub bartender_path: Utf8PathBuf,

    /// Label folders in processing order
    pub labels_folders: Vec<Utf8PathBuf>,

    /// Destination of the audit log
    pub log_file_path: Utf8PathBuf,
}

/// Settings for terminating leftover BarTender processes before a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSettings {
    pub terminate_stale: bool,
    pub process_names: Vec<String>,
    pub timeout: Duration,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            terminate_stale: true,
            process_names: DEFAULT_STALE_PROCESSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout: Duration::from_secs(DEFAULT_TERMINATE_TIMEOUT_SECS),
        }
    }
}

/// Fully validated configuration for one run.
///
/// Loaded once at startup and immutable for the duration of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub paths: PathSettings,
    pub printer_mapping: PrinterMapping,
    pub process: ProcessSettings,
}

/// Split a `;`-delimited list, trimming whitespace and dropping empty entries.
///
/// Order is preserved and duplicates are kept.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
