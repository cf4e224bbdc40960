//! Data models for btprinter.
//!
//! - [`PrinterMapping`]: prefix-to-printer table and the pure [`resolve`] function
//! - [`ProcessingOutcome`] / [`FileRecord`]: per-file result of a batch run
//! - [`AppSettings`]: validated configuration loaded from the INI file
//!
//! All settings are loaded once at startup and never mutated during a run.

pub mod mapping;
pub mod outcome;
pub mod settings;

pub use mapping::{MappingError, PrefixRule, PrinterMapping, resolve};
pub use outcome::{FileRecord, ProcessingOutcome, SkipReason};
pub use settings::{
    AppSettings, DEFAULT_LOG_FILE_PATH, LABEL_EXTENSION, PathSettings, ProcessSettings,
    split_list,
};
