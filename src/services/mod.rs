//! Services module - the printer reassignment engine.
//!
//! # Components
//!
//! - [`validation`]: gates a run on the BarTender executable and label folders
//! - [`automation`]: the narrow [`Automation`]/[`LabelSession`] surface of the
//!   label application, so the engine can run against fakes in tests
//! - [`bartender`]: the real backend, a PowerShell-hosted COM session
//! - [`batch`]: folder/file traversal with per-file fault isolation
//! - [`process`]: termination of stale BarTender processes before a run
//!
//! # Execution model
//!
//! Strictly sequential: one session per run, one folder at a time, one file
//! at a time. Only validation and session creation can abort a run.

pub mod automation;
pub mod bartender;
pub mod batch;
pub mod process;
pub mod validation;

pub use automation::{Automation, AutomationError, FormatHandle, LabelSession, SaveOption};
pub use bartender::BarTenderAutomation;
pub use batch::{
    BatchProcessor, RunError, SessionGuard, change_printer_for_files, list_label_files,
    start_session,
};
pub use process::{TerminateError, TerminateStatus, terminate_stale_instances};
pub use validation::{ValidationError, validate};
