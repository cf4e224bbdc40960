//! The narrow automation surface of the label-design application.
//!
//! Only six capabilities are consumed: create a session, hide its UI, open a
//! document, set the document printer, save it and close it, and quit the
//! session. Everything else about the application is opaque.

use camino::Utf8Path;
use thiserror::Error;

/// Save behaviour when closing a document or quitting the application.
///
/// Documents are always saved explicitly before closing, so closing and
/// quitting only ever discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOption {
    /// `btDoNotSaveChanges`
    DoNotSaveChanges,
}

impl SaveOption {
    /// Numeric value of the corresponding BarTender enumeration
    pub fn code(self) -> i32 {
        match self {
            SaveOption::DoNotSaveChanges => 1,
        }
    }
}

/// Opaque handle to a document opened in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatHandle(pub u32);

/// Errors reported by the automation backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomationError {
    #[error("Failed to start automation session: {0}")]
    SessionStart(String),

    #[error("Automation call failed: {0}")]
    Call(String),

    #[error("Automation session is no longer available: {0}")]
    Disconnected(String),

    #[error("Unknown document handle {0:?}")]
    UnknownHandle(FormatHandle),
}

/// Creates automation sessions (`Dispatch()`)
pub trait Automation {
    fn dispatch(&self) -> Result<Box<dyn LabelSession>, AutomationError>;
}

/// One live automation session.
///
/// At most one document is open at a time in sequential use. `quit` must be
/// called exactly once at the end of the session.
#[cfg_attr(test, mockall::automock)]
pub trait LabelSession {
    /// `AppHandle.Visible = visible`
    fn set_visible(&mut self, visible: bool) -> Result<(), AutomationError>;

    /// `AppHandle.Formats.Open(path, false, "")`; `Ok(None)` when the
    /// application returned no document
    fn open(&mut self, path: &Utf8Path) -> Result<Option<FormatHandle>, AutomationError>;

    /// `FormatHandle.Printer = printer`
    fn set_printer(&mut self, format: FormatHandle, printer: &str) -> Result<(), AutomationError>;

    /// `FormatHandle.Save()`
    fn save(&mut self, format: FormatHandle) -> Result<(), AutomationError>;

    /// `FormatHandle.Close(option)`
    fn close(&mut self, format: FormatHandle, option: SaveOption) -> Result<(), AutomationError>;

    /// `AppHandle.Quit(option)`
    fn quit(&mut self, option: SaveOption) -> Result<(), AutomationError>;
}
