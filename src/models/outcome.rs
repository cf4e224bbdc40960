use camino::Utf8PathBuf;
use std::fmt;

/// Why a label file was left untouched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No configured prefix matches the filename
    NoPrefixMatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPrefixMatch => write!(f, "no matching prefix"),
        }
    }
}

/// Result of processing a single label file.
///
/// Exactly one outcome is produced per candidate file per run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProcessingOutcome {
    /// The printer was set and the file saved
    Changed { printer: String },

    /// The file was not opened
    Skipped(SkipReason),

    /// The application returned no document for the file
    OpenFailed,

    /// Opening, setting the printer, saving or closing raised an error
    ProcessingError { detail: String },
}

impl ProcessingOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, ProcessingOutcome::Changed { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ProcessingOutcome::OpenFailed | ProcessingOutcome::ProcessingError { .. }
        )
    }

    /// Short status label used in summaries
    pub fn status(&self) -> &'static str {
        match self {
            ProcessingOutcome::Changed { .. } => "changed",
            ProcessingOutcome::Skipped(_) => "skipped",
            ProcessingOutcome::OpenFailed => "open_failed",
            ProcessingOutcome::ProcessingError { .. } => "error",
        }
    }
}

/// A processed label file together with its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: Utf8PathBuf,
    pub file_name: String,
    pub outcome: ProcessingOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        let changed = ProcessingOutcome::Changed {
            printer: "420t".to_string(),
        };
        assert!(changed.is_changed());
        assert!(!changed.is_failure());

        assert!(ProcessingOutcome::OpenFailed.is_failure());
        assert!(
            ProcessingOutcome::ProcessingError {
                detail: "boom".to_string()
            }
            .is_failure()
        );

        let skipped = ProcessingOutcome::Skipped(SkipReason::NoPrefixMatch);
        assert!(!skipped.is_changed());
        assert!(!skipped.is_failure());
        assert_eq!(skipped.status(), "skipped");
    }
}
