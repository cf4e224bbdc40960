// btprinter - Reassign the printer stored in BarTender label files
//
// This is the library crate containing the core business logic and data structures.
// The binary crate (main.rs) provides the command line entry point.

pub mod audit;
pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod report;
pub mod services;

// Re-export commonly used types for convenience
pub use audit::{AuditLog, Severity};
pub use config::ConfigManager;
pub use models::{AppSettings, PrinterMapping, ProcessingOutcome, resolve};
pub use report::RunReport;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
