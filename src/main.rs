//! btprinter - Reassign the printer stored in BarTender label files
//!
//! Main entry point for the command line tool.
//!
//! # Execution Flow
//!
//! 1. Parse the command line
//! 2. Initialize diagnostic logging (stderr, optional rotating file)
//! 3. Load `config.ini` (or `--config`)
//! 4. Run the requested command:
//!    - `run`: validate, terminate stale BarTender processes, open one
//!      BarTender session and reassign printers folder by folder
//!    - `validate`: environment checks only
//!    - `init-config`: write a template configuration
//! 5. Map the result to the process exit code (0 success, 1 fatal failure)
//!
//! Every decision and per-file outcome is written to the audit log configured
//! in `[Paths] log_file_path`.
//!
//! # Platform
//!
//! Primary platform: Windows 10/11 with BarTender installed

use btprinter::{APP_NAME, VERSION};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = btprinter::cli::parse_cli();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = match btprinter::logging::setup_logging(
        cli.diagnostic_log_dir.as_deref(),
        APP_NAME,
        cli.debug,
    ) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            None
        }
    };

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    match btprinter::cli::run_with_cli(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(btprinter::cli::EXIT_FAILURE)
        }
    }
}
