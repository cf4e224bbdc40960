//! Command line interface and exit-code mapping.

use crate::audit::AuditLog;
use crate::config::{ConfigManager, DEFAULT_CONFIG_FILE};
use crate::models::{AppSettings, LABEL_EXTENSION, ProcessSettings};
use crate::services::{
    BarTenderAutomation, TerminateStatus, change_printer_for_files, terminate_stale_instances,
    validate,
};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Exit code for configuration, validation and session start failures
pub const EXIT_FAILURE: u8 = 1;

#[derive(Parser, Debug)]
#[command(
    name = "btprinter",
    version,
    about = "Reassign the printer stored in BarTender label files by filename prefix"
)]
pub struct Cli {
    /// Path to the INI configuration file
    #[arg(short, long, env = "BTPRINTER_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: Utf8PathBuf,

    /// Enable debug-level diagnostic logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Also write diagnostic logs (daily rotation) to this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub diagnostic_log_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Reassign printers in all configured label folders (default)
    Run {
        /// Do not terminate running BarTender processes first
        #[arg(long)]
        no_terminate: bool,
    },

    /// Check the installation and label folders without touching any file
    Validate,

    /// Write a template configuration file
    InitConfig {
        /// Output path (defaults to --config)
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Execute the parsed command line.
///
/// Per-file failures never change the exit code; only configuration,
/// validation and session start failures yield [`EXIT_FAILURE`].
pub fn run_with_cli(cli: Cli) -> Result<ExitCode> {
    let command = cli.command.clone().unwrap_or(Commands::Run {
        no_terminate: false,
    });

    match command {
        Commands::InitConfig { output, force } => {
            let path = output.unwrap_or_else(|| cli.config.clone());
            ConfigManager::new(&path)
                .write_template(force)
                .context("Failed to create configuration template")?;
            println!("Configuration template written to {}", path);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            let Some(settings) = load_settings(&cli.config) else {
                return Ok(ExitCode::from(EXIT_FAILURE));
            };
            let mut audit = open_audit_log(&settings);
            audit.begin_session();

            let code = match validate(
                &settings.paths.bartender_path,
                &settings.paths.labels_folders,
            ) {
                Ok(()) => {
                    audit.info("Validation passed: BarTender installed and all folders present");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    audit.error(e.to_string());
                    ExitCode::from(EXIT_FAILURE)
                }
            };
            audit.close();
            Ok(code)
        }
        Commands::Run { no_terminate } => {
            let Some(settings) = load_settings(&cli.config) else {
                return Ok(ExitCode::from(EXIT_FAILURE));
            };
            execute_run(&settings, !no_terminate)
        }
    }
}

fn load_settings(config_path: &Utf8Path) -> Option<AppSettings> {
    match ConfigManager::new(config_path).load_settings() {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::error!("{}", e);
            None
        }
    }
}

/// Open the configured audit log, falling back to a discarding sink.
fn open_audit_log(settings: &AppSettings) -> AuditLog {
    match AuditLog::open(&settings.paths.log_file_path) {
        Ok(audit) => audit,
        Err(e) => {
            tracing::error!("{} - audit records will only appear in diagnostics", e);
            AuditLog::from_writer(std::io::sink())
        }
    }
}

fn execute_run(settings: &AppSettings, terminate: bool) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let mut audit = open_audit_log(settings);
    let automation = BarTenderAutomation::new();

    let result = change_printer_for_files(
        &automation,
        settings,
        LABEL_EXTENSION,
        &mut audit,
        |audit| {
            if terminate && settings.process.terminate_stale {
                terminate_stale(&runtime, &settings.process, audit);
            } else {
                tracing::info!("Stale process termination disabled");
            }
        },
    );

    audit.close();

    match result {
        Ok(report) => {
            tracing::info!("Run complete: {}", report.summary());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("Run aborted: {}", e);
            Ok(ExitCode::from(EXIT_FAILURE))
        }
    }
}

fn terminate_stale(runtime: &tokio::runtime::Runtime, process: &ProcessSettings, audit: &mut AuditLog) {
    let results = runtime.block_on(terminate_stale_instances(
        &process.process_names,
        process.timeout,
    ));

    for (name, result) in results {
        match result {
            Ok(TerminateStatus::Terminated) => {
                tracing::info!("Terminated running {} instances", name);
            }
            Ok(TerminateStatus::NotRunning) | Ok(TerminateStatus::Unsupported) => {
                tracing::debug!("No {} instances terminated", name);
            }
            Ok(TerminateStatus::Failed(code)) => {
                audit.error(format!(
                    "Error while terminating BarTender processes: taskkill {} exited with code {}",
                    name, code
                ));
            }
            Err(e) => {
                audit.error(format!("Error while terminating BarTender processes: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::try_parse_from(["btprinter"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Utf8PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_parse_run_flags() {
        let cli =
            Cli::try_parse_from(["btprinter", "--config", "C:/bt/config.ini", "run", "--no-terminate"])
                .unwrap();
        assert_eq!(cli.config, Utf8PathBuf::from("C:/bt/config.ini"));
        assert_eq!(cli.command, Some(Commands::Run { no_terminate: true }));
    }

    #[test]
    fn test_parse_init_config() {
        let cli = Cli::try_parse_from(["btprinter", "init-config", "-o", "out.ini", "--force"])
            .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::InitConfig {
                output: Some(Utf8PathBuf::from("out.ini")),
                force: true
            })
        );
    }
}
