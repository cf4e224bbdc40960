use crate::models::{
    AppSettings, DEFAULT_LOG_FILE_PATH, MappingError, PathSettings, PrinterMapping,
    ProcessSettings, split_list,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::Config;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use thiserror::Error;

mod ini_source;

pub use ini_source::LiteralIniFile;

/// Default configuration file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.ini";

/// Errors raised while loading or generating the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(Utf8PathBuf),

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("Missing required key [{section}] {key}")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },

    #[error("Invalid [PrinterMapping] section: {0}")]
    Mapping(#[from] MappingError),

    #[error("Configuration file already exists: {0} (use --force to overwrite)")]
    AlreadyExists(Utf8PathBuf),

    #[error("Failed to write configuration file {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "Paths", alias = "paths")]
    paths: Option<RawPaths>,

    #[serde(rename = "PrinterMapping", alias = "printermapping", default)]
    printer_mapping: IndexMap<String, String>,

    #[serde(rename = "Process", alias = "process", default)]
    process: RawProcess,
}

#[derive(Debug, Deserialize)]
struct RawPaths {
    bartender_path: Option<String>,
    labels_folders: Option<String>,
    labels_folder: Option<String>,
    log_file_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProcess {
    terminate_stale: Option<bool>,
    process_names: Option<String>,
    timeout_secs: Option<u64>,
}

/// Configuration manager for the INI settings file.
///
/// The file carries three sections:
/// - `[Paths]`: BarTender executable, label folders, audit log location
/// - `[PrinterMapping]`: one `prefix = printer` entry per filename prefix
/// - `[Process]` (optional): stale-process termination settings
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a manager for the configuration file at `config_path`.
    ///
    /// The file is not read until [`load_settings`](Self::load_settings).
    pub fn new<P: AsRef<Utf8Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Load and validate the settings file.
    ///
    /// # Errors
    /// - [`ConfigError::NotFound`] if the file does not exist
    /// - [`ConfigError::Parse`] if the INI is malformed
    /// - [`ConfigError::MissingKey`] if `bartender_path` or the folder list is absent
    /// - [`ConfigError::Mapping`] if the mapping table is empty or has an empty prefix
    pub fn load_settings(&self) -> Result<AppSettings, ConfigError> {
        if !self.config_path.is_file() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let raw: RawConfig = Config::builder()
            .add_source(LiteralIniFile::new(&self.config_path))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|source| ConfigError::Parse {
                path: self.config_path.clone(),
                source,
            })?;

        let settings = Self::settings_from_raw(raw)?;

        tracing::info!(
            "Loaded config from {} - folders: {}, prefixes: {}",
            self.config_path,
            settings.paths.labels_folders.len(),
            settings.printer_mapping.len()
        );
        Ok(settings)
    }

    fn settings_from_raw(raw: RawConfig) -> Result<AppSettings, ConfigError> {
        let paths = raw.paths.ok_or(ConfigError::MissingKey {
            section: "Paths",
            key: "bartender_path",
        })?;

        let bartender_path = paths
            .bartender_path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingKey {
                section: "Paths",
                key: "bartender_path",
            })?;

        // The plural key wins; the singular form is accepted for older files
        let folders_value = paths
            .labels_folders
            .or(paths.labels_folder)
            .unwrap_or_default();
        let labels_folders: Vec<Utf8PathBuf> = split_list(&folders_value)
            .into_iter()
            .map(Utf8PathBuf::from)
            .collect();
        if labels_folders.is_empty() {
            return Err(ConfigError::MissingKey {
                section: "Paths",
                key: "labels_folders",
            });
        }

        let log_file_path = paths
            .log_file_path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILE_PATH.to_string());

        if raw.printer_mapping.is_empty() {
            return Err(MappingError::Empty.into());
        }
        let printer_mapping = PrinterMapping::new(raw.printer_mapping)?;

        let defaults = ProcessSettings::default();
        let process = ProcessSettings {
            terminate_stale: raw.process.terminate_stale.unwrap_or(defaults.terminate_stale),
            process_names: raw
                .process
                .process_names
                .map(|names| split_list(&names))
                .unwrap_or(defaults.process_names),
            timeout: raw
                .process
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        };

        Ok(AppSettings {
            paths: PathSettings {
                bartender_path: Utf8PathBuf::from(bartender_path),
                labels_folders,
                log_file_path: Utf8PathBuf::from(log_file_path),
            },
            printer_mapping,
            process,
        })
    }

    /// Write a template configuration file.
    ///
    /// Refuses to overwrite an existing file unless `force` is set. The parent
    /// directory is created if needed.
    pub fn write_template(&self, force: bool) -> Result<(), ConfigError> {
        if self.config_path.exists() && !force {
            return Err(ConfigError::AlreadyExists(self.config_path.clone()));
        }

        if let Some(parent) = self.config_path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                    path: self.config_path.clone(),
                    source,
                })?;
            }
        }

        fs::write(&self.config_path, default_template()).map_err(|source| ConfigError::Write {
            path: self.config_path.clone(),
            source,
        })?;

        tracing::info!("Wrote template config to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

/// Contents written by `init-config`.
pub fn default_template() -> String {
    let mut out = String::new();
    out.push_str("; btprinter configuration\n");
    out.push_str("; Values are read literally, quotes and backslashes included.\n");
    out.push('\n');
    out.push_str("[Paths]\n");
    out.push_str(&format!("log_file_path = {}\n", DEFAULT_LOG_FILE_PATH));
    out.push_str(
        r"labels_folders = T:\Prikazy\DataTPV\ManualLabelPrint_DfA\Etikety; T:\Prikazy\DataTPV\ManualLabelPrint\Etikety",
    );
    out.push('\n');
    out.push_str(r"bartender_path = C:\Program Files (x86)\Seagull\BarTender Suite\bartend.exe");
    out.push('\n');
    out.push('\n');
    out.push_str("; <filename prefix> = <printer name>\n");
    out.push_str("[PrinterMapping]\n");
    out.push_str("25x10_ = 420t\n");
    out.push_str("50x30_ = 50x30_430t\n");
    out.push('\n');
    out.push_str("[Process]\n");
    out.push_str("terminate_stale = true\n");
    out.push_str("process_names = cmdr.exe; bartend.exe\n");
    out.push_str("timeout_secs = 30\n");
    out
}
