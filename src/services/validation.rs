//! Environment checks that gate a run.
//!
//! A run may only start when the BarTender executable exists and every
//! configured label folder is present. Validation only reads the filesystem.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("BarTender is not installed (executable not found: {0})")]
    ApplicationNotInstalled(Utf8PathBuf),

    #[error("The following folders do not exist: {}", join_paths(.0))]
    FoldersMissing(Vec<Utf8PathBuf>),
}

fn join_paths(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check that `install_path` names an existing file and all `folders` exist.
///
/// The installation check runs first. When folders are missing, every missing
/// folder is reported, in configuration order.
pub fn validate(install_path: &Utf8Path, folders: &[Utf8PathBuf]) -> Result<(), ValidationError> {
    if !is_application_installed(install_path) {
        tracing::debug!("Executable not found at {}", install_path);
        return Err(ValidationError::ApplicationNotInstalled(
            install_path.to_path_buf(),
        ));
    }

    let missing = missing_folders(folders);
    if !missing.is_empty() {
        return Err(ValidationError::FoldersMissing(missing));
    }

    tracing::debug!("Environment valid: {} folder(s) present", folders.len());
    Ok(())
}

pub fn is_application_installed(install_path: &Utf8Path) -> bool {
    install_path.is_file()
}

/// Folders from `folders` that are not existing directories.
pub fn missing_folders(folders: &[Utf8PathBuf]) -> Vec<Utf8PathBuf> {
    folders.iter().filter(|f| !f.is_dir()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        fs::write(root.join("bartend.exe"), b"").unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_valid_environment() {
        let (_temp_dir, root) = setup();
        fs::create_dir(root.join("a")).unwrap();

        assert_eq!(validate(&root.join("bartend.exe"), &[root.join("a")]), Ok(()));
    }

    #[test]
    fn test_missing_executable() {
        let (_temp_dir, root) = setup();

        let err = validate(&root.join("missing.exe"), &[]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ApplicationNotInstalled(root.join("missing.exe"))
        );
    }

    #[test]
    fn test_directory_is_not_an_executable() {
        let (_temp_dir, root) = setup();
        assert!(!is_application_installed(&root));
    }

    #[test]
    fn test_all_missing_folders_reported() {
        let (_temp_dir, root) = setup();
        fs::create_dir(root.join("present")).unwrap();

        let folders = vec![root.join("gone1"), root.join("present"), root.join("gone2")];
        let err = validate(&root.join("bartend.exe"), &folders).unwrap_err();

        assert_eq!(
            err,
            ValidationError::FoldersMissing(vec![root.join("gone1"), root.join("gone2")])
        );
        let message = err.to_string();
        assert!(message.contains("gone1"));
        assert!(message.contains("gone2"));
        assert!(!message.contains("present"));
    }
}
