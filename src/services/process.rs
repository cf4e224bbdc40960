//! Termination of leftover BarTender processes.
//!
//! A hung BarTender or Commander instance can hold label files open, so every
//! run force-terminates them by image name before opening its own session.
//! Termination is best-effort; failures are reported to the caller and never
//! stop the run.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

#[derive(Error, Debug)]
pub enum TerminateError {
    #[error("Failed to run taskkill for {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout after {timeout:?} while terminating {name}")]
    Timeout { name: String, timeout: Duration },
}

/// Outcome of terminating one process image name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateStatus {
    /// taskkill reported success
    Terminated,
    /// No running instance (taskkill exits with 128)
    NotRunning,
    /// taskkill exited with another code
    Failed(i32),
    /// Process termination is only performed on Windows
    Unsupported,
}

/// Build the `taskkill` arguments for an image name
pub fn taskkill_args(image_name: &str) -> Vec<String> {
    vec![
        "/F".to_string(),
        "/IM".to_string(),
        image_name.to_string(),
    ]
}

fn status_from_exit_code(code: i32) -> TerminateStatus {
    match code {
        0 => TerminateStatus::Terminated,
        128 => TerminateStatus::NotRunning,
        other => TerminateStatus::Failed(other),
    }
}

/// Force-terminate every running process with the given image name.
pub async fn terminate_process(
    image_name: &str,
    timeout_duration: Duration,
) -> Result<TerminateStatus, TerminateError> {
    if !cfg!(target_os = "windows") {
        tracing::debug!("Skipping termination of {} (not on Windows)", image_name);
        return Ok(TerminateStatus::Unsupported);
    }

    let mut cmd = Command::new("taskkill");
    cmd.args(taskkill_args(image_name))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(0x0800_0000);

    let child = cmd.spawn().map_err(|source| TerminateError::Spawn {
        name: image_name.to_string(),
        source,
    })?;

    let output = timeout(timeout_duration, child.wait_with_output())
        .await
        .map_err(|_| TerminateError::Timeout {
            name: image_name.to_string(),
            timeout: timeout_duration,
        })?
        .map_err(|source| TerminateError::Spawn {
            name: image_name.to_string(),
            source,
        })?;

    let status = status_from_exit_code(output.status.code().unwrap_or(-1));
    tracing::debug!("taskkill {} -> {:?}", image_name, status);
    Ok(status)
}

/// Terminate all `image_names` in order, collecting per-name results.
pub async fn terminate_stale_instances(
    image_names: &[String],
    timeout_duration: Duration,
) -> Vec<(String, Result<TerminateStatus, TerminateError>)> {
    let mut results = Vec::with_capacity(image_names.len());
    for name in image_names {
        let result = terminate_process(name, timeout_duration).await;
        results.push((name.clone(), result));
    }
    results
}
