//! BarTender automation backend.
//!
//! BarTender is scripted through its `BarTender.Application` COM object. A
//! session is one PowerShell host process (`powershell.exe -Command -`) that
//! creates the COM object once and then receives one single-line statement per
//! operation on stdin. Every statement prints exactly one reply line on stdout:
//!
//! - `@@BT OK`: the operation succeeded
//! - `@@BT NULL`: `Formats.Open` returned no document
//! - `@@BT ERR <message>`: the COM call raised an exception
//!
//! Lines without the `@@BT` marker are ignored, so stray host output cannot be
//! mistaken for a reply.

use crate::services::automation::{
    Automation, AutomationError, FormatHandle, LabelSession, SaveOption,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use camino::Utf8Path;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Default PowerShell executable used to host the COM session
pub const DEFAULT_POWERSHELL: &str = "powershell.exe";

/// COM ProgID of the BarTender application
pub const BARTENDER_PROG_ID: &str = "BarTender.Application";

const REPLY_MARKER: &str = "@@BT";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Parsed reply line from the PowerShell host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Null,
    Err(String),
}

/// Parse one stdout line; `None` for lines that are not replies.
pub fn parse_reply(line: &str) -> Option<Reply> {
    let rest = line.trim().strip_prefix(REPLY_MARKER)?.trim_start();

    if rest == "OK" {
        Some(Reply::Ok)
    } else if rest == "NULL" {
        Some(Reply::Null)
    } else if let Some(message) = rest.strip_prefix("ERR") {
        Some(Reply::Err(message.trim().to_string()))
    } else {
        None
    }
}

/// Quote a string as a PowerShell string expression.
///
/// The host decodes stdin with the console code page, so only ASCII may cross
/// the pipe. ASCII values become single-quoted literals; anything else is sent
/// as base64 UTF-8 and decoded inside the host.
pub fn ps_quote(value: &str) -> String {
    if value.is_ascii() {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        format!(
            "([System.Text.Encoding]::UTF8.GetString([System.Convert]::FromBase64String('{}')))",
            BASE64.encode(value.as_bytes())
        )
    }
}

/// Wrap a statement so it always prints exactly one reply line.
fn wrap(body: &str) -> String {
    format!(
        "try {{ {body}; '{REPLY_MARKER} OK' }} catch {{ '{REPLY_MARKER} ERR ' + ($_.Exception.Message -replace '\\r?\\n', ' ') }}"
    )
}

fn format_var(handle: FormatHandle) -> String {
    format!("$btFormat{}", handle.0)
}

/// Statement that initializes the host and creates the COM object
pub fn startup_statement() -> String {
    format!(
        "$ErrorActionPreference = 'Stop'; [Console]::OutputEncoding = [System.Text.Encoding]::UTF8; {}",
        wrap(&format!(
            "$btApp = New-Object -ComObject {}",
            ps_quote(BARTENDER_PROG_ID)
        ))
    )
}

pub fn visible_statement(visible: bool) -> String {
    let value = if visible { "$true" } else { "$false" };
    wrap(&format!("$btApp.Visible = {}", value))
}

/// `Formats.Open(path, $false, '')`, replying `NULL` when nothing was opened
pub fn open_statement(handle: FormatHandle, path: &Utf8Path) -> String {
    let var = format_var(handle);
    format!(
        "try {{ {var} = $btApp.Formats.Open({}, $false, ''); if ($null -eq {var}) {{ '{REPLY_MARKER} NULL' }} else {{ '{REPLY_MARKER} OK' }} }} catch {{ '{REPLY_MARKER} ERR ' + ($_.Exception.Message -replace '\\r?\\n', ' ') }}",
        ps_quote(path.as_str())
    )
}

pub fn printer_statement(handle: FormatHandle, printer: &str) -> String {
    wrap(&format!("{}.Printer = {}", format_var(handle), ps_quote(printer)))
}

pub fn save_statement(handle: FormatHandle) -> String {
    wrap(&format!("{}.Save() | Out-Null", format_var(handle)))
}

pub fn close_statement(handle: FormatHandle, option: SaveOption) -> String {
    let var = format_var(handle);
    wrap(&format!("{var}.Close({}) | Out-Null; {var} = $null", option.code()))
}

pub fn quit_statement(option: SaveOption) -> String {
    wrap(&format!("$btApp.Quit({}) | Out-Null", option.code()))
}

/// Creates BarTender sessions hosted in PowerShell
#[derive(Debug, Clone)]
pub struct BarTenderAutomation {
    powershell: String,
}

impl BarTenderAutomation {
    pub fn new() -> Self {
        Self::with_powershell(DEFAULT_POWERSHELL)
    }

    /// Use a specific PowerShell executable (e.g. `pwsh.exe`)
    pub fn with_powershell(powershell: impl Into<String>) -> Self {
        Self {
            powershell: powershell.into(),
        }
    }
}

impl Default for BarTenderAutomation {
    fn default() -> Self {
        Self::new()
    }
}

impl Automation for BarTenderAutomation {
    fn dispatch(&self) -> Result<Box<dyn LabelSession>, AutomationError> {
        let session = PowerShellSession::spawn(&self.powershell)?;
        Ok(Box::new(session))
    }
}

/// A live BarTender COM session inside a PowerShell host
pub struct PowerShellSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    next_handle: u32,
    open_formats: HashSet<FormatHandle>,
}

impl PowerShellSession {
    fn spawn(powershell: &str) -> Result<Self, AutomationError> {
        let mut cmd = Command::new(powershell);
        cmd.args(["-NoLogo", "-NoProfile", "-NonInteractive", "-Command", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        tracing::debug!("Spawning automation host: {}", powershell);

        let mut child = cmd.spawn().map_err(|e| {
            AutomationError::SessionStart(format!("failed to spawn {}: {}", powershell, e))
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(AutomationError::SessionStart(
                "automation host pipes unavailable".to_string(),
            ));
        };

        let mut session = Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            next_handle: 1,
            open_formats: HashSet::new(),
        };

        match session.execute(&startup_statement()) {
            Ok(Reply::Ok) => {
                tracing::info!("Created {} COM object", BARTENDER_PROG_ID);
                Ok(session)
            }
            Ok(other) => {
                session.terminate();
                Err(AutomationError::SessionStart(format!(
                    "unexpected reply {:?}",
                    other
                )))
            }
            Err(AutomationError::Call(message)) => {
                session.terminate();
                Err(AutomationError::SessionStart(message))
            }
            Err(e) => {
                session.terminate();
                Err(AutomationError::SessionStart(e.to_string()))
            }
        }
    }

    /// Send one statement and wait for its reply.
    ///
    /// `ERR` replies are turned into [`AutomationError::Call`].
    fn execute(&mut self, statement: &str) -> Result<Reply, AutomationError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AutomationError::Disconnected("session already quit".to_string()))?;

        tracing::trace!("-> {}", statement);
        stdin
            .write_all(statement.as_bytes())
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush())
            .map_err(|e| AutomationError::Disconnected(e.to_string()))?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = self
                .stdout
                .read_until(b'\n', &mut buf)
                .map_err(|e| AutomationError::Disconnected(e.to_string()))?;
            if read == 0 {
                return Err(AutomationError::Disconnected(
                    "automation host exited".to_string(),
                ));
            }

            let line = String::from_utf8_lossy(&buf);
            match parse_reply(&line) {
                Some(Reply::Err(message)) => return Err(AutomationError::Call(message)),
                Some(reply) => return Ok(reply),
                None => tracing::trace!("<- (ignored) {}", line.trim_end()),
            }
        }
    }

    fn expect_ok(&mut self, statement: &str) -> Result<(), AutomationError> {
        match self.execute(statement)? {
            Reply::Ok => Ok(()),
            other => Err(AutomationError::Call(format!(
                "unexpected reply {:?}",
                other
            ))),
        }
    }

    fn check_handle(&self, format: FormatHandle) -> Result<(), AutomationError> {
        if self.open_formats.contains(&format) {
            Ok(())
        } else {
            Err(AutomationError::UnknownHandle(format))
        }
    }

    /// Close stdin and reap the host process
    fn terminate(&mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.write_all(b"exit\n");
            let _ = stdin.flush();
        }

        match self.child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                if let Err(e) = self.child.wait() {
                    tracing::warn!("Failed to wait for automation host: {}", e);
                }
            }
        }
    }
}

impl LabelSession for PowerShellSession {
    fn set_visible(&mut self, visible: bool) -> Result<(), AutomationError> {
        self.expect_ok(&visible_statement(visible))
    }

    fn open(&mut self, path: &Utf8Path) -> Result<Option<FormatHandle>, AutomationError> {
        let handle = FormatHandle(self.next_handle);
        self.next_handle += 1;

        match self.execute(&open_statement(handle, path))? {
            Reply::Ok => {
                self.open_formats.insert(handle);
                Ok(Some(handle))
            }
            Reply::Null => Ok(None),
            Reply::Err(message) => Err(AutomationError::Call(message)),
        }
    }

    fn set_printer(&mut self, format: FormatHandle, printer: &str) -> Result<(), AutomationError> {
        self.check_handle(format)?;
        self.expect_ok(&printer_statement(format, printer))
    }

    fn save(&mut self, format: FormatHandle) -> Result<(), AutomationError> {
        self.check_handle(format)?;
        self.expect_ok(&save_statement(format))
    }

    fn close(&mut self, format: FormatHandle, option: SaveOption) -> Result<(), AutomationError> {
        self.check_handle(format)?;
        // The handle is gone either way; a failed close is not retried through it
        self.open_formats.remove(&format);
        self.expect_ok(&close_statement(format, option))
    }

    fn quit(&mut self, option: SaveOption) -> Result<(), AutomationError> {
        let result = self.expect_ok(&quit_statement(option));
        self.terminate();
        tracing::info!("Automation session closed");
        result
    }
}

impl Drop for PowerShellSession {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            tracing::warn!("Automation host still running on drop, killing it");
            self.stdin = None;
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse_reply("@@BT OK\r\n"), Some(Reply::Ok));
        assert_eq!(parse_reply("@@BT NULL"), Some(Reply::Null));
        assert_eq!(
            parse_reply("@@BT ERR The file is read-only."),
            Some(Reply::Err("The file is read-only.".to_string()))
        );
        assert_eq!(parse_reply("PS C:\\> "), None);
        assert_eq!(parse_reply("@@BT SOMETHING"), None);
    }

    #[test]
    fn test_ps_quote_escapes_single_quotes() {
        assert_eq!(ps_quote("420t"), "'420t'");
        assert_eq!(ps_quote("O'Brien's printer"), "'O''Brien''s printer'");
    }

    #[test]
    fn test_ps_quote_non_ascii_is_base64() {
        // "Štítky" in UTF-8
        assert_eq!(
            ps_quote("Štítky"),
            "([System.Text.Encoding]::UTF8.GetString([System.Convert]::FromBase64String('xaB0w610a3k=')))"
        );
    }

    #[test]
    fn test_statements_are_ascii_for_non_ascii_names() {
        let open = open_statement(FormatHandle(1), Utf8Path::new("T:/Štítky/50x30_č.btw"));
        assert!(open.is_ascii());
        assert!(open.contains("$btApp.Formats.Open(([System.Text.Encoding]::UTF8.GetString("));

        let printer = printer_statement(FormatHandle(1), "Tiskárna přízemí");
        assert!(printer.is_ascii());
        assert!(printer.contains("$btFormat1.Printer = ([System.Text.Encoding]::UTF8"));

        let encoded = BASE64.encode("Tiskárna přízemí".as_bytes());
        assert!(printer.contains(&encoded));
        assert_eq!(
            BASE64.decode(encoded).unwrap(),
            "Tiskárna přízemí".as_bytes()
        );
    }

    #[test]
    fn test_open_statement() {
        let stmt = open_statement(FormatHandle(3), Utf8Path::new("T:/Labels/50x30_a.btw"));
        assert!(stmt.contains("$btFormat3 = $btApp.Formats.Open('T:/Labels/50x30_a.btw', $false, '')"));
        assert!(stmt.contains("'@@BT NULL'"));
        assert!(stmt.contains("'@@BT OK'"));
        assert!(stmt.contains("catch"));
        assert!(!stmt.contains('\n'));
    }

    #[test]
    fn test_printer_and_close_statements() {
        let stmt = printer_statement(FormatHandle(2), "Microsoft Print to PDF");
        assert!(stmt.contains("$btFormat2.Printer = 'Microsoft Print to PDF'"));

        let stmt = close_statement(FormatHandle(2), SaveOption::DoNotSaveChanges);
        assert!(stmt.contains("$btFormat2.Close(1)"));
        assert!(stmt.contains("$btFormat2 = $null"));

        let stmt = quit_statement(SaveOption::DoNotSaveChanges);
        assert!(stmt.contains("$btApp.Quit(1)"));
    }

    #[test]
    fn test_startup_statement_creates_com_object() {
        let stmt = startup_statement();
        assert!(stmt.contains("New-Object -ComObject 'BarTender.Application'"));
        assert!(stmt.contains("$ErrorActionPreference = 'Stop'"));
        assert!(!stmt.contains('\n'));
    }

    #[test]
    fn test_dispatch_fails_without_host() {
        let automation = BarTenderAutomation::with_powershell("definitely-not-a-real-shell-binary");
        let err = automation.dispatch().err().unwrap();
        assert!(matches!(err, AutomationError::SessionStart(_)));
    }
}
