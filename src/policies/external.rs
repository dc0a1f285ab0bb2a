//! External-tool handlers
//!
//! PostToolUse handlers that shell out after a file was written:
//! - `AutoFormatHook` runs a formatter and never says anything
//! - `DiagnosticsHook` runs a checker and annotates its complaints
//!
//! Every process runs under a hard timeout and is killed when it expires or
//! the run is cancelled. Failures never turn into denials.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::core::{paths, GuardError, GuardResult};
use crate::hooks::{CallEvent, Handler, Phase, Verdict};

/// Default wall-clock limit for external tools (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Maximum report length handed back to the agent, in characters
const MAX_REPORT_LENGTH: usize = 4_000;
/// Placeholder replaced by the edited file's path in command arguments
pub const FILE_PLACEHOLDER: &str = "{file}";
/// Extensions Prettier formats
pub const PRETTIER_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".json", ".md"];

/// How an external run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Process exited
    Finished {
        /// Exit code (-1 when killed by a signal)
        exit_code: i32,
        /// Combined stdout and stderr
        output: String,
    },
    /// Wall-clock limit hit; the process was killed
    TimedOut,
    /// Agent run cancelled; the process was killed
    Cancelled,
}

/// A program invocation bound to a working directory and a timeout
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Arguments; occurrences of `{file}` are replaced with the edited path
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Run against `file`
    ///
    /// Returns `Err` only when the process could not be started.
    pub async fn run(&self, file: &Path, cancel: &CancellationToken) -> GuardResult<RunOutcome> {
        let file = file.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(FILE_PLACEHOLDER, &file))
            .collect();

        tracing::debug!(
            "[External] Running {} {:?} in {}",
            self.program.display(),
            args,
            self.working_dir.display()
        );

        let output_future = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        tokio::select! {
            _ = cancel.cancelled() => Ok(RunOutcome::Cancelled),
            result = timeout(self.timeout, output_future) => match result {
                Ok(output) => {
                    let output = output?;
                    Ok(RunOutcome::Finished {
                        exit_code: output.status.code().unwrap_or(-1),
                        output: combine_output(&output.stdout, &output.stderr),
                    })
                }
                Err(_) => Ok(RunOutcome::TimedOut),
            },
        }
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);

    let mut result = String::new();
    if !stdout.trim().is_empty() {
        result.push_str(stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str("STDERR:\n");
        result.push_str(stderr.trim_end());
    }
    result
}

fn truncate_report(mut report: String) -> String {
    if let Some((cut, _)) = report.char_indices().nth(MAX_REPORT_LENGTH) {
        report.truncate(cut);
        report.push_str("\n... (output truncated)");
    }
    report
}

/// Path of a Post Write/Edit event, resolved against `base`
fn written_file(event: &CallEvent, base: &Path) -> Option<PathBuf> {
    if event.is_cancelled() || event.phase() != Phase::Post || !event.call().is_file_write() {
        return None;
    }
    event.file_path().map(|path| paths::resolve(base, path))
}

/// Formats files after Write/Edit; formatting is invisible to the agent
#[derive(Debug, Clone)]
pub struct AutoFormatHook {
    command: ExternalCommand,
    extensions: HashSet<String>,
}

impl AutoFormatHook {
    pub fn new<I, S>(command: ExternalCommand, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            command,
            extensions: extensions
                .into_iter()
                .map(|ext| paths::normalize_extension(ext.as_ref()))
                .collect(),
        }
    }

    /// Project-local Prettier, or `None` when it is not installed
    pub fn prettier(working_dir: impl AsRef<Path>) -> Option<Self> {
        let working_dir = working_dir.as_ref();
        let binary = working_dir.join("node_modules").join(".bin").join("prettier");
        if !binary.is_file() {
            tracing::debug!("[AutoFormat] Prettier not found at {}", binary.display());
            return None;
        }

        let command = ExternalCommand::new(binary, working_dir).with_args(["--write", FILE_PLACEHOLDER]);
        Some(Self::new(command, PRETTIER_EXTENSIONS.iter().copied()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.command = self.command.with_timeout(timeout);
        self
    }
}

#[async_trait]
impl Handler for AutoFormatHook {
    fn name(&self) -> &str {
        "auto-format"
    }

    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict> {
        let Some(file) = written_file(event, self.command.working_dir()) else {
            return Ok(Verdict::Continue);
        };

        match paths::extension(&file) {
            Some(ext) if self.extensions.contains(&ext) => {}
            _ => return Ok(Verdict::Continue),
        }

        if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
            return Ok(Verdict::Continue);
        }

        match self.command.run(&file, event.cancellation()).await {
            Ok(RunOutcome::Finished { exit_code: 0, .. }) => {
                tracing::debug!("[AutoFormat] Formatted {}", file.display())
            }
            Ok(outcome) => {
                tracing::debug!("[AutoFormat] Skipped {}: {:?}", file.display(), outcome)
            }
            Err(err) => tracing::debug!("[AutoFormat] Formatter failed to start: {}", err),
        }

        Ok(Verdict::Continue)
    }
}

/// Runs a checker after Write/Edit and annotates any problems it reports
#[derive(Debug, Clone)]
pub struct DiagnosticsHook {
    label: String,
    command: ExternalCommand,
}

impl DiagnosticsHook {
    pub fn new(label: impl Into<String>, command: ExternalCommand) -> Self {
        Self {
            label: label.into(),
            command,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl Handler for DiagnosticsHook {
    fn name(&self) -> &str {
        &self.label
    }

    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict> {
        let Some(file) = written_file(event, self.command.working_dir()) else {
            return Ok(Verdict::Continue);
        };

        let outcome = self
            .command
            .run(&file, event.cancellation())
            .await
            .map_err(|err| GuardError::handler_fault(&self.label, err.to_string()))?;

        match outcome {
            RunOutcome::Finished { exit_code: 0, .. } => Ok(Verdict::Continue),
            RunOutcome::Finished { exit_code, output } => {
                tracing::info!(
                    "[Diagnostics] {} exited with {} for {}",
                    self.label,
                    exit_code,
                    file.display()
                );
                let report = if output.is_empty() {
                    format!("(exit code {})", exit_code)
                } else {
                    truncate_report(output)
                };
                Ok(Verdict::annotate(format!(
                    "{} reported problems after editing {}:\n{}",
                    self.label,
                    file.display(),
                    report
                )))
            }
            RunOutcome::TimedOut => {
                tracing::warn!("[Diagnostics] {} timed out on {}", self.label, file.display());
                Ok(Verdict::Continue)
            }
            RunOutcome::Cancelled => Ok(Verdict::Continue),
        }
    }
}
