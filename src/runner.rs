//! Runs a built command line as a child process.
//!
//! stdout and stderr are captured separately and in full; the reported output
//! is stdout followed by stderr (newline separated when both are present), with
//! trailing line breaks removed. A run never returns an error: spawn failures,
//! timeouts and non-zero exits all come back as an unsuccessful [`RunOutcome`].

use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command_builder::CommandLine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub success: bool,
    /// `None` when the process never started or was killed by a signal.
    pub exit_code: Option<i32>,
    pub output: String,
}

impl RunOutcome {
    /// A run that produced no exit status, with `message` as its output.
    pub fn failed(message: String) -> Self {
        Self {
            success: false,
            exit_code: None,
            output: message,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn run_command_line(&self, command_line: &CommandLine) -> RunOutcome {
        self.run(&command_line.argv, &command_line.working_directory)
            .await
    }

    pub async fn run(&self, argv: &[String], working_directory: &Path) -> RunOutcome {
        let Some((program, args)) = argv.split_first() else {
            return RunOutcome::failed("cannot run an empty command line".to_string());
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %program, cwd = %working_directory.display(), error = %e, "failed to start process");
                return RunOutcome::failed(format!(
                    "failed to start '{}' in '{}': {}",
                    program,
                    working_directory.display(),
                    e
                ));
            }
        };
        debug!(program = %program, pid = ?child.id(), "process started");

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    // Dropping the wait future drops the child, which kills it.
                    warn!(program = %program, timeout_secs = limit.as_secs_f64(), "process timed out");
                    return RunOutcome::failed(format!(
                        "'{}' timed out after {:.1}s and was killed",
                        program,
                        limit.as_secs_f64()
                    ));
                }
            },
            None => child.wait_with_output().await,
        };

        let output = match waited {
            Ok(output) => output,
            Err(e) => {
                return RunOutcome::failed(format!("failed to collect output of '{}': {}", program, e))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code();
        debug!(program = %program, exit_code = ?exit_code, stdout_bytes = output.stdout.len(), stderr_bytes = output.stderr.len(), "process finished");

        RunOutcome {
            success: output.status.success(),
            exit_code,
            output: combine_streams(&stdout, &stderr),
        }
    }
}

/// stdout then stderr, without trailing line breaks.
pub fn combine_streams(stdout: &str, stderr: &str) -> String {
    let stdout = stdout.trim_end_matches(['\r', '\n']);
    let stderr = stderr.trim_end_matches(['\r', '\n']);
    match (stdout.is_empty(), stderr.is_empty()) {
        (_, true) => stdout.to_string(),
        (true, false) => stderr.to_string(),
        (false, false) => format!("{}\n{}", stdout, stderr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_newlines_are_removed() {
        assert_eq!(combine_streams("ok\n", ""), "ok");
        assert_eq!(combine_streams("ok\r\n\r\n", ""), "ok");
        assert_eq!(combine_streams("  ok  \n", ""), "  ok  ");
    }

    #[test]
    fn stderr_follows_stdout() {
        assert_eq!(combine_streams("out\n", "err\n"), "out\nerr");
        assert_eq!(combine_streams("", "err\n"), "err");
        assert_eq!(combine_streams("", ""), "");
    }
}
