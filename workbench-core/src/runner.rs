// workbench-core/src/runner.rs

//! Runs external programs and captures what they print.
//!
//! A program that starts and exits, with any code, produces a
//! [`CommandOutput`]. Only a program that cannot be started (or that overruns
//! the configured timeout) produces an error.

use crate::errors::{Result, WorkbenchError};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Represents the structured output of an executed external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit status code of the command, `-1` if it was killed by a signal.
    pub status: i32,
    /// The captured standard output.
    pub stdout: String,
    /// The captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(status: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Checks if the command executed successfully (status code 0).
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Both streams, stdout first, for signature matching.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Something that can run a program to completion.
///
/// Every subprocess in the crate goes through this trait so the git, npm and
/// patch layers can be driven by a scripted runner in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], working_dir: &Path)
        -> Result<CommandOutput>;
}

/// Ceilings applied by [`ProcessRunner`]. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerLimits {
    /// Wall-clock limit per subprocess; the child is killed when it elapses.
    pub timeout: Option<Duration>,
    /// Per-stream byte ceiling; only the last `max_output_bytes` bytes are kept.
    pub max_output_bytes: Option<usize>,
}

/// Runs real processes with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    limits: RunnerLimits,
}

impl ProcessRunner {
    pub fn new(limits: RunnerLimits) -> Self {
        Self { limits }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<CommandOutput> {
        let full_command_log = redact_credentials(&format!("{} {}", program, args.join(" ")));
        info!(
            "Executing command: {} in {:?}",
            full_command_log.trim_end(),
            working_dir
        );

        let mut child = Command::new(program)
            .current_dir(working_dir)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                warn!(program, error = %source, "Failed to spawn command process");
                WorkbenchError::Launch {
                    program: program.to_string(),
                    source,
                }
            })?;

        let (stdout_pipe, stderr_pipe) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                return Err(WorkbenchError::Launch {
                    program: program.to_string(),
                    source: std::io::Error::other("child output pipes were not captured"),
                })
            }
        };

        let cap = self.limits.max_output_bytes;
        let capture = async {
            tokio::try_join!(
                read_capped(stdout_pipe, cap),
                read_capped(stderr_pipe, cap),
                child.wait()
            )
        };

        let captured = match self.limits.timeout {
            Some(limit) => match tokio::time::timeout(limit, capture).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        command = %full_command_log,
                        timeout_secs = limit.as_secs(),
                        "Command timed out; killing it"
                    );
                    if let Err(e) = child.kill().await {
                        debug!(error = %e, "Kill after timeout failed; process may have exited");
                    }
                    return Err(WorkbenchError::Timeout {
                        program: program.to_string(),
                        timeout: limit,
                    });
                }
            },
            None => capture.await,
        };
        let (stdout, stderr, exit) =
            captured.map_err(|source| WorkbenchError::io(working_dir, source))?;

        for (stream, dropped) in [("stdout", stdout.dropped), ("stderr", stderr.dropped)] {
            if dropped > 0 {
                warn!(command = %full_command_log, stream, dropped, "Output exceeded byte cap; kept the tail");
            }
        }

        let status = exit.code().unwrap_or(-1);
        debug!(
            "{} exit status: {}\nStdout preview (first 3 lines):\n{}\nStderr preview (first 3 lines):\n{}",
            full_command_log.trim_end(),
            status,
            stdout.text.lines().take(3).collect::<Vec<_>>().join("\n"),
            stderr.text.lines().take(3).collect::<Vec<_>>().join("\n")
        );

        Ok(CommandOutput {
            status,
            stdout: stdout.text,
            stderr: stderr.text,
        })
    }
}

/// Rejects caller-supplied values that a program would parse as an option.
pub(crate) fn reject_option_like(what: &str, value: &str) -> Result<()> {
    if value.trim_start().starts_with('-') {
        warn!(what, value = %value, "Rejected option-like argument");
        return Err(WorkbenchError::invalid_argument(format!(
            "{} must not start with '-': '{}'",
            what, value
        )));
    }
    Ok(())
}

lazy_static! {
    static ref URL_USERINFO: Regex = Regex::new(r"://[^/@\s]+@").expect("valid userinfo pattern");
}

/// Masks `user[:password]@` in URLs so tokens never reach the logs.
pub fn redact_credentials(text: &str) -> String {
    URL_USERINFO.replace_all(text, "://***@").into_owned()
}

struct Captured {
    text: String,
    dropped: usize,
}

// Drains the whole pipe so the child never blocks on a full buffer, keeping at
// most `cap` trailing bytes.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: Option<usize>) -> std::io::Result<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut dropped = 0usize;

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(cap) = cap {
            if buf.len() > cap.saturating_mul(2) {
                let excess = buf.len() - cap;
                buf.drain(..excess);
                dropped += excess;
            }
        }
    }
    if let Some(cap) = cap {
        if buf.len() > cap {
            let excess = buf.len() - cap;
            buf.drain(..excess);
            dropped += excess;
        }
    }

    let text = String::from_utf8_lossy(&buf).into_owned();
    let text = if dropped > 0 {
        format!("[... {} bytes of output dropped ...]\n{}", dropped, text)
    } else {
        text
    };
    Ok(Captured { text, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn test_working_dir() -> PathBuf {
        tempdir().map(|d| d.into_path()).unwrap_or_default()
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_run_echo_captures_stdout() {
        let runner = ProcessRunner::default();
        let output = runner
            .run("sh", &sh("echo Hello Workbench"), &test_working_dir())
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "Hello Workbench");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let runner = ProcessRunner::default();
        let output = runner
            .run("sh", &sh("echo oops >&2; exit 3"), &test_working_dir())
            .await
            .unwrap();
        assert_eq!(output.status, 3);
        assert!(!output.success());
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let runner = ProcessRunner::default();
        let result = runner
            .run("this_command_does_not_exist_qwertyuiop", &[], &test_working_dir())
            .await;
        match result {
            Err(WorkbenchError::Launch { program, .. }) => {
                assert_eq!(program, "this_command_does_not_exist_qwertyuiop")
            }
            other => panic!("expected launch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let runner = ProcessRunner::new(RunnerLimits {
            timeout: Some(Duration::from_millis(200)),
            max_output_bytes: None,
        });
        let result = runner.run("sh", &sh("sleep 5"), &test_working_dir()).await;
        assert!(matches!(result, Err(WorkbenchError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_byte_cap_keeps_tail() {
        let runner = ProcessRunner::new(RunnerLimits {
            timeout: None,
            max_output_bytes: Some(10),
        });
        let output = runner
            .run("sh", &sh("printf aaaaaaaaaabbbbbbbbbb"), &test_working_dir())
            .await
            .unwrap();
        assert!(output.success());
        assert!(output.stdout.starts_with("[... 10 bytes of output dropped ...]"));
        assert!(output.stdout.ends_with("\nbbbbbbbbbb"));
    }

    #[tokio::test]
    async fn test_large_output_under_cap_is_untouched() {
        let runner = ProcessRunner::new(RunnerLimits {
            timeout: None,
            max_output_bytes: Some(1_000_000),
        });
        let output = runner
            .run("sh", &sh("seq 1 20000"), &test_working_dir())
            .await
            .unwrap();
        assert_eq!(output.stdout.lines().count(), 20000);
        assert!(output.stdout.starts_with("1\n"));
    }

    #[test]
    fn test_redact_credentials() {
        assert_eq!(
            redact_credentials("git remote set-url origin https://ghp_secret@github.com/o/r.git"),
            "git remote set-url origin https://***@github.com/o/r.git"
        );
        assert_eq!(redact_credentials("git status"), "git status");
    }

    #[test]
    fn test_combined_contains_both_streams() {
        let output = CommandOutput::new(1, "out", "err");
        let combined = output.combined();
        assert!(combined.contains("out") && combined.contains("err"));
    }
}
