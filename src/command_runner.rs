//! External command execution with timeout and guaranteed process kill.

use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::io::AsyncReadExt;

/// Default timeout for status queries (`docker compose ps`).
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for stack operations (`up`/`down` may pull images).
pub const STACK_TIMEOUT: Duration = Duration::from_secs(600);

/// A command exited non-zero where success was required.
///
/// Tolerated failures never become this error: callers that can continue
/// inspect the [`Output`] themselves and simply do not call
/// [`require_success`].
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("`{command}` exited with status {code}\n{stderr}")]
    Failed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },
}

/// Convert a non-zero exit into a typed [`CommandError`], returning trimmed
/// stdout on success.
///
/// # Errors
///
/// Returns [`CommandError::Failed`] carrying both captured streams when the
/// command exited non-zero.
pub fn require_success(command: &str, output: &Output) -> Result<String, CommandError> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(CommandError::Failed {
            command: command.to_string(),
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a command to completion in `cwd`, capturing both output streams.
    ///
    /// A non-zero exit is not an error here — the caller decides whether
    /// success was required.
    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<Output>;

    /// Run a command in `cwd` with inherited stdio and return its exit
    /// status. Used for human-facing listings that should print directly.
    async fn run_status(&self, program: &str, args: &[&str], cwd: &Path) -> Result<ExitStatus>;
}

/// Production `CommandRunner` — uses tokio for async process execution
/// with guaranteed timeout and kill on all platforms.
///
/// On Windows, `tokio::time::timeout` around `.output().await` does NOT kill
/// the child process when the timeout fires — the future is dropped but the
/// OS process keeps running. This implementation uses `tokio::select!` with
/// explicit `child.kill()` to guarantee the process is terminated.
pub struct TokioCommandRunner {
    timeout: Duration,
    trace: bool,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            trace: false,
        }
    }

    /// Enable (or disable) a `$ program args…` trace line on stderr before
    /// each invocation.
    #[must_use]
    pub fn traced(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    fn trace_line(&self, program: &str, args: &[&str]) {
        if self.trace {
            eprintln!("$ {program} {}", args.join(" "));
        }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<Output> {
        self.trace_line(program, args);

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        // Read stdout/stderr CONCURRENTLY with wait() to avoid pipe deadlock.
        // If the child writes more than the OS pipe buffer (64KB Linux, 4KB
        // some Windows configs), it blocks on write. If we only call
        // child.wait() first, wait() never resolves → deadlock.
        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", self.timeout.as_secs())
            }
        }
    }

    async fn run_status(&self, program: &str, args: &[&str], cwd: &Path) -> Result<ExitStatus> {
        self.trace_line(program, args);

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        child
            .wait()
            .await
            .with_context(|| format!("waiting for {program}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    fn output(raw_status: i32, stdout: &[u8], stderr: &[u8]) -> Output {
        Output {
            status: ExitStatus::from_raw(raw_status),
            stdout: stdout.to_vec(),
            stderr: stderr.to_vec(),
        }
    }

    #[test]
    fn require_success_returns_trimmed_stdout() {
        let out = output(0, b"  hello\n", b"");
        let text = require_success("docker compose ps", &out).expect("success");
        assert_eq!(text, "hello");
    }

    #[test]
    fn require_success_surfaces_typed_failure() {
        let out = output(1 << 8, b"partial", b"boom\n");
        let err = require_success("docker compose up", &out).expect_err("expected Err");
        let CommandError::Failed {
            command,
            code,
            stdout,
            stderr,
        } = err;
        assert_eq!(command, "docker compose up");
        assert_eq!(code, 1);
        assert_eq!(stdout, "partial");
        assert_eq!(stderr, "boom");
    }

    #[tokio::test]
    async fn run_captures_output_in_cwd() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = TokioCommandRunner::new(Duration::from_secs(5));
        let out = runner
            .run("pwd", &[], dir.path())
            .await
            .expect("run pwd");
        assert!(out.status.success());
        let printed = String::from_utf8_lossy(&out.stdout);
        let canonical = dir.path().canonicalize().expect("canonicalize");
        assert_eq!(printed.trim(), canonical.to_string_lossy());
    }

    #[tokio::test]
    async fn run_kills_child_on_timeout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = TokioCommandRunner::new(Duration::from_millis(100));
        let err = runner
            .run("sleep", &["30"], dir.path())
            .await
            .expect_err("expected timeout");
        assert!(err.to_string().contains("timed out"));
    }
}
