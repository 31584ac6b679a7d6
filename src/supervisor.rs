//! Foreground app-server supervision.
//!
//! The supervisor owns the single child handle; at most one live handle
//! exists at any time. Shutdown is graceful-then-forceful: SIGTERM, a
//! bounded grace wait, then a hard kill.

use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Child;

use crate::context::APP_ROOT_ENV;

/// Grace window between SIGTERM and a hard kill.
pub const STOP_GRACE: Duration = Duration::from_secs(10);

/// Supervises the single foreground app-server process.
pub struct ProcessSupervisor {
    child: Option<Child>,
    grace: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor {
    #[must_use]
    pub fn new() -> Self {
        Self::with_grace(STOP_GRACE)
    }

    /// Create a supervisor with a custom grace window (tests use a short one).
    #[must_use]
    pub fn with_grace(grace: Duration) -> Self {
        Self { child: None, grace }
    }

    /// Whether a child handle is currently live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.child.is_some()
    }

    /// Spawn `command` with `root` as working directory, inheriting the
    /// current environment plus [`APP_ROOT_ENV`] pointing at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if a supervised process is already live, if the
    /// command is empty, or if the process fails to spawn.
    pub fn spawn(&mut self, command: &[String], root: &Path) -> Result<()> {
        if self.child.is_some() {
            anyhow::bail!("a supervised process is already running");
        }
        let Some((program, args)) = command.split_first() else {
            anyhow::bail!("empty supervised command");
        };

        let child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(root)
            .env(APP_ROOT_ENV, root)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        self.child = Some(child);
        Ok(())
    }

    /// Block until the supervised process exits naturally.
    ///
    /// The handle stays live afterwards; callers follow up with
    /// [`Self::request_stop`] on every exit path, which clears it.
    ///
    /// # Errors
    ///
    /// Returns an error if no process is live or waiting fails.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        match self.child.as_mut() {
            Some(child) => child.wait().await.context("waiting for supervised process"),
            None => anyhow::bail!("no supervised process to wait on"),
        }
    }

    /// Graceful-then-forceful termination.
    ///
    /// No-op when no handle is live. Otherwise sends SIGTERM, waits up to
    /// the grace window for natural exit, then kills. The handle is cleared
    /// unconditionally, so double invocation is safe.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried or the hard
    /// kill fails.
    pub async fn request_stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if child
            .try_wait()
            .context("checking supervised process")?
            .is_some()
        {
            // Already exited naturally; nothing to terminate.
            return Ok(());
        }

        terminate(&child);
        if tokio::time::timeout(self.grace, child.wait()).await.is_err() {
            child.kill().await.context("killing supervised process")?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn terminate(child: &Child) {
    if let Some(pid) = child.id() {
        if let Ok(pid) = i32::try_from(pid) {
            // SAFETY: signals a child we spawned and still own; no memory
            // is accessed.
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

#[cfg(not(unix))]
fn terminate(_child: &Child) {
    // No graceful-termination signal on this platform; request_stop falls
    // through to the hard kill after the grace window.
}
