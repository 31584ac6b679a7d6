//! Top-level lifecycle operations over the compose stack and the app server.
//!
//! Four operations are reachable: start-all (foreground), stop-all,
//! restart-all, and status. Dependencies are only torn down by an explicit
//! stop or restart — a foreground run leaves them running when it exits.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use crate::command_runner::require_success;
use crate::compose::ComposeBackend;
use crate::context::DeploymentContext;
use crate::output::OutputContext;
use crate::readiness::{self, PollSettings, Readiness};
use crate::supervisor::ProcessSupervisor;

/// Pause between stop-all and start-all during a restart.
pub const RESTART_DELAY: Duration = Duration::from_secs(2);

/// Composes the dependency controller, readiness poller, and process
/// supervisor into the four top-level operations.
pub struct Orchestrator<C: ComposeBackend> {
    ctx: DeploymentContext,
    compose: C,
    supervisor: ProcessSupervisor,
    poll: PollSettings,
}

impl<C: ComposeBackend> Orchestrator<C> {
    pub fn new(ctx: DeploymentContext, compose: C) -> Self {
        Self::with_settings(ctx, compose, ProcessSupervisor::new(), PollSettings::default())
    }

    /// Construct with explicit supervisor and poll settings (tests shrink
    /// the timings).
    pub fn with_settings(
        ctx: DeploymentContext,
        compose: C,
        supervisor: ProcessSupervisor,
        poll: PollSettings,
    ) -> Self {
        Self {
            ctx,
            compose,
            supervisor,
            poll,
        }
    }

    /// Borrow the compose backend. Tests use this to inspect recorded calls.
    pub fn compose_ref(&self) -> &C {
        &self.compose
    }

    /// Start dependencies, wait for readiness (best effort), then run the
    /// app server in the foreground until it exits or a shutdown signal
    /// arrives. `request_stop` runs on every exit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the dependency start fails or supervision fails.
    /// A readiness timeout is not an error, and neither is a signal-driven
    /// stop.
    pub async fn start_all(&mut self, out: &OutputContext) -> Result<()> {
        self.start_all_until(out, shutdown_signal()).await
    }

    /// [`Self::start_all`] with an explicit shutdown trigger. Tests drive
    /// the interrupt arms with a timed future instead of a real signal.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::start_all`].
    pub async fn start_all_until<F>(&mut self, out: &OutputContext, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        out.header("ragup — local deployment");
        out.kv("Root", &self.ctx.root.display().to_string());
        out.kv("App port", &self.ctx.app_port.to_string());
        out.kv("Dependencies", &self.ctx.dependencies.join(", "));

        out.info("starting dependencies...");
        let output = self.compose.up_detached(&self.ctx.dependencies).await?;
        require_success("docker compose up", &output)?;

        tokio::pin!(shutdown);

        let ready = tokio::select! {
            r = readiness::wait_ready(&self.compose, &self.ctx, &self.poll, out) => Some(r),
            () = &mut shutdown => None,
        };
        let Some(ready) = ready else {
            out.info("interrupted before launch; dependencies left running.");
            return Ok(());
        };
        if ready == Readiness::TimedOut {
            out.warn("dependencies did not report healthy in time; launching anyway.");
        }

        out.info(&format!(
            "starting app server on port {}...",
            self.ctx.app_port
        ));
        out.info("press Ctrl+C to stop");
        self.supervisor.spawn(&self.ctx.app_command, &self.ctx.root)?;

        let exit = tokio::select! {
            status = self.supervisor.wait() => Some(status),
            () = &mut shutdown => None,
        };
        // Cleanup runs before any error propagates; the child is never
        // left orphaned.
        let stopped = self.supervisor.request_stop().await;

        match exit {
            Some(Ok(status)) => out.info(&format!("app server exited ({status})")),
            Some(Err(e)) => {
                stopped?;
                return Err(e);
            }
            None => {
                out.info("shutdown signal received; stopping app server...");
                out.success("app server stopped. dependencies left running.");
            }
        }
        stopped?;
        Ok(())
    }

    /// Stop the app server (no-op here — nothing survives across
    /// invocations) and tear the dependency stack down. Teardown failures
    /// are logged, never propagated: stopping must work against any actual
    /// state of the stack.
    ///
    /// # Errors
    ///
    /// Returns an error only if clearing the supervised process fails.
    pub async fn stop_all(&mut self, out: &OutputContext) -> Result<()> {
        self.supervisor.request_stop().await?;

        out.info("stopping dependencies...");
        match self.compose.down().await {
            Ok(output) if output.status.success() => out.success("all services stopped."),
            Ok(output) => out.warn(&format!(
                "docker compose down exited with {}; continuing.",
                output.status
            )),
            Err(e) => out.warn(&format!("could not stop dependencies: {e:#}")),
        }
        Ok(())
    }

    /// Stop everything, pause briefly, then start everything again.
    ///
    /// # Errors
    ///
    /// Returns an error if the subsequent start fails.
    pub async fn restart_all(&mut self, out: &OutputContext) -> Result<()> {
        out.info("restarting all services...");
        self.stop_all(out).await?;
        tokio::time::sleep(RESTART_DELAY).await;
        self.start_all(out).await
    }

    /// Print the plain `docker compose ps` listing. Failures are reported
    /// and swallowed.
    ///
    /// # Errors
    ///
    /// This function never returns an error in practice; the signature
    /// matches the other operations for uniform dispatch.
    pub async fn status(&self, out: &OutputContext) -> Result<()> {
        out.header("service status");
        match self.compose.ps_plain().await {
            Ok(status) if status.success() => {}
            Ok(status) => out.warn(&format!("docker compose ps exited with {status}")),
            Err(e) => out.error(&format!("could not query status: {e:#}")),
        }
        Ok(())
    }
}

/// Resolves when SIGINT or SIGTERM is delivered. Both route to the same
/// shutdown path.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let Ok(mut term) = signal(SignalKind::terminate()) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
