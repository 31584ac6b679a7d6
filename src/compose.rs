//! Docker compose CLI abstraction — enables test doubles for all stack
//! operations.

use std::path::PathBuf;
use std::process::{ExitStatus, Output};

use anyhow::{Context, Result};

use crate::command_runner::{CommandRunner, QUERY_TIMEOUT, STACK_TIMEOUT, TokioCommandRunner};
use crate::context::DeploymentContext;

/// Abstraction over the `docker compose` CLI.
///
/// Every invocation carries the deployment's compose file and env file. The
/// production implementation shells out through a [`CommandRunner`]; test
/// doubles return canned results.
#[allow(async_fn_in_trait)]
pub trait ComposeBackend {
    /// Run `docker compose … up -d <services…>`.
    ///
    /// Returns once the compose CLI returns; readiness is the poller's job.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn up_detached(&self, services: &[String]) -> Result<Output>;

    /// Run `docker compose … down` for the whole stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn down(&self) -> Result<Output>;

    /// Run `docker compose … ps --format json` — one JSON record per line.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn ps_structured(&self) -> Result<Output>;

    /// Run `docker compose … ps` with inherited stdio for human display.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn ps_plain(&self) -> Result<ExitStatus>;
}

/// Production implementation — shells out to the `docker` binary.
///
/// Generic over `R: CommandRunner` so that tests can inject a mock runner
/// without spawning real processes.
///
/// Two runners are held:
/// - `query_runner`: short timeout, used for `ps` status queries
/// - `stack_runner`: long timeout, used for `up`/`down` (may pull images)
pub struct ComposeCli<R: CommandRunner> {
    query_runner: R,
    stack_runner: R,
    root: PathBuf,
    compose_file: String,
    env_file: String,
}

impl<R: CommandRunner> ComposeCli<R> {
    /// Create a compose backend with explicit runner instances.
    pub fn new(query_runner: R, stack_runner: R, ctx: &DeploymentContext) -> Self {
        Self {
            query_runner,
            stack_runner,
            root: ctx.root.clone(),
            compose_file: ctx.compose_file.display().to_string(),
            env_file: ctx.env_file.display().to_string(),
        }
    }

    fn base_args(&self) -> Vec<&str> {
        vec![
            "compose",
            "-f",
            &self.compose_file,
            "--env-file",
            &self.env_file,
        ]
    }
}

impl ComposeCli<TokioCommandRunner> {
    /// Convenience constructor for production use, with default timeouts.
    #[must_use]
    pub fn for_context(ctx: &DeploymentContext, trace: bool) -> Self {
        Self::new(
            TokioCommandRunner::new(QUERY_TIMEOUT).traced(trace),
            TokioCommandRunner::new(STACK_TIMEOUT).traced(trace),
            ctx,
        )
    }
}

impl<R: CommandRunner> ComposeBackend for ComposeCli<R> {
    async fn up_detached(&self, services: &[String]) -> Result<Output> {
        let mut args = self.base_args();
        args.push("up");
        args.push("-d");
        args.extend(services.iter().map(String::as_str));
        self.stack_runner
            .run("docker", &args, &self.root)
            .await
            .context("failed to run docker compose up")
    }

    async fn down(&self) -> Result<Output> {
        let mut args = self.base_args();
        args.push("down");
        self.stack_runner
            .run("docker", &args, &self.root)
            .await
            .context("failed to run docker compose down")
    }

    async fn ps_structured(&self) -> Result<Output> {
        let mut args = self.base_args();
        args.extend(["ps", "--format", "json"]);
        self.query_runner
            .run("docker", &args, &self.root)
            .await
            .context("failed to run docker compose ps")
    }

    async fn ps_plain(&self) -> Result<ExitStatus> {
        let mut args = self.base_args();
        args.push("ps");
        self.query_runner
            .run_status("docker", &args, &self.root)
            .await
            .context("failed to run docker compose ps")
    }
}
