//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser};

use crate::compose::ComposeCli;
use crate::context::DeploymentContext;
use crate::lifecycle::Orchestrator;
use crate::output::OutputContext;

/// Local deployment orchestrator for the RAGFlow development stack
///
/// With no mode flag, starts the infrastructure services, waits for them to
/// report healthy, and runs the app server in the foreground.
#[derive(Parser)]
#[command(
    name = "ragup",
    version,
    group(ArgGroup::new("mode").multiple(false))
)]
pub struct Cli {
    /// Stop the app server and tear down the dependency stack
    #[arg(long, group = "mode")]
    pub stop: bool,

    /// Stop everything, then start it again
    #[arg(long, group = "mode")]
    pub restart: bool,

    /// Show the current state of the dependency stack
    #[arg(long, group = "mode")]
    pub status: bool,

    /// Deployment root containing the docker/ directory
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}

impl Cli {
    /// Execute the selected lifecycle operation.
    ///
    /// # Errors
    ///
    /// Returns an error on a precondition failure (missing compose or env
    /// file) or when a required external command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            stop,
            restart,
            status,
            root,
            quiet,
            no_color,
        } = self;

        let out = OutputContext::new(no_color, quiet);
        let ctx = DeploymentContext::resolve(root)?;
        let compose = ComposeCli::for_context(&ctx, !quiet);
        let mut orchestrator = Orchestrator::new(ctx, compose);

        if stop {
            orchestrator.stop_all(&out).await
        } else if restart {
            orchestrator.restart_all(&out).await
        } else if status {
            orchestrator.status(&out).await
        } else {
            orchestrator.start_all(&out).await
        }
    }
}
