//! Deployment context — paths and compiled-in stack configuration.
//!
//! Everything here is resolved once at startup and passed down immutably.
//! The compose file and env file belong to the deployment being managed;
//! ragup owns no configuration files of its own.

use std::path::PathBuf;

use thiserror::Error;

/// Compose definition, relative to the deployment root.
pub const COMPOSE_FILE: &str = "docker/docker-compose-base.yml";

/// Compose environment file, relative to the deployment root.
pub const ENV_FILE: &str = "docker/.env";

/// Infrastructure services brought up before the app server, in order.
pub const DEPENDENCIES: [&str; 4] = ["mysql", "redis", "minio", "es01"];

/// Container name prefix the compose project prepends to service names.
pub const NAME_PREFIX: &str = "ragflow-";

/// Port the app server listens on. Informational only — ragup never probes it.
pub const APP_PORT: u16 = 9380;

/// Command that starts the app server in the foreground.
pub const APP_COMMAND: [&str; 3] = ["python3", "-m", "api.ragflow_server"];

/// Environment variable telling the app server where its deployment root is.
pub const APP_ROOT_ENV: &str = "RAGUP_ROOT";

/// Errors raised while resolving the deployment context.
///
/// These are precondition failures: fatal, reported, and no external
/// invocation is attempted afterwards.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("compose file not found: {0}")]
    ComposeFileMissing(PathBuf),

    #[error("environment file not found: {0}")]
    EnvFileMissing(PathBuf),
}

/// Immutable configuration for one ragup invocation.
///
/// Fields are public so tests can construct synthetic contexts with fast
/// poll settings and trivial app commands.
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    /// Deployment root; working directory for every external invocation.
    pub root: PathBuf,
    /// Absolute path to the compose definition.
    pub compose_file: PathBuf,
    /// Absolute path to the compose environment file.
    pub env_file: PathBuf,
    /// Ordered dependency service names.
    pub dependencies: Vec<String>,
    /// Prefix stripped from container names during status matching.
    pub name_prefix: String,
    /// App server port (informational).
    pub app_port: u16,
    /// Argument vector for the supervised app server.
    pub app_command: Vec<String>,
}

impl DeploymentContext {
    /// Resolve the context for `root`, validating that the compose file and
    /// env file exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ContextError`] if either required file is missing.
    pub fn resolve(root: PathBuf) -> Result<Self, ContextError> {
        let compose_file = root.join(COMPOSE_FILE);
        if !compose_file.exists() {
            return Err(ContextError::ComposeFileMissing(compose_file));
        }
        let env_file = root.join(ENV_FILE);
        if !env_file.exists() {
            return Err(ContextError::EnvFileMissing(env_file));
        }

        Ok(Self {
            root,
            compose_file,
            env_file,
            dependencies: DEPENDENCIES.iter().map(|s| (*s).to_string()).collect(),
            name_prefix: NAME_PREFIX.to_string(),
            app_port: APP_PORT,
            app_command: APP_COMMAND.iter().map(|s| (*s).to_string()).collect(),
        })
    }
}
