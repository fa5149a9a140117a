//! Container engine and git wrappers for burrow
//!
//! This crate provides an abstraction over the container engine CLIs
//! (Podman, Docker) and the git CLI, both driven through a shared
//! [`CommandRunner`] with captured, size-capped output.

mod cli_engine;
mod command;
mod error;
mod git;
mod types;

pub use cli_engine::{is_name_conflict, parse_list_output_json, CliEngine};
pub use command::*;
pub use error::*;
pub use git::*;
pub use types::*;

use async_trait::async_trait;
use std::path::Path;

/// Trait for container engines (Podman, Docker)
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// List running containers carrying the given `key=value` label
    async fn list(&self, label_filter: &str) -> Result<Vec<ContainerInfo>>;

    /// Launch a detached container and return its ID.
    ///
    /// A duplicate container name is reported as [`ProviderError::NameConflict`].
    async fn run_detached(&self, config: &RunConfig) -> Result<ContainerId>;

    /// Execute a command in a running container and return its stdout
    async fn exec(&self, id: &ContainerId, config: &ExecConfig) -> Result<String>;

    /// Remove a container
    async fn remove(&self, id: &ContainerId, force: bool) -> Result<()>;

    /// Raw output of the engine's port-mapping query for a container port
    async fn port(&self, id: &ContainerId, container_port: u16) -> Result<String>;
}

/// Trait for the version-control client
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Clone only the latest commit of `url` into `dest`
    async fn shallow_clone(&self, url: &str, dest: &Path, auth: Option<&GitAuth>) -> Result<()>;

    /// File names under `rev` restricted to `paths`
    async fn ls_tree(&self, repo: &Path, rev: &str, paths: &[&str]) -> Result<Vec<String>>;

    /// Content of `path` at `rev`
    async fn show(&self, repo: &Path, rev: &str, path: &str) -> Result<String>;
}

/// Create the engine selected by the global config
pub fn create_engine(config: &burrow_config::GlobalConfig) -> Result<Box<dyn ContainerEngine>> {
    let engine_type: EngineType = config
        .engine
        .kind
        .parse()
        .map_err(ProviderError::ConfigError)?;
    let program = config
        .engine
        .program
        .clone()
        .unwrap_or_else(|| engine_type.program().to_string());
    let runner = CommandRunner::new(config.engine.max_output_bytes);
    tracing::debug!("Using {} engine via {}", engine_type, program);
    Ok(Box::new(CliEngine::new(program, runner)))
}

/// Create the git client selected by the global config
pub fn create_git(config: &burrow_config::GlobalConfig) -> Box<dyn GitClient> {
    let runner = CommandRunner::new(config.engine.max_output_bytes);
    Box::new(CliGit::new(config.engine.git.clone(), runner))
}
