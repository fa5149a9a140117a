//! Container manager - coordinates all container operations

mod discovery;
mod lifecycle;

use crate::{Result, SshEndpoint};
use burrow_config::GlobalConfig;
use burrow_provider::{ContainerEngine, ContainerId, GitClient};
use serde::{Deserialize, Serialize};

/// Launch attempts when the engine reports a name collision
pub const MAX_LAUNCH_ATTEMPTS: usize = 3;

/// Request to create a container
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// Repository to clone into the container
    pub repo_url: Option<String>,
    /// Token for private repository access
    pub access_token: Option<String>,
}

impl CreateRequest {
    pub fn new(repo_url: Option<String>, access_token: Option<String>) -> Self {
        Self {
            repo_url,
            access_token,
        }
    }
}

/// Result of a successful creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedContainer {
    pub id: ContainerId,
    pub name: String,
}

/// Public view of a managed container
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerView {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub status: String,
    pub created_at: Option<String>,
    /// Absent until the SSH port is published
    pub ssh: Option<SshEndpoint>,
}

/// Main container manager
pub struct ContainerManager {
    engine: Box<dyn ContainerEngine>,
    git: Box<dyn GitClient>,
    config: GlobalConfig,
}

impl ContainerManager {
    /// Create a manager with explicit collaborators
    pub fn new(
        engine: Box<dyn ContainerEngine>,
        git: Box<dyn GitClient>,
        config: GlobalConfig,
    ) -> Self {
        Self {
            engine,
            git,
            config,
        }
    }

    /// Create a manager using the engine and git CLIs named in `config`
    pub fn from_config(config: GlobalConfig) -> Result<Self> {
        config.validate()?;
        let engine = burrow_provider::create_engine(&config)?;
        let git = burrow_provider::create_git(&config);
        Ok(Self::new(engine, git, config))
    }

    /// Global configuration in use
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Force-remove a container.
    ///
    /// An unknown ID is an error: the caller named a specific container.
    pub async fn delete(&self, id: &ContainerId) -> Result<()> {
        self.engine.remove(id, true).await?;
        tracing::info!("Removed container {}", id.short());
        Ok(())
    }
}
