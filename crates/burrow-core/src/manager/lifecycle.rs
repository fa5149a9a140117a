//! Container creation for ContainerManager

use crate::labels::ManagedLabels;
use crate::repo::{workspace_dir, RepoTarget};
use crate::ssh::{bootstrap_command, SSH_PORT};
use crate::{image, naming, CoreError, Result};
use burrow_provider::{ContainerId, ExecConfig, GitAuth, PortPublish, ProviderError, RunConfig};

use super::{ContainerManager, CreateRequest, CreatedContainer, MAX_LAUNCH_ATTEMPTS};

/// Validated creation request
struct CreatePlan {
    repo: Option<RepoTarget>,
    auth: Option<GitAuth>,
}

impl ContainerManager {
    /// Create a container, optionally cloning a repository into it.
    ///
    /// This runs (in order):
    /// 1. Request validation (no external command runs before it passes)
    /// 2. Image resolution from the repository's devcontainer.json
    /// 3. Name and password allocation, then launch
    /// 4. Repository provisioning, rolled back by removing the container
    pub async fn create(&self, request: CreateRequest) -> Result<CreatedContainer> {
        let plan = self.validate(request)?;

        let image = match &plan.repo {
            Some(repo) => {
                image::resolve_image(self.git.as_ref(), &repo.url, plan.auth.as_ref()).await
            }
            None => None,
        }
        .unwrap_or_else(|| self.config.defaults.image.clone());

        let created = self.launch(&image, plan.repo.as_ref()).await?;

        if let Some(repo) = &plan.repo {
            if let Err(e) = self
                .provision_repository(&created.id, repo, plan.auth.as_ref())
                .await
            {
                tracing::error!("Provisioning {} failed: {}", created.name, e);
                self.rollback(&created.id).await;
                return Err(e);
            }
            tracing::info!("Cloned {} into {}", repo.url, created.name);
        }

        Ok(created)
    }

    fn validate(&self, request: CreateRequest) -> Result<CreatePlan> {
        let repo_url = request
            .repo_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        let Some(repo_url) = repo_url else {
            return Ok(CreatePlan {
                repo: None,
                auth: None,
            });
        };

        let repo = RepoTarget::parse(&repo_url)?;
        let auth = request
            .access_token
            .filter(|t| !t.trim().is_empty())
            .map(GitAuth::new);
        if auth.is_none() && !self.config.auth.no_auth {
            return Err(CoreError::MissingAccessToken);
        }

        Ok(CreatePlan {
            repo: Some(repo),
            auth,
        })
    }

    /// Start the container, drawing a fresh name when the engine reports
    /// that another creation took ours first
    async fn launch(&self, image: &str, repo: Option<&RepoTarget>) -> Result<CreatedContainer> {
        let user = &self.config.ssh.user;
        let mut attempt = 1;
        loop {
            let name = naming::allocate_name(self.engine.as_ref()).await;
            let password = naming::generate_password();

            let labels = ManagedLabels {
                ssh_password: password.clone(),
                ssh_name: name.clone(),
                repo_url: repo.map(|r| r.url.clone()),
                repo_path: repo.map(|r| r.clone_path(user)),
            };
            let config = RunConfig {
                image: image.to_string(),
                name: name.clone(),
                hostname: Some(name.clone()),
                labels: labels.to_labels()?,
                publish: vec![PortPublish {
                    host_ip: Some(self.config.ssh.bind.clone()),
                    host_port: None,
                    container_port: SSH_PORT,
                }],
                cmd: bootstrap_command(user, &password, SSH_PORT),
            };

            match self.engine.run_detached(&config).await {
                Ok(id) => {
                    tracing::info!("Started container {} ({}) from {}", name, id.short(), image);
                    return Ok(CreatedContainer { id, name });
                }
                Err(ProviderError::NameConflict { name, .. }) if attempt < MAX_LAUNCH_ATTEMPTS => {
                    tracing::warn!(
                        "Container name {} taken (attempt {}/{}), retrying",
                        name,
                        attempt,
                        MAX_LAUNCH_ATTEMPTS
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn provision_repository(
        &self,
        id: &ContainerId,
        repo: &RepoTarget,
        auth: Option<&GitAuth>,
    ) -> Result<()> {
        let user = &self.config.ssh.user;
        let target = repo.clone_path(user);

        let workspace = workspace_dir(user);
        self.engine
            .exec(id, &ExecConfig::new(["mkdir", "-p", workspace.as_str()]))
            .await?;

        let mut clone = vec!["git".to_string()];
        if let Some(auth) = auth {
            clone.extend(auth.git_args());
        }
        clone.extend([
            "clone".to_string(),
            "--".to_string(),
            repo.url.clone(),
            target.clone(),
        ]);
        self.engine
            .exec(id, &ExecConfig::new(clone).env("GIT_TERMINAL_PROMPT", "0"))
            .await?;

        let owner = format!("{}:{}", user, user);
        self.engine
            .exec(id, &ExecConfig::new(["chown", "-R", owner.as_str(), target.as_str()]))
            .await?;
        Ok(())
    }

    /// Best-effort removal of a half-provisioned container
    async fn rollback(&self, id: &ContainerId) {
        match self.engine.remove(id, true).await {
            Ok(()) => tracing::info!("Removed container {} after failed provisioning", id.short()),
            Err(e) => tracing::warn!("Failed to remove container {}: {}", id.short(), e),
        }
    }
}
