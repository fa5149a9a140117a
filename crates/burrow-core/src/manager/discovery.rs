//! Listing of managed containers for ContainerManager

use crate::endpoint::{resolve_ssh_port, SshEndpoint};
use crate::labels::{ManagedLabels, MANAGED_FILTER};
use crate::Result;
use burrow_provider::ContainerInfo;
use futures::future::join_all;

use super::{ContainerManager, ContainerView};

impl ContainerManager {
    /// List managed containers with their SSH endpoints.
    ///
    /// Port queries run concurrently; a container whose port cannot be
    /// resolved is still listed, with `ssh` set to `None`.
    pub async fn list(&self) -> Result<Vec<ContainerView>> {
        let containers = self.engine.list(MANAGED_FILTER).await?;
        tracing::debug!("Found {} managed containers", containers.len());
        Ok(join_all(containers.into_iter().map(|c| self.view(c))).await)
    }

    async fn view(&self, container: ContainerInfo) -> ContainerView {
        let port = resolve_ssh_port(self.engine.as_ref(), &container.id).await;

        let ssh = port.map(|port| {
            let labels = match ManagedLabels::from_labels(&container.labels) {
                Ok(labels) => Some(labels),
                Err(e) => {
                    tracing::warn!("Unreadable labels on {}: {}", container.name, e);
                    None
                }
            };
            let (password, repo_path) = match labels {
                Some(labels) => (Some(labels.ssh_password), labels.repo_path),
                None => (None, None),
            };
            SshEndpoint::new(
                self.config.ssh.effective_host(),
                port,
                &self.config.ssh.user,
                password,
                repo_path.as_deref(),
            )
        });

        ContainerView {
            id: container.id,
            name: container.name,
            image: container.image,
            status: container.status,
            created_at: container.created_at,
            ssh,
        }
    }
}
