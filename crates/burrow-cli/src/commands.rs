//! CLI command implementations

use anyhow::{Context, Result};
use burrow_config::GlobalConfig;
use burrow_core::{ContainerManager, ContainerView, CreateRequest};
use burrow_provider::ContainerId;

/// List managed containers
pub async fn list(manager: &ContainerManager, json: bool) -> Result<()> {
    let containers = manager
        .list()
        .await
        .context("Failed to list containers")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&containers)?);
        return Ok(());
    }

    if containers.is_empty() {
        println!("No containers found.");
        println!("\nUse 'burrow create' to start one.");
        return Ok(());
    }

    // Column widths
    const NAME_WIDTH: usize = 20;
    const ID_WIDTH: usize = 12;
    const STATUS_WIDTH: usize = 22;

    println!(
        "{:<NAME_WIDTH$} {:<ID_WIDTH$} {:<STATUS_WIDTH$} SSH",
        "NAME", "ID", "STATUS"
    );
    println!("{}", "-".repeat(80));

    for container in &containers {
        println!(
            "{:<NAME_WIDTH$} {:<ID_WIDTH$} {:<STATUS_WIDTH$} {}",
            container.name,
            container.id.short(),
            container.status,
            ssh_column(container)
        );
    }

    Ok(())
}

fn ssh_column(container: &ContainerView) -> String {
    match &container.ssh {
        Some(ssh) => ssh.target(),
        None => "-".to_string(),
    }
}

/// Create a container
pub async fn create(
    manager: &ContainerManager,
    repo: Option<String>,
    token: Option<String>,
    json: bool,
) -> Result<()> {
    let created = manager
        .create(CreateRequest::new(repo, token))
        .await
        .context("Failed to start container")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!("Created '{}' ({})", created.name, created.id.short());
        println!("Run 'burrow list' to see its SSH endpoint once sshd is up.");
    }
    Ok(())
}

/// Force-remove a container
pub async fn remove(manager: &ContainerManager, id: &str) -> Result<()> {
    manager
        .delete(&ContainerId::new(id))
        .await
        .context("Failed to delete container")?;
    println!("Removed '{}'", id);
    Ok(())
}

/// Show the effective configuration
pub fn config(config: &GlobalConfig) -> Result<()> {
    let config_path = GlobalConfig::config_path()?;
    if config_path.exists() {
        println!("# Config file: {:?}\n", config_path);
    } else {
        println!("# Config file: {:?} (not created yet)\n", config_path);
    }
    println!("# Effective configuration (environment overrides applied):");
    println!("{}", config.to_toml()?);
    Ok(())
}
