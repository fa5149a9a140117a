//! Global configuration for burrow
//!
//! Located at `~/.config/burrow/config.toml`. Every value can be overridden
//! from the environment, which is how server deployments usually configure it.

use crate::{ConfigError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Image used when a repository does not declare one
pub const DEFAULT_IMAGE: &str = "mcr.microsoft.com/devcontainers/universal:latest";

/// Cap on captured stdout/stderr of a single external command
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Global burrow configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub engine: EngineConfig,
    pub defaults: DefaultsConfig,
    pub ssh: SshConfig,
    pub auth: AuthConfig,
}

/// Container engine and external tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Container engine ("podman" or "docker")
    pub kind: String,
    /// Engine executable; the name of `kind` when unset
    pub program: Option<String>,
    /// Git executable used for repository inspection
    pub git: String,
    /// Maximum bytes captured per output stream of an external command
    pub max_output_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: "podman".to_string(),
            program: None,
            git: "git".to_string(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Defaults applied to new containers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Image used when the repository has no devcontainer.json image
    pub image: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
        }
    }
}

/// SSH access settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Login user created inside every container
    pub user: String,
    /// Host address the SSH port is published on
    pub bind: String,
    /// Externally visible host name; falls back to `domain`
    pub host: Option<String>,
    /// Public domain name of this machine
    pub domain: String,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: "user".to_string(),
            bind: "0.0.0.0".to_string(),
            host: None,
            domain: "localhost".to_string(),
        }
    }
}

/// Repository access policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Allow cloning repositories without an access token
    pub no_auth: bool,
}

impl SshConfig {
    /// Host name that clients should connect to
    pub fn effective_host(&self) -> &str {
        self.host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(&self.domain)
    }
}

impl GlobalConfig {
    /// Load global configuration from the default path and apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load global configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!(
            "Loaded config from {:?}: engine={}, user={}",
            path,
            config.engine.kind,
            config.ssh.user
        );

        Ok(config)
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(user) = non_empty("SSH_USER") {
            self.ssh.user = user;
        }
        if let Some(bind) = non_empty("SSH_BIND") {
            self.ssh.bind = bind;
        }
        if let Some(host) = non_empty("SSH_HOST") {
            self.ssh.host = Some(host);
        }
        if let Some(domain) = non_empty("DOMAIN_NAME") {
            self.ssh.domain = domain;
        }
        if let Some(engine) = non_empty("BURROW_ENGINE") {
            self.engine.kind = engine;
        }
        if let Some(no_auth) = lookup("NO_AUTH") {
            self.auth.no_auth = no_auth.trim().eq_ignore_ascii_case("true");
        }
    }

    /// Reject values that would be unsafe to interpolate into the
    /// container bootstrap script
    pub fn validate(&self) -> Result<()> {
        if !is_valid_user_name(&self.ssh.user) {
            return Err(ConfigError::Invalid(format!(
                "ssh.user {:?} must match [a-z_][a-z0-9_-]*",
                self.ssh.user
            )));
        }
        if self.ssh.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("ssh.bind must not be empty".into()));
        }
        if self.defaults.image.trim().is_empty() {
            return Err(ConfigError::Invalid("defaults.image must not be empty".into()));
        }
        if self.engine.max_output_bytes == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_output_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "burrow").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn is_valid_user_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 32
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
