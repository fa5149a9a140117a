//! Common types for container engines

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Container ID wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// First 12 characters, as engines print IDs
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Container engine type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    Docker,
    Podman,
}

impl EngineType {
    /// Executable name of the engine CLI
    pub fn program(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl std::fmt::Display for EngineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

impl std::str::FromStr for EngineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            _ => Err(format!("Unknown engine type: {}", s)),
        }
    }
}

/// Container entry from the engine's listing
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    /// Human readable status text, e.g. "Up 5 minutes"
    pub status: String,
    pub created_at: Option<String>,
    pub labels: HashMap<String, String>,
}

/// Port publish rule for `run`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPublish {
    /// Host address to bind; all interfaces when `None`
    pub host_ip: Option<String>,
    /// Host port; engine-assigned ephemeral port when `None`
    pub host_port: Option<u16>,
    pub container_port: u16,
}

impl PortPublish {
    /// Render as the argument of `--publish`
    pub fn to_arg(&self) -> String {
        match (&self.host_ip, self.host_port) {
            (Some(ip), Some(hp)) => format!("{}:{}:{}", ip, hp, self.container_port),
            (Some(ip), None) => format!("{}::{}", ip, self.container_port),
            (None, Some(hp)) => format!("{}:{}", hp, self.container_port),
            (None, None) => self.container_port.to_string(),
        }
    }
}

/// Configuration for launching a detached container
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub image: String,
    pub name: String,
    pub hostname: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub publish: Vec<PortPublish>,
    /// Command run in place of the image's default command
    pub cmd: Vec<String>,
}

/// Configuration for running a command in a container
#[derive(Debug, Clone, Default)]
pub struct ExecConfig {
    pub cmd: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ExecConfig {
    pub fn new<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}
