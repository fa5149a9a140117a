//! SSH endpoint resolution for running containers

use crate::ssh::SSH_PORT;
use burrow_provider::{ContainerEngine, ContainerId};
use serde::{Deserialize, Serialize};

/// URI prefix that opens VS Code Remote-SSH
pub const VSCODE_URI_PREFIX: &str = "vscode://vscode-remote/ssh-remote+";

/// How to reach a container over SSH
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshEndpoint {
    pub host: String,
    /// Serialized as a string, e.g. `"41234"`
    #[serde(with = "port_string")]
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub vscode_uri: String,
}

impl SshEndpoint {
    /// Compose the endpoint for a published port
    pub fn new(
        host: &str,
        port: u16,
        user: &str,
        password: Option<String>,
        repo_path: Option<&str>,
    ) -> Self {
        let target = ssh_target(user, host, port);
        Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password,
            vscode_uri: vscode_uri(&target, repo_path),
        }
    }

    /// `user@host:port`
    pub fn target(&self) -> String {
        ssh_target(&self.user, &self.host, self.port)
    }
}

mod port_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(port: &u16, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(port)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `user@host:port`
pub fn ssh_target(user: &str, host: &str, port: u16) -> String {
    format!("{}@{}:{}", user, host, port)
}

/// Remote-SSH deep link, opening `repo_path` when given
pub fn vscode_uri(target: &str, repo_path: Option<&str>) -> String {
    let mut uri = format!("{}{}", VSCODE_URI_PREFIX, urlencoding::encode(target));
    if let Some(path) = repo_path.filter(|p| !p.is_empty()) {
        let encoded: Vec<_> = path.split('/').map(urlencoding::encode).collect();
        uri.push_str(&encoded.join("/"));
    }
    uri
}

/// Host port from `port` output such as `0.0.0.0:41234`.
///
/// The last non-empty line wins; Docker lists the IPv4 and IPv6 bindings
/// on separate lines.
pub fn parse_port_output(output: &str) -> Option<u16> {
    let line = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()?;
    let (_, port) = line.rsplit_once(':')?;
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    port.parse().ok()
}

/// Published host port of the container's sshd, if any
pub async fn resolve_ssh_port(engine: &dyn ContainerEngine, id: &ContainerId) -> Option<u16> {
    match engine.port(id, SSH_PORT).await {
        Ok(output) => parse_port_output(&output),
        Err(e) => {
            tracing::debug!("No SSH port mapping for {}: {}", id.short(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_output() {
        assert_eq!(parse_port_output("0.0.0.0:41234\n"), Some(41234));
        assert_eq!(parse_port_output("0.0.0.0:41234\n[::]:41235\n"), Some(41235));
        assert_eq!(parse_port_output("127.0.0.1:2200  \n\n"), Some(2200));
    }

    #[test]
    fn test_parse_port_output_misses() {
        assert_eq!(parse_port_output(""), None);
        assert_eq!(parse_port_output("no public port"), None);
        assert_eq!(parse_port_output("0.0.0.0:"), None);
        assert_eq!(parse_port_output("0.0.0.0:abc"), None);
        assert_eq!(parse_port_output("0.0.0.0:99999"), None);
    }

    #[test]
    fn test_ssh_target() {
        assert_eq!(ssh_target("user", "example.com", 41234), "user@example.com:41234");
    }

    #[test]
    fn test_vscode_uri_without_repo() {
        assert_eq!(
            vscode_uri("user@localhost:41234", None),
            "vscode://vscode-remote/ssh-remote+user%40localhost%3A41234"
        );
    }

    #[test]
    fn test_vscode_uri_with_repo_path() {
        assert_eq!(
            vscode_uri("user@localhost:41234", Some("/home/user/workspace/my repo")),
            "vscode://vscode-remote/ssh-remote+user%40localhost%3A41234/home/user/workspace/my%20repo"
        );
    }

    #[test]
    fn test_endpoint_new() {
        let endpoint = SshEndpoint::new(
            "boxes.example.com",
            40000,
            "dev",
            Some("pw".to_string()),
            Some("/home/dev/workspace/project"),
        );
        assert_eq!(endpoint.target(), "dev@boxes.example.com:40000");
        assert!(endpoint
            .vscode_uri
            .ends_with("%3A40000/home/dev/workspace/project"));

        let json = serde_json::to_value(&endpoint).unwrap();
        assert_eq!(json["vscodeUri"], endpoint.vscode_uri.as_str());
        assert_eq!(json["port"], "40000");

        let back: SshEndpoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, endpoint);
    }

    #[test]
    fn test_endpoint_rejects_non_numeric_port() {
        let json = serde_json::json!({
            "host": "localhost",
            "port": "ssh",
            "user": "user",
            "password": null,
            "vscodeUri": "",
        });
        assert!(serde_json::from_value::<SshEndpoint>(json).is_err());
    }
}
