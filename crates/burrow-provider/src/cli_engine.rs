//! CLI-based container engine for Podman and Docker
//!
//! Every operation is a single invocation of the engine binary. Podman and
//! Docker accept the same arguments for everything used here; they differ
//! only in the shape of `ps --format json` output, which the parser absorbs.

use crate::{
    CommandRunner, CommandSpec, ContainerEngine, ContainerId, ContainerInfo, ExecConfig,
    ProviderError, Result, RunConfig,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// CLI-based container engine
pub struct CliEngine {
    /// Command to use ("docker", "podman" or a path to either)
    cmd: String,
    runner: CommandRunner,
}

impl CliEngine {
    pub fn new(program: impl Into<String>, runner: CommandRunner) -> Self {
        Self {
            cmd: program.into(),
            runner,
        }
    }

    /// Run an engine subcommand and get its stdout
    async fn run_cmd<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new(&self.cmd).args(args);
        self.runner.run(&spec).await
    }

    fn run_args(config: &RunConfig) -> Vec<String> {
        let mut args = vec!["run".to_string(), "-d".to_string()];

        args.push(format!("--name={}", config.name));

        if let Some(ref hostname) = config.hostname {
            args.push(format!("--hostname={}", hostname));
        }

        // Labels
        for (k, v) in &config.labels {
            args.push(format!("--label={}={}", k, v));
        }

        // Ports
        for publish in &config.publish {
            args.push(format!("--publish={}", publish.to_arg()));
        }

        args.push("--pull=missing".to_string());

        // Image
        args.push(config.image.clone());

        // Command
        args.extend(config.cmd.iter().cloned());
        args
    }

    fn exec_args(id: &ContainerId, config: &ExecConfig) -> Vec<String> {
        let mut args = vec!["exec".to_string()];

        for (k, v) in &config.env {
            args.push(format!("--env={}={}", k, v));
        }

        args.push(id.0.clone());
        args.extend(config.cmd.iter().cloned());
        args
    }
}

#[async_trait]
impl ContainerEngine for CliEngine {
    async fn list(&self, label_filter: &str) -> Result<Vec<ContainerInfo>> {
        let filter = format!("--filter=label={}", label_filter);
        let output = self.run_cmd(["ps", filter.as_str(), "--format=json"]).await?;
        parse_list_output_json(&output)
    }

    async fn run_detached(&self, config: &RunConfig) -> Result<ContainerId> {
        match self.run_cmd(Self::run_args(config)).await {
            Ok(output) => {
                // `--pull=missing` may print pull progress first; the ID is last
                let id = output
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .last()
                    .unwrap_or("");
                if id.is_empty() {
                    return Err(ProviderError::Parse {
                        what: "container ID from run".to_string(),
                        detail: "engine printed nothing".to_string(),
                    });
                }
                Ok(ContainerId::new(id))
            }
            Err(ProviderError::CommandFailed { stderr, .. }) if is_name_conflict(&stderr) => {
                Err(ProviderError::NameConflict {
                    name: config.name.clone(),
                    stderr,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn exec(&self, id: &ContainerId, config: &ExecConfig) -> Result<String> {
        self.run_cmd(Self::exec_args(id, config)).await
    }

    async fn remove(&self, id: &ContainerId, force: bool) -> Result<()> {
        // Docker 23+ exits 0 from `rm -f` on a missing container
        self.run_cmd([
            "inspect",
            "--type",
            "container",
            "--format",
            "{{.Id}}",
            id.0.as_str(),
        ])
        .await?;
        if force {
            self.run_cmd(["rm", "-f", id.0.as_str()]).await?;
        } else {
            self.run_cmd(["rm", id.0.as_str()]).await?;
        }
        Ok(())
    }

    async fn port(&self, id: &ContainerId, container_port: u16) -> Result<String> {
        let port_spec = format!("{}/tcp", container_port);
        self.run_cmd(["port", id.0.as_str(), port_spec.as_str()]).await
    }
}

/// Whether engine stderr reports a duplicate container name.
///
/// Docker: `Conflict. The container name "/x" is already in use by container ...`
/// Podman: `the container name "x" is already in use by ... You have to remove that container`
pub fn is_name_conflict(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("name") && lower.contains("already in use")
}

fn labels_from_json_value(value: &Value) -> HashMap<String, String> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let value = v
                    .as_str()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| v.to_string());
                (k.clone(), value)
            })
            .collect(),
        Value::String(s) => parse_cli_labels(s),
        _ => HashMap::new(),
    }
}

/// Parse CLI labels format "key=value,key2=value2" into HashMap
fn parse_cli_labels(label_str: &str) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    for part in label_str.split(',') {
        if let Some((key, value)) = part.split_once('=') {
            labels.insert(key.to_string(), value.to_string());
        }
    }
    labels
}

fn first_str<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// `Names` is an array under Podman and a comma-joined string under Docker
fn first_name(obj: &serde_json::Map<String, Value>) -> String {
    let name = match obj.get("Names") {
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty()),
        Some(Value::String(names)) => names.split(',').map(str::trim).find(|s| !s.is_empty()),
        _ => None,
    }
    .or_else(|| first_str(obj, &["Name"]))
    .unwrap_or("");
    name.trim_start_matches('/').to_string()
}

fn container_from_json(obj: &serde_json::Map<String, Value>) -> Option<ContainerInfo> {
    let id = first_str(obj, &["Id", "ID"])?;
    let status = first_str(obj, &["Status", "State"]).unwrap_or("");
    let created_at = match obj.get("CreatedAt").or_else(|| obj.get("Created")) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Some(ContainerInfo {
        id: ContainerId::new(id),
        name: first_name(obj),
        image: first_str(obj, &["Image", "ImageName"]).unwrap_or("").to_string(),
        status: status.to_string(),
        created_at,
        labels: obj
            .get("Labels")
            .map(labels_from_json_value)
            .unwrap_or_default(),
    })
}

/// Parse `ps --format json` output.
///
/// Podman prints a single JSON array; Docker prints one object per line.
pub fn parse_list_output_json(output: &str) -> Result<Vec<ContainerInfo>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let parse_error = |detail: String| ProviderError::Parse {
        what: "container list".to_string(),
        detail,
    };

    if trimmed.starts_with('[') {
        let parsed: Value =
            serde_json::from_str(trimmed).map_err(|e| parse_error(e.to_string()))?;
        let items = parsed.as_array().cloned().unwrap_or_default();
        return Ok(items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(container_from_json)
            .collect());
    }

    let mut containers = Vec::new();
    let mut parse_errors = 0usize;
    for line in trimmed.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(obj)) => {
                if let Some(container) = container_from_json(&obj) {
                    containers.push(container);
                }
            }
            _ => parse_errors += 1,
        }
    }

    if containers.is_empty() && parse_errors > 0 {
        let preview = trimmed
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(200)
            .collect::<String>();
        return Err(parse_error(format!(
            "output was not valid JSON (output preview: {:?})",
            preview
        )));
    }

    Ok(containers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PortPublish;
    use std::collections::BTreeMap;

    #[test]
    fn test_parse_cli_labels_value_with_equals() {
        let labels = parse_cli_labels("key=a=b,other=c");
        assert_eq!(labels.get("key").unwrap(), "a=b");
        assert_eq!(labels.get("other").unwrap(), "c");
        assert!(parse_cli_labels("").is_empty());
    }

    #[test]
    fn test_parse_list_podman_output() {
        let output = r#"[
          {
            "Id": "aabbccddeeff00112233",
            "Image": "mcr.microsoft.com/devcontainers/universal:latest",
            "Names": ["otter"],
            "State": "running",
            "Status": "Up 5 minutes",
            "CreatedAt": "2024-02-01 10:00:00 +0000 UTC",
            "Labels": {"burrow.managed": "true", "burrow.ssh_name": "otter"}
          }
        ]"#;
        let containers = parse_list_output_json(output).unwrap();
        assert_eq!(containers.len(), 1);
        let c = &containers[0];
        assert_eq!(c.id.0, "aabbccddeeff00112233");
        assert_eq!(c.name, "otter");
        assert_eq!(c.status, "Up 5 minutes");
        assert_eq!(c.created_at.as_deref(), Some("2024-02-01 10:00:00 +0000 UTC"));
        assert_eq!(c.labels.get("burrow.ssh_name").unwrap(), "otter");
    }

    #[test]
    fn test_parse_list_docker_json_lines() {
        let output = concat!(
            r#"{"ID":"abc123","Names":"/lynx","Image":"ubuntu:22.04","State":"running","Status":"Up 2 hours","CreatedAt":"2024-01-15 09:00:00 +0000 UTC","Labels":"burrow.managed=true,burrow.ssh_name=lynx"}"#,
            "\n",
            r#"{"ID":"def456","Names":"wren","Image":"node:18","State":"exited","Status":"Exited (0)","Labels":""}"#,
            "\n"
        );
        let containers = parse_list_output_json(output).unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].id.0, "abc123");
        assert_eq!(containers[0].name, "lynx");
        assert_eq!(containers[0].labels.get("burrow.managed").unwrap(), "true");
        assert_eq!(containers[1].status, "Exited (0)");
        assert!(containers[1].labels.is_empty());
        assert_eq!(containers[1].created_at, None);
    }

    #[test]
    fn test_parse_list_field_fallbacks() {
        let output = r#"[{"Id":"x1","Name":"heron","ImageName":"alpine","State":"running","Created":1700000000}]"#;
        let containers = parse_list_output_json(output).unwrap();
        assert_eq!(containers[0].name, "heron");
        assert_eq!(containers[0].image, "alpine");
        assert_eq!(containers[0].status, "running");
        assert_eq!(containers[0].created_at.as_deref(), Some("1700000000"));
    }

    #[test]
    fn test_parse_list_empty_output() {
        assert!(parse_list_output_json("").unwrap().is_empty());
        assert!(parse_list_output_json("[]").unwrap().is_empty());
        assert!(parse_list_output_json("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_list_skips_entries_without_id() {
        let output = r#"[{"Names":["ghost"]},{"Id":"real","Names":["puma"]}]"#;
        let containers = parse_list_output_json(output).unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, "puma");
    }

    #[test]
    fn test_parse_list_invalid_errors() {
        assert!(parse_list_output_json("not json at all").is_err());
        assert!(parse_list_output_json("[{").is_err());
    }

    #[test]
    fn test_name_conflict_detection() {
        assert!(is_name_conflict(
            "docker: Error response from daemon: Conflict. The container name \"/otter\" is already in use by container \"abc\"."
        ));
        assert!(is_name_conflict(
            "Error: creating container storage: the container name \"otter\" is already in use by 5f3e. You have to remove that container to be able to reuse that name: that name is already in use"
        ));
        assert!(!is_name_conflict("Error: short-name resolution enforced"));
        assert!(!is_name_conflict("port is already in use"));
    }

    #[test]
    fn test_run_args() {
        let mut labels = BTreeMap::new();
        labels.insert("burrow.managed".to_string(), "true".to_string());
        let config = RunConfig {
            image: "ubuntu:24.04".to_string(),
            name: "otter".to_string(),
            hostname: Some("otter".to_string()),
            labels,
            publish: vec![PortPublish {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: None,
                container_port: 2222,
            }],
            cmd: vec!["sh".to_string(), "-c".to_string(), "true".to_string()],
        };
        assert_eq!(
            CliEngine::run_args(&config),
            vec![
                "run",
                "-d",
                "--name=otter",
                "--hostname=otter",
                "--label=burrow.managed=true",
                "--publish=0.0.0.0::2222",
                "--pull=missing",
                "ubuntu:24.04",
                "sh",
                "-c",
                "true"
            ]
        );
    }

    #[test]
    fn test_exec_args() {
        let config = ExecConfig::new(["git", "clone", "u", "/p"]).env("GIT_TERMINAL_PROMPT", "0");
        assert_eq!(
            CliEngine::exec_args(&ContainerId::new("c1"), &config),
            vec!["exec", "--env=GIT_TERMINAL_PROMPT=0", "c1", "git", "clone", "u", "/p"]
        );
    }

    /// Stand-in engine that answers like docker 23+: `inspect` fails for
    /// unknown IDs while `rm -f` exits 0 for them. Invocations go to `calls.log`.
    fn stub_engine(dir: &tempfile::TempDir) -> CliEngine {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.path().join("engine");
        std::fs::write(
            &script,
            r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/calls.log"
for last; do :; done
case "$1" in
  inspect)
    if [ "$last" = "known" ]; then echo known; exit 0; fi
    echo "Error: No such container: $last" >&2
    exit 1 ;;
  rm)
    if [ "$last" != "known" ]; then
      echo "Error response from daemon: No such container: $last" >&2
    fi
    exit 0 ;;
esac
exit 0
"#,
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        CliEngine::new(script.to_string_lossy(), CommandRunner::default())
    }

    fn stub_calls(dir: &tempfile::TempDir) -> Vec<String> {
        std::fs::read_to_string(dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_remove_unknown_id_fails_even_when_rm_exits_zero() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = stub_engine(&dir);

        let err = engine
            .remove(&ContainerId::new("does-not-exist"), true)
            .await
            .unwrap_err();

        match err {
            ProviderError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(1));
                assert!(stderr.contains("No such container"));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
        assert_eq!(
            stub_calls(&dir),
            vec!["inspect --type container --format {{.Id}} does-not-exist"]
        );
    }

    #[tokio::test]
    async fn test_remove_known_id() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = stub_engine(&dir);

        engine.remove(&ContainerId::new("known"), true).await.unwrap();

        let calls = stub_calls(&dir);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], "rm -f known");
    }

    async fn get_test_engine() -> Option<CliEngine> {
        let program = match std::env::var("BURROW_TEST_ENGINE").as_deref() {
            Ok("docker") => "docker",
            _ => "podman",
        };
        let engine = CliEngine::new(program, CommandRunner::default());
        match engine.list("burrow.test=true").await {
            Ok(_) => Some(engine),
            Err(e) => {
                eprintln!("Skipping test: engine unavailable: {}", e);
                None
            }
        }
    }

    #[tokio::test]
    #[ignore] // Requires podman or docker
    async fn test_run_port_and_remove() {
        let engine = match get_test_engine().await {
            Some(e) => e,
            None => return,
        };

        let mut labels = BTreeMap::new();
        labels.insert("burrow.test".to_string(), "true".to_string());
        let config = RunConfig {
            image: "docker.io/library/alpine:latest".to_string(),
            name: "burrow_test_run_port".to_string(),
            hostname: None,
            labels,
            publish: vec![PortPublish {
                host_ip: Some("127.0.0.1".to_string()),
                host_port: None,
                container_port: 2222,
            }],
            cmd: vec!["sleep".to_string(), "60".to_string()],
        };
        let id = engine.run_detached(&config).await.unwrap();

        let duplicate = engine.run_detached(&config).await;
        let port = engine.port(&id, 2222).await;
        let listed = engine.list("burrow.test=true").await;
        engine.remove(&id, true).await.unwrap();
        let removed_twice = engine.remove(&id, true).await;

        assert!(removed_twice.is_err());
        assert!(matches!(duplicate, Err(ProviderError::NameConflict { .. })));
        assert!(port.unwrap().trim().starts_with("127.0.0.1:"));
        assert!(listed.unwrap().iter().any(|c| c.name == "burrow_test_run_port"));
    }
}
