//! Test support utilities for burrow-core
//!
//! Provides MockEngine and MockGit for unit testing the ContainerManager
//! without a real Podman/Docker engine or network access.

use async_trait::async_trait;
use burrow_provider::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Records which methods were called on the engine mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    List { filter: String },
    Run { image: String, name: String },
    Exec { id: String, cmd: Vec<String>, env: Vec<(String, String)> },
    Remove { id: String, force: bool },
    Port { id: String, container_port: u16 },
}

/// In-memory container engine.
///
/// Fields are shared handles, so a clone kept by the test observes
/// everything the manager does with the boxed original.
#[derive(Clone)]
pub struct MockEngine {
    pub calls: Arc<Mutex<Vec<MockCall>>>,
    /// Containers currently "running"
    pub containers: Arc<Mutex<Vec<ContainerInfo>>>,
    /// Error for list calls (if Some, list returns this error)
    pub list_error: Arc<Mutex<Option<ProviderError>>>,
    /// Number of upcoming run calls rejected with a name conflict
    pub name_conflicts: Arc<Mutex<usize>>,
    /// Error for run calls (if Some, run returns this error)
    pub run_error: Arc<Mutex<Option<ProviderError>>>,
    /// Exec calls whose program matches the key fail with the error
    pub exec_failures: Arc<Mutex<HashMap<String, ProviderError>>>,
    /// Error for remove calls (if Some, remove returns this error)
    pub remove_error: Arc<Mutex<Option<ProviderError>>>,
    /// `port` output per container ID; unmapped containers report an error
    pub ports: Arc<Mutex<HashMap<String, String>>>,
    next_id: Arc<Mutex<u64>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            containers: Arc::new(Mutex::new(Vec::new())),
            list_error: Arc::new(Mutex::new(None)),
            name_conflicts: Arc::new(Mutex::new(0)),
            run_error: Arc::new(Mutex::new(None)),
            exec_failures: Arc::new(Mutex::new(HashMap::new())),
            remove_error: Arc::new(Mutex::new(None)),
            ports: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(0)),
        }
    }

    /// Add a running container directly, bypassing `run_detached`
    pub fn insert_container(&self, name: &str, labels: &[(&str, &str)]) -> ContainerId {
        let id = self.allocate_id();
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.containers
            .lock()
            .unwrap()
            .push(mock_container_info(&id, name, "mock:latest", labels));
        id
    }

    /// Publish a host port for a container
    pub fn set_port(&self, id: &ContainerId, output: &str) {
        self.ports
            .lock()
            .unwrap()
            .insert(id.0.clone(), output.to_string());
    }

    /// Make every exec of `program` fail
    pub fn fail_exec(&self, program: &str, error: ProviderError) {
        self.exec_failures
            .lock()
            .unwrap()
            .insert(program.to_string(), error);
    }

    /// Record a call
    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Get all recorded calls
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of run calls made
    pub fn run_count(&self) -> usize {
        self.get_calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Run { .. }))
            .count()
    }

    /// Exec commands in call order
    pub fn exec_commands(&self) -> Vec<Vec<String>> {
        self.get_calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Exec { cmd, .. } => Some(cmd),
                _ => None,
            })
            .collect()
    }

    fn allocate_id(&self) -> ContainerId {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        ContainerId::new(format!("{:064x}", *next))
    }

    fn has_container(&self, id: &ContainerId) -> bool {
        self.containers.lock().unwrap().iter().any(|c| &c.id == id)
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Clone a ProviderError (thiserror types don't implement Clone)
pub fn clone_provider_error(e: &ProviderError) -> ProviderError {
    match e {
        ProviderError::CommandFailed {
            program,
            code,
            stderr,
        } => ProviderError::CommandFailed {
            program: program.clone(),
            code: *code,
            stderr: stderr.clone(),
        },
        ProviderError::OutputLimitExceeded { program, limit } => {
            ProviderError::OutputLimitExceeded {
                program: program.clone(),
                limit: *limit,
            }
        }
        ProviderError::ProgramNotFound(s) => ProviderError::ProgramNotFound(s.clone()),
        ProviderError::NameConflict { name, stderr } => ProviderError::NameConflict {
            name: name.clone(),
            stderr: stderr.clone(),
        },
        ProviderError::Parse { what, detail } => ProviderError::Parse {
            what: what.clone(),
            detail: detail.clone(),
        },
        ProviderError::ConfigError(s) => ProviderError::ConfigError(s.clone()),
        ProviderError::IoError(e) => {
            ProviderError::IoError(std::io::Error::new(e.kind(), e.to_string()))
        }
    }
}

fn cloned_error(slot: &Arc<Mutex<Option<ProviderError>>>) -> Option<ProviderError> {
    slot.lock().unwrap().as_ref().map(clone_provider_error)
}

/// Engine failure shaped like a real CLI error
pub fn command_failed(program: &str, stderr: &str) -> ProviderError {
    ProviderError::CommandFailed {
        program: program.to_string(),
        code: Some(1),
        stderr: stderr.to_string(),
    }
}

/// Helper to create a ContainerInfo for tests
pub fn mock_container_info(
    id: &ContainerId,
    name: &str,
    image: &str,
    labels: HashMap<String, String>,
) -> ContainerInfo {
    ContainerInfo {
        id: id.clone(),
        name: name.to_string(),
        image: image.to_string(),
        status: "Up Less than a second".to_string(),
        created_at: Some("2024-01-01 00:00:00 +0000 UTC".to_string()),
        labels,
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn list(&self, label_filter: &str) -> Result<Vec<ContainerInfo>> {
        self.record(MockCall::List {
            filter: label_filter.to_string(),
        });
        if let Some(e) = cloned_error(&self.list_error) {
            return Err(e);
        }
        let (key, value) = label_filter.split_once('=').unwrap_or((label_filter, ""));
        Ok(self
            .containers
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.labels.get(key).is_some_and(|v| value.is_empty() || v == value))
            .cloned()
            .collect())
    }

    async fn run_detached(&self, config: &RunConfig) -> Result<ContainerId> {
        self.record(MockCall::Run {
            image: config.image.clone(),
            name: config.name.clone(),
        });

        let conflict = {
            let mut remaining = self.name_conflicts.lock().unwrap();
            let forced = *remaining > 0;
            if forced {
                *remaining -= 1;
            }
            forced
                || self
                    .containers
                    .lock()
                    .unwrap()
                    .iter()
                    .any(|c| c.name == config.name)
        };
        if conflict {
            return Err(ProviderError::NameConflict {
                name: config.name.clone(),
                stderr: format!(
                    "Error: creating container storage: the container name \"{}\" is already in use",
                    config.name
                ),
            });
        }
        if let Some(e) = cloned_error(&self.run_error) {
            return Err(e);
        }

        let id = self.allocate_id();
        let labels: BTreeMap<String, String> = config.labels.clone();
        self.containers.lock().unwrap().push(mock_container_info(
            &id,
            &config.name,
            &config.image,
            labels.into_iter().collect(),
        ));
        Ok(id)
    }

    async fn exec(&self, id: &ContainerId, config: &ExecConfig) -> Result<String> {
        self.record(MockCall::Exec {
            id: id.0.clone(),
            cmd: config.cmd.clone(),
            env: config.env.clone(),
        });
        if !self.has_container(id) {
            return Err(command_failed(
                "podman",
                &format!("Error: no container with name or ID \"{}\" found", id),
            ));
        }
        let program = config.cmd.first().map(String::as_str).unwrap_or_default();
        if let Some(e) = self.exec_failures.lock().unwrap().get(program) {
            return Err(clone_provider_error(e));
        }
        Ok(String::new())
    }

    async fn remove(&self, id: &ContainerId, force: bool) -> Result<()> {
        self.record(MockCall::Remove {
            id: id.0.clone(),
            force,
        });
        if let Some(e) = cloned_error(&self.remove_error) {
            return Err(e);
        }
        let mut containers = self.containers.lock().unwrap();
        let before = containers.len();
        containers.retain(|c| &c.id != id);
        if containers.len() == before {
            return Err(command_failed(
                "podman",
                &format!(
                    "Error: no container with ID or name \"{}\" found: no such container",
                    id
                ),
            ));
        }
        Ok(())
    }

    async fn port(&self, id: &ContainerId, container_port: u16) -> Result<String> {
        self.record(MockCall::Port {
            id: id.0.clone(),
            container_port,
        });
        match self.ports.lock().unwrap().get(&id.0) {
            Some(output) => Ok(output.clone()),
            None => Err(command_failed(
                "podman",
                &format!("Error: failed to find published port \"{}/tcp\"", container_port),
            )),
        }
    }
}

/// Records which methods were called on the git mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockGitCall {
    Clone {
        url: String,
        dest: PathBuf,
        authenticated: bool,
    },
    LsTree { paths: Vec<String> },
    Show { path: String },
}

/// Git client serving a fixed set of files at HEAD
#[derive(Clone)]
pub struct MockGit {
    pub calls: Arc<Mutex<Vec<MockGitCall>>>,
    /// Path to content of every file in the mocked repository
    pub files: Arc<Mutex<BTreeMap<String, String>>>,
    /// Error for clone calls (if Some, clone returns this error)
    pub clone_error: Arc<Mutex<Option<ProviderError>>>,
}

impl MockGit {
    /// Repository without any files
    pub fn new() -> Self {
        Self::with_files(&[])
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            files: Arc::new(Mutex::new(
                files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
            )),
            clone_error: Arc::new(Mutex::new(None)),
        }
    }

    fn record(&self, call: MockGitCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Get all recorded calls
    pub fn get_calls(&self) -> Vec<MockGitCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockGit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitClient for MockGit {
    async fn shallow_clone(&self, url: &str, dest: &Path, auth: Option<&GitAuth>) -> Result<()> {
        self.record(MockGitCall::Clone {
            url: url.to_string(),
            dest: dest.to_path_buf(),
            authenticated: auth.is_some(),
        });
        if let Some(e) = cloned_error(&self.clone_error) {
            return Err(e);
        }
        tokio::fs::create_dir_all(dest).await?;
        Ok(())
    }

    async fn ls_tree(&self, _repo: &Path, _rev: &str, paths: &[&str]) -> Result<Vec<String>> {
        self.record(MockGitCall::LsTree {
            paths: paths.iter().map(|p| p.to_string()).collect(),
        });
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|f| paths.contains(&f.as_str()))
            .cloned()
            .collect())
    }

    async fn show(&self, _repo: &Path, rev: &str, path: &str) -> Result<String> {
        self.record(MockGitCall::Show {
            path: path.to_string(),
        });
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| {
                command_failed(
                    "git",
                    &format!("fatal: path '{}' does not exist in '{}'", path, rev),
                )
            })
    }
}
