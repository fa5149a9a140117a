//! Git client used to inspect remote repositories without a full checkout

use crate::{CommandRunner, CommandSpec, GitClient, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;

/// Access token for HTTPS git remotes.
///
/// Sent as a basic-auth `http.extraheader` on the command line of a single
/// git invocation; it is never written to a git config file or exported
/// through the environment.
#[derive(Clone)]
pub struct GitAuth {
    token: String,
}

impl GitAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Value for `git -c`
    pub fn header_config(&self) -> String {
        let credentials = STANDARD.encode(format!("x-access-token:{}", self.token));
        format!("http.extraheader=AUTHORIZATION: basic {}", credentials)
    }

    /// `-c <header>` arguments to place before the git subcommand
    pub fn git_args(&self) -> [String; 2] {
        ["-c".to_string(), self.header_config()]
    }
}

impl std::fmt::Debug for GitAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitAuth").field("token", &"<redacted>").finish()
    }
}

/// Git client driving the `git` executable
pub struct CliGit {
    program: String,
    runner: CommandRunner,
}

impl CliGit {
    pub fn new(program: impl Into<String>, runner: CommandRunner) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.program).env("GIT_TERMINAL_PROMPT", "0")
    }
}

#[async_trait]
impl GitClient for CliGit {
    async fn shallow_clone(&self, url: &str, dest: &Path, auth: Option<&GitAuth>) -> Result<()> {
        let mut spec = self.command();
        if let Some(auth) = auth {
            spec = spec.args(auth.git_args());
        }
        spec = spec
            .args(["clone", "--depth", "1", "--", url])
            .arg(dest.to_string_lossy().to_string());
        if let Some(parent) = dest.parent() {
            spec = spec.current_dir(parent);
        }
        self.runner.run(&spec).await?;
        Ok(())
    }

    async fn ls_tree(&self, repo: &Path, rev: &str, paths: &[&str]) -> Result<Vec<String>> {
        let spec = self
            .command()
            .arg("-C")
            .arg(repo.to_string_lossy().to_string())
            .args(["ls-tree", "-r", "--name-only", rev, "--"])
            .args(paths.iter().copied());
        let output = self.runner.run(&spec).await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    async fn show(&self, repo: &Path, rev: &str, path: &str) -> Result<String> {
        let object = format!("{}:{}", rev, path);
        let spec = self
            .command()
            .arg("-C")
            .arg(repo.to_string_lossy().to_string())
            .args(["show", object.as_str()]);
        self.runner.run(&spec).await
    }
}
