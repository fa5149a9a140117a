//! Running external programs with captured, size-capped output
//!
//! Both the container engine and git are driven through [`CommandRunner`], so
//! failure reporting and output limits behave the same for every tool.

use crate::{ProviderError, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Argument prefix whose value carries a credential
const AUTH_HEADER_ARG: &str = "http.extraheader=";

/// A single external command invocation
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Command line suitable for logs, with credentials redacted
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        for arg in &self.args {
            match arg.find(AUTH_HEADER_ARG) {
                Some(idx) => parts.push(format!("{}<redacted>", &arg[..idx + AUTH_HEADER_ARG.len()])),
                None => parts.push(arg.clone()),
            }
        }
        parts.join(" ")
    }
}

/// Executes [`CommandSpec`]s, capturing at most `max_output` bytes per stream
#[derive(Debug, Clone)]
pub struct CommandRunner {
    max_output: usize,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(burrow_config::DEFAULT_MAX_OUTPUT_BYTES)
    }
}

enum CaptureError {
    Io(std::io::Error),
    LimitExceeded,
}

impl CommandRunner {
    pub fn new(max_output: usize) -> Self {
        Self { max_output }
    }

    /// Run a command to completion and return its stdout.
    ///
    /// A non-zero exit yields [`ProviderError::CommandFailed`] with the
    /// captured stderr. Output beyond the cap kills the child and yields
    /// [`ProviderError::OutputLimitExceeded`].
    pub async fn run(&self, spec: &CommandSpec) -> Result<String> {
        tracing::debug!("Running: {}", spec.display());

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref cwd) = spec.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProviderError::ProgramNotFound(spec.program.clone())
            } else {
                ProviderError::IoError(e)
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProviderError::ConfigError("stdout was not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProviderError::ConfigError("stderr was not piped".to_string()))?;

        let captured = tokio::try_join!(
            read_capped(stdout, self.max_output),
            read_capped(stderr, self.max_output)
        );

        let (stdout, stderr) = match captured {
            Ok(streams) => streams,
            Err(CaptureError::LimitExceeded) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(ProviderError::OutputLimitExceeded {
                    program: spec.program.clone(),
                    limit: self.max_output,
                });
            }
            Err(CaptureError::Io(e)) => return Err(ProviderError::IoError(e)),
        };

        let status = child.wait().await?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            tracing::debug!("{} failed ({:?}): {}", spec.program, status.code(), stderr);
            return Err(ProviderError::CommandFailed {
                program: spec.program.clone(),
                code: status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&stdout).to_string())
    }
}

async fn read_capped<R>(stream: R, limit: usize) -> std::result::Result<Vec<u8>, CaptureError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    stream
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .await
        .map_err(CaptureError::Io)?;
    if buf.len() > limit {
        return Err(CaptureError::LimitExceeded);
    }
    Ok(buf)
}
