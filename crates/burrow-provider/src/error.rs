//! Error types for engine and git invocations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{program} exited with {}: {stderr}", exit_code_text(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} produced more than {limit} bytes of output")]
    OutputLimitExceeded { program: String, limit: usize },

    #[error("{0} is not installed or not on PATH")]
    ProgramNotFound(String),

    #[error("Container name already in use: {name}")]
    NameConflict { name: String, stderr: String },

    #[error("Failed to parse {what}: {detail}")]
    Parse { what: String, detail: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProviderError {
    /// Raw diagnostic output from the failed command, if any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stderr, .. } | Self::NameConflict { stderr, .. } => {
                Some(stderr.as_str())
            }
            _ => None,
        }
    }
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (killed by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
