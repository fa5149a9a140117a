//! Error types for burrow-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] burrow_config::ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] burrow_provider::ProviderError),

    #[error("Invalid repository URL: {0}")]
    InvalidRepoUrl(String),

    #[error("Access token missing for repository access")]
    MissingAccessToken,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether the caller's request was at fault (nothing was changed)
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidRepoUrl(_) | Self::MissingAccessToken)
    }

    /// Raw diagnostic text from the failing external command, if any
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Provider(e) => e.stderr().filter(|s| !s.is_empty()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
