//! Core logic for burrow container lifecycle management
//!
//! This crate provides:
//! - Collision-free container names and random login passwords
//! - Base image selection from a repository's devcontainer.json
//! - Container launch with a self-configuring SSH daemon
//! - Repository provisioning with rollback on failure
//! - SSH endpoint and VS Code deep-link resolution

pub mod endpoint;
mod error;
pub mod image;
pub mod labels;
mod manager;
pub mod naming;
pub mod repo;
pub mod ssh;

pub use endpoint::SshEndpoint;
pub use error::*;
pub use labels::ManagedLabels;
pub use manager::*;
pub use repo::RepoTarget;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
