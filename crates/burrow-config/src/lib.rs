//! Configuration parsing for burrow
//!
//! This crate handles parsing of:
//! - Global configuration (`~/.config/burrow/config.toml` plus environment overrides)
//! - devcontainer.json files (JSON with comments)

mod devcontainer;
mod error;
mod global;

pub use devcontainer::*;
pub use error::*;
pub use global::*;
