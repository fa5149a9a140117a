//! Container labels: the only place burrow persists anything
//!
//! Labels are written and read through [`ManagedLabels`], a typed record
//! whose serde field names are the label keys.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Label marking containers owned by burrow
pub const MANAGED_LABEL: &str = "burrow.managed";

/// `key=value` filter selecting managed containers
pub const MANAGED_FILTER: &str = "burrow.managed=true";

/// Metadata attached to every managed container at launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedLabels {
    #[serde(rename = "burrow.ssh_password")]
    pub ssh_password: String,

    /// Empty when the label is missing
    #[serde(rename = "burrow.ssh_name", default)]
    pub ssh_name: String,

    #[serde(
        rename = "burrow.repo_url",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub repo_url: Option<String>,

    /// Absolute clone path inside the container
    #[serde(
        rename = "burrow.repo_path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub repo_path: Option<String>,
}

impl ManagedLabels {
    /// Encode as engine labels, including the ownership label
    pub fn to_labels(&self) -> serde_json::Result<BTreeMap<String, String>> {
        let value = serde_json::to_value(self)?;
        let mut labels: BTreeMap<String, String> = serde_json::from_value(value)?;
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
        Ok(labels)
    }

    /// Decode from engine labels; unrelated labels are ignored
    pub fn from_labels(labels: &HashMap<String, String>) -> serde_json::Result<Self> {
        serde_json::from_value(serde_json::to_value(labels)?)
    }
}
