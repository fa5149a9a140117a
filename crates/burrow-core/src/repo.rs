//! Repository references: short names and clone locations

use crate::{CoreError, Result};
use url::Url;

/// Longest directory name used for a cloned repository
const MAX_DIR_NAME_LEN: usize = 80;

/// A validated repository to clone into a new container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub url: String,
    /// Sanitized directory name derived from the URL
    pub dir_name: String,
}

impl RepoTarget {
    /// Validate a repository URL and derive its directory name
    pub fn parse(repo_url: &str) -> Result<Self> {
        let url = repo_url.trim();
        let dir_name = repo_short_name(url)
            .and_then(|name| sanitize_dir_name(&name))
            .ok_or_else(|| CoreError::InvalidRepoUrl(url.to_string()))?;
        Ok(Self {
            url: url.to_string(),
            dir_name,
        })
    }

    /// Absolute path of the clone inside the container
    pub fn clone_path(&self, user: &str) -> String {
        format!("{}/{}", workspace_dir(user), self.dir_name)
    }
}

/// Directory holding cloned repositories for `user`
pub fn workspace_dir(user: &str) -> String {
    format!("/home/{}/workspace", user)
}

/// Short name of a repository: the last non-empty path segment of an
/// http(s) URL or SCP-style reference, without a trailing `.git`.
pub fn repo_short_name(repo_url: &str) -> Option<String> {
    let raw = repo_url.trim();
    if raw.is_empty() {
        return None;
    }

    let last_segment = if raw.starts_with("http://") || raw.starts_with("https://") {
        let url = Url::parse(raw).ok()?;
        let segment = url
            .path_segments()?
            .filter(|s| !s.is_empty())
            .last()
            .map(ToString::to_string);
        segment
    } else {
        let without_query = raw.split('?').next().unwrap_or("").trim_end_matches('/');
        let path = match without_query.split_once(':') {
            Some((_, rest)) => rest,
            None => without_query,
        };
        path.split('/')
            .filter(|s| !s.is_empty())
            .last()
            .map(ToString::to_string)
    }?;

    let name = strip_git_suffix(&last_segment);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Remove one trailing `.git`, ignoring case
pub fn strip_git_suffix(name: &str) -> &str {
    let split = name.len().saturating_sub(4);
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(suffix)) if suffix.eq_ignore_ascii_case(".git") => stem,
        _ => name,
    }
}

/// Make a short name safe to use as a directory name
pub fn sanitize_dir_name(name: &str) -> Option<String> {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .take(MAX_DIR_NAME_LEN)
        .collect();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        None
    } else {
        Some(sanitized)
    }
}
