//! Base image selection from a repository's devcontainer.json
//!
//! The repository is cloned shallowly into a throwaway directory and only
//! the devcontainer.json blob is read from the object store. Any failure
//! means "use the default image", never a failed creation.

use crate::Result;
use burrow_config::{DevContainerConfig, DEVCONTAINER_PATHS};
use burrow_provider::{GitAuth, GitClient};

/// Image declared by the repository's devcontainer.json, if any
pub async fn resolve_image(
    git: &dyn GitClient,
    repo_url: &str,
    auth: Option<&GitAuth>,
) -> Option<String> {
    match inspect_repository(git, repo_url, auth).await {
        Ok(Some(image)) => {
            tracing::info!("Using devcontainer image {} from {}", image, repo_url);
            Some(image)
        }
        Ok(None) => {
            tracing::debug!("No devcontainer image declared in {}", repo_url);
            None
        }
        Err(e) => {
            tracing::warn!("Failed to inspect devcontainer.json of {}: {}", repo_url, e);
            None
        }
    }
}

async fn inspect_repository(
    git: &dyn GitClient,
    repo_url: &str,
    auth: Option<&GitAuth>,
) -> Result<Option<String>> {
    // Removed when dropped, on every return path
    let temp = tempfile::Builder::new()
        .prefix("burrow-devcontainer-")
        .tempdir()?;
    let repo_dir = temp.path().join("repo");

    git.shallow_clone(repo_url, &repo_dir, auth).await?;

    let files = git.ls_tree(&repo_dir, "HEAD", &DEVCONTAINER_PATHS).await?;
    let Some(path) = DEVCONTAINER_PATHS
        .iter()
        .find(|candidate| files.iter().any(|f| f == *candidate))
    else {
        return Ok(None);
    };

    let content = git.show(&repo_dir, "HEAD", path).await?;
    let config = DevContainerConfig::parse(&content, path)?;
    Ok(config.image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockGit, MockGitCall};
    use burrow_provider::ProviderError;

    #[tokio::test]
    async fn test_image_from_dotted_directory() {
        let git = MockGit::with_files(&[(".devcontainer/devcontainer.json", r#"{"image": "foo:bar"}"#)]);
        let image = resolve_image(&git, "https://example.com/o/r.git", None).await;
        assert_eq!(image.as_deref(), Some("foo:bar"));
    }

    #[tokio::test]
    async fn test_dotted_directory_preferred_over_root_file() {
        let git = MockGit::with_files(&[
            ("devcontainer.json", r#"{"image": "root:1"}"#),
            (".devcontainer/devcontainer.json", r#"{"image": "dotted:1"}"#),
        ]);
        let image = resolve_image(&git, "https://example.com/o/r", None).await;
        assert_eq!(image.as_deref(), Some("dotted:1"));
    }

    #[tokio::test]
    async fn test_root_file_used_when_alone() {
        let git = MockGit::with_files(&[("devcontainer.json", "{\n // base\n \"image\": \"root:2\"\n}")]);
        let image = resolve_image(&git, "https://example.com/o/r", None).await;
        assert_eq!(image.as_deref(), Some("root:2"));
    }

    #[tokio::test]
    async fn test_no_config_file() {
        let git = MockGit::with_files(&[("README.md", "hello")]);
        assert_eq!(resolve_image(&git, "https://example.com/o/r", None).await, None);
        assert!(!git
            .get_calls()
            .iter()
            .any(|c| matches!(c, MockGitCall::Show { .. })));
    }

    #[tokio::test]
    async fn test_malformed_config_falls_back() {
        let git = MockGit::with_files(&[(".devcontainer/devcontainer.json", "{ image: nope")]);
        assert_eq!(resolve_image(&git, "https://example.com/o/r", None).await, None);
    }

    #[tokio::test]
    async fn test_clone_failure_falls_back() {
        let git = MockGit::with_files(&[(".devcontainer/devcontainer.json", r#"{"image": "x"}"#)]);
        *git.clone_error.lock().unwrap() = Some(ProviderError::CommandFailed {
            program: "git".into(),
            code: Some(128),
            stderr: "fatal: repository not found".into(),
        });
        assert_eq!(resolve_image(&git, "https://example.com/o/r", None).await, None);
    }

    #[tokio::test]
    async fn test_auth_passed_to_clone_and_temp_dir_removed() {
        let git = MockGit::with_files(&[(".devcontainer/devcontainer.json", r#"{"image": "x:1"}"#)]);
        let auth = GitAuth::new("tok");
        resolve_image(&git, "https://example.com/o/r", Some(&auth)).await;

        let clone = git
            .get_calls()
            .into_iter()
            .find_map(|c| match c {
                MockGitCall::Clone { dest, authenticated, .. } => Some((dest, authenticated)),
                _ => None,
            })
            .unwrap();
        assert!(clone.1);
        let temp_root = clone.0.parent().unwrap().to_path_buf();
        assert!(temp_root
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("burrow-devcontainer-"));
        assert!(!temp_root.exists(), "temporary directory should be removed");
    }

    #[tokio::test]
    async fn test_temp_dir_removed_after_failure() {
        let git = MockGit::with_files(&[(".devcontainer/devcontainer.json", "not json")]);
        resolve_image(&git, "https://example.com/o/r", None).await;
        let dest = git
            .get_calls()
            .into_iter()
            .find_map(|c| match c {
                MockGitCall::Clone { dest, .. } => Some(dest),
                _ => None,
            })
            .unwrap();
        assert!(!dest.parent().unwrap().exists());
    }
}
