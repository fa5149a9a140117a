//! Fast CLI tests using assert_cmd.
//! These test the binary directly without needing a container engine.

#![allow(deprecated)] // assert_cmd::Command::cargo_bin is deprecated but works fine

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command with config lookups pointed at an empty directory
fn burrow(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("burrow").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("NO_AUTH")
        .env_remove("SSH_USER")
        .env_remove("SSH_BIND")
        .env_remove("SSH_HOST")
        .env_remove("DOMAIN_NAME")
        .env_remove("BURROW_ENGINE")
        .env_remove("BURROW_ACCESS_TOKEN");
    cmd
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SSH-accessible dev container manager"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    burrow(&home).arg("--version").assert().success();
}

#[test]
fn test_subcommand_help() {
    let home = TempDir::new().unwrap();
    for subcmd in &["list", "create", "rm", "config"] {
        burrow(&home)
            .args([subcmd, "--help"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty().not());
    }
}

#[test]
fn test_unknown_subcommand_fails() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .arg("nonexistent-subcommand")
        .assert()
        .failure();
}

#[test]
fn test_unknown_engine_rejected() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .args(["--engine", "lxc", "list"])
        .assert()
        .failure();
}

#[test]
fn test_config_shows_defaults() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("mcr.microsoft.com/devcontainers/universal:latest"))
        .stdout(predicate::str::contains("kind = \"podman\""));
}

#[test]
fn test_config_reflects_env_overrides() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .env("SSH_USER", "dev")
        .env("DOMAIN_NAME", "boxes.example.com")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("user = \"dev\""))
        .stdout(predicate::str::contains("domain = \"boxes.example.com\""));
}

#[test]
fn test_invalid_user_rejected() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .env("SSH_USER", "Robert'); rm -rf /")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ssh.user"));
}

#[test]
fn test_create_with_repo_requires_token() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .args(["create", "--repo", "https://github.com/org/project.git"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to start container"))
        .stderr(predicate::str::contains("Access token missing"));
}

#[test]
fn test_create_with_invalid_repo_fails() {
    let home = TempDir::new().unwrap();
    burrow(&home)
        .args(["create", "--repo", "https://github.com/", "--token", "tok"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid repository URL"));
}
