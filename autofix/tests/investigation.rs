//! Investigation tests for external CLI behavior.
//!
//! These tests exercise the real Vercel and Codex CLIs and are excluded from
//! regular runs because they need installed tools, a linked Vercel project,
//! and credentials.
//!
//! Run from a linked repository with:
//!
//! ```bash
//! REPO_PATH=/path/to/app cargo test -p autofix --test investigation -- --ignored
//! ```

use std::path::PathBuf;
use std::process::Command;

use autofix::core::deployments::parse_deployment_list;
use autofix::io::config::{AutofixConfig, resolve_config};
use autofix::io::git::Git;
use autofix::io::vercel::{DeploymentPlatform, VercelCli};
use autofix::locate::fetch_build_logs;

fn linked_config() -> AutofixConfig {
    resolve_config(&PathBuf::from("autofix.toml"), |key| std::env::var(key).ok())
        .expect("REPO_PATH must point at a Vercel-linked repository")
}

/// Verifies that the Vercel CLI is available in PATH.
#[test]
#[ignore]
fn vercel_cli_available() {
    let output = Command::new("vercel")
        .arg("--version")
        .output()
        .expect("vercel not in PATH - install with: npm install -g vercel");
    assert!(output.status.success());
    println!(
        "Vercel CLI version: {}{}",
        String::from_utf8_lossy(&output.stdout).trim(),
        String::from_utf8_lossy(&output.stderr).trim()
    );
}

/// Verifies that the real listing table yields at least one candidate.
#[test]
#[ignore]
fn listing_parses_into_candidates() {
    let config = linked_config();
    let platform = VercelCli::from_config(&config);
    let listing = platform.list_deployments().expect("vercel list");
    assert!(listing.success(), "vercel list failed: {}", listing.describe());
    let candidates = parse_deployment_list(&listing.stdout);
    println!("candidates: {candidates:#?}");
    assert!(!candidates.is_empty());
}

/// Fetches build logs for HEAD. Prints them; asserts nothing about the verdict.
#[test]
#[ignore]
fn build_logs_for_head() {
    let config = linked_config();
    let platform = VercelCli::from_config(&config);
    let git = Git::new(&config.repo_path);
    match fetch_build_logs(&platform, &git).expect("fetch build logs") {
        Some(logs) => println!("{}:\n{}", logs.deployment.id, logs.text),
        None => println!("no deployment for HEAD yet"),
    }
}

/// Verifies that the Codex CLI is available in PATH.
#[test]
#[ignore]
fn codex_cli_available() {
    let output = Command::new("codex")
        .arg("--version")
        .output()
        .expect("codex not in PATH");
    assert!(
        output.status.success(),
        "codex --version failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
