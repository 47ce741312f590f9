//! Source tree provisioning.
//!
//! Clones or fast-forwards the repositories a run depends on. Running twice
//! with no upstream change leaves the checkouts untouched.

use std::path::Path;

use anyhow::Result;

use crate::config::RuntimeConfig;
use crate::error::HarnessError;
use crate::proc::CommandSpec;
use crate::workspace::Workspace;

/// Checkout directory name for the L1 node sources.
pub const BITCOINZ_REPO: &str = "bitcoinz";
/// Checkout directory name for the L2 service and its contracts.
pub const ZOOK_REPO: &str = "zook-network";
/// Checkout directory name for the contract network sources.
pub const STACKS_REPO: &str = "stacks-core";

/// A repository the harness keeps checked out in the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    pub name: &'static str,
    pub url: String,
}

/// The repository set for this run, derived from the runtime config.
pub fn repositories(config: &RuntimeConfig) -> Vec<RepoSpec> {
    vec![
        RepoSpec {
            name: BITCOINZ_REPO,
            url: config.bitcoinz_repo_url.clone(),
        },
        RepoSpec {
            name: ZOOK_REPO,
            url: config.zook_repo_url.clone(),
        },
        RepoSpec {
            name: STACKS_REPO,
            url: config.stacks_repo_url.clone(),
        },
    ]
}

/// Clone or fast-forward every repository. A failure for any repository
/// aborts the run: a partial checkout is not a state to proceed from.
pub async fn sync_all(config: &RuntimeConfig, workspace: &Workspace) -> Result<(), HarnessError> {
    for repo in repositories(config) {
        sync_repo(&repo, workspace)
            .await
            .map_err(|source| HarnessError::Provision {
                component: repo.name.to_string(),
                source,
            })?;
    }
    Ok(())
}

/// Clone the repository if its checkout is absent, otherwise fast-forward it.
pub async fn sync_repo(repo: &RepoSpec, workspace: &Workspace) -> Result<()> {
    let path = workspace.repo_path(repo.name);
    let path_str = path.display().to_string();

    if path.join(".git").exists() {
        tracing::info!(repo = repo.name, path = %path.display(), "updating checkout");
        CommandSpec::new("git")
            .args(["-C", path_str.as_str(), "pull", "--ff-only"])
            .run_checked()
            .await?;
    } else {
        tracing::info!(repo = repo.name, url = %repo.url, "cloning");
        CommandSpec::new("git")
            .arg("clone")
            .arg(repo.url.clone())
            .arg(path_str)
            .run_checked()
            .await?;
    }

    Ok(())
}

/// The commit the checkout currently points at.
pub async fn head_commit(path: &Path) -> Result<String> {
    let path_str = path.display().to_string();
    let output = CommandSpec::new("git")
        .args(["-C", path_str.as_str(), "rev-parse", "HEAD"])
        .run_checked()
        .await?;
    Ok(output.stdout.trim().to_string())
}
