//! Workspace directory owning cloned sources and generated config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempdir::TempDir;

/// Specifies where the workspace root should live.
#[derive(Debug, Clone)]
pub enum WorkspaceRoot {
    /// A throwaway directory removed when the harness exits.
    TempDir,
    /// A specific path, created if needed and left in place.
    Path(PathBuf),
}

/// Root directory for one harness run.
///
/// Cloned repositories and materialized config artifacts live underneath it.
/// A workspace is never shared across concurrent runs.
pub struct Workspace {
    root: PathBuf,
    // Kept alive so a temp workspace is removed on drop.
    _temp: Option<TempDir>,
}

impl Workspace {
    /// Create or reuse the workspace root directory.
    pub fn open(spec: WorkspaceRoot) -> Result<Self> {
        match spec {
            WorkspaceRoot::TempDir => {
                let temp = TempDir::new("zooknet").context("failed to create temp workspace")?;
                let root = temp.path().to_path_buf();
                tracing::info!(root = %root.display(), "using temporary workspace");
                Ok(Self {
                    root,
                    _temp: Some(temp),
                })
            }
            WorkspaceRoot::Path(root) => {
                std::fs::create_dir_all(&root).with_context(|| {
                    format!("failed to create workspace root {}", root.display())
                })?;
                tracing::info!(root = %root.display(), "using workspace");
                Ok(Self { root, _temp: None })
            }
        }
    }

    /// Default workspace root under the user's home directory.
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("zook-testnet")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local checkout path for a named repository.
    pub fn repo_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_path_creates_root() {
        let base = TempDir::new("zooknet-test").unwrap();
        let root = base.path().join("nested/workspace");
        let workspace = Workspace::open(WorkspaceRoot::Path(root.clone())).unwrap();
        assert!(root.is_dir());
        assert_eq!(workspace.repo_path("bitcoinz"), root.join("bitcoinz"));
    }

    #[test]
    fn test_temp_workspace_is_removed_on_drop() {
        let root = {
            let workspace = Workspace::open(WorkspaceRoot::TempDir).unwrap();
            assert!(workspace.root().is_dir());
            workspace.root().to_path_buf()
        };
        assert!(!root.exists());
    }
}
