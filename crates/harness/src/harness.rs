//! Top-level orchestration of the pipeline stages.
//!
//! Stages run strictly in order — toolchain, provision, materialize,
//! supervise, verify — and each assumes all earlier stages succeeded. Any
//! failure aborts the run after a best-effort teardown of the processes
//! started so far; cloned sources and written config are left in place for
//! inspection and retry.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::{self, RuntimeConfig, ZOOKNET_CONF_FILENAME};
use crate::error::{HarnessError, Stage};
use crate::materialize::{self, WritePolicy};
use crate::provision::{self, ZOOK_REPO};
use crate::services::{BtczNodeConfig, ClarityDeployConfig, ZookNodeConfig};
use crate::supervisor::{ComponentSpec, Supervisor};
use crate::toolchain;
use crate::verify::BridgeVerifier;
use crate::workspace::Workspace;

/// Orchestrates one full provisioning-and-verification run.
pub struct Harness {
    pub config: RuntimeConfig,
    pub workspace: Workspace,
    pub write_policy: WritePolicy,
    /// Fail on missing tools instead of installing them.
    pub check_only_toolchain: bool,
    /// Hold the stack after verification until Ctrl-C.
    pub keep_running: bool,
    /// Env-file location; defaults to `<workspace>/zook-network/testnet.env`.
    pub env_file: Option<PathBuf>,
    pub btcz_node: BtczNodeConfig,
    pub clarity_deploy: ClarityDeployConfig,
    pub zook_node: ZookNodeConfig,
}

impl Harness {
    pub fn new(config: RuntimeConfig, workspace: Workspace) -> Self {
        Self {
            config,
            workspace,
            write_policy: WritePolicy::default(),
            check_only_toolchain: false,
            keep_running: false,
            env_file: None,
            btcz_node: BtczNodeConfig::default(),
            clarity_deploy: ClarityDeployConfig::default(),
            zook_node: ZookNodeConfig::default(),
        }
    }

    /// Write the effective runtime configuration to the workspace.
    pub fn save_config(&self) -> Result<PathBuf> {
        let path = self.workspace.root().join(ZOOKNET_CONF_FILENAME);
        let content = toml::to_string_pretty(&self.config)
            .context("failed to serialize runtime config to TOML")?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "configuration saved");
        Ok(path)
    }

    fn env_file_path(&self) -> PathBuf {
        self.env_file
            .clone()
            .unwrap_or_else(|| self.workspace.repo_path(ZOOK_REPO).join("testnet.env"))
    }

    /// The component graph in start order, with the env-file contents
    /// injected into every command's environment.
    fn component_specs(&self, extra_env: &BTreeMap<String, String>) -> Result<Vec<ComponentSpec>> {
        let mut specs = vec![
            self.btcz_node.component_spec(&self.config, &self.workspace)?,
            self.clarity_deploy.component_spec(&self.config, &self.workspace),
            self.zook_node.component_spec(&self.config, &self.workspace)?,
        ];

        for spec in &mut specs {
            spec.command = spec
                .command
                .clone()
                .envs(extra_env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Ok(specs)
    }

    /// Run every stage, returning the first failure.
    pub async fn run(&self) -> Result<(), HarnessError> {
        self.config.validate()?;

        tracing::info!(stage = %Stage::Toolchain, "resolving external toolchain");
        toolchain::resolve(toolchain::REQUIRED_TOOLS, self.check_only_toolchain).await?;

        tracing::info!(stage = %Stage::Provision, "syncing source repositories");
        provision::sync_all(&self.config, &self.workspace).await?;

        // The env-file lives inside the zook checkout, so it only becomes
        // readable after provisioning; it must be in hand before any
        // component starts.
        let mut extra_env = self.config.extra_env.clone();
        extra_env
            .extend(config::load_env_file(&self.env_file_path()).map_err(HarnessError::Setup)?);

        tracing::info!(stage = %Stage::Materialize, "materializing config artifacts");
        materialize::write_all(&self.config, &self.workspace, self.write_policy)?;

        tracing::info!(stage = %Stage::Supervise, "starting components");
        let mut supervisor = Supervisor::new().map_err(HarnessError::Setup)?;
        let specs = self
            .component_specs(&extra_env)
            .map_err(HarnessError::Setup)?;
        supervisor.start_all(specs).await?;

        tracing::info!(stage = %Stage::Verify, "running bridge verification");
        let verifier = BridgeVerifier::new(&self.config).map_err(HarnessError::Setup)?;
        if let Err(err) = verifier.run().await {
            supervisor.shutdown().await;
            return Err(err);
        }
        tracing::info!("bridge verification passed");

        if self.keep_running {
            tracing::info!("stack is up; press Ctrl-C to stop all components");
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("failed to listen for Ctrl-C, shutting down");
            }
        }

        supervisor.shutdown().await;
        Ok(())
    }
}
