//! Zook L2 network service.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::RuntimeConfig;
use crate::probe::{ProbeTarget, ReadinessProbe};
use crate::proc::CommandSpec;
use crate::provision::ZOOK_REPO;
use crate::services::clarity_deploy;
use crate::supervisor::{ComponentKind, ComponentSpec};
use crate::workspace::Workspace;

/// Component name in the supervisor's graph.
pub const COMPONENT: &str = "zook-node";

/// Configuration for the L2 service process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZookNodeConfig {
    /// Build tool used to run the service from its checkout.
    pub cargo: String,
    /// Run the release profile.
    pub release: bool,
}

impl Default for ZookNodeConfig {
    fn default() -> Self {
        Self {
            cargo: "cargo".to_string(),
            release: true,
        }
    }
}

impl ZookNodeConfig {
    /// Build the supervisor descriptor for the L2 service.
    ///
    /// Readiness is the bridge API answering on the governance endpoint;
    /// it starts only after the contracts are deployed.
    pub fn component_spec(
        &self,
        config: &RuntimeConfig,
        workspace: &Workspace,
    ) -> Result<ComponentSpec> {
        let mut command = CommandSpec::new(&self.cargo)
            .arg("run")
            .cwd(workspace.repo_path(ZOOK_REPO));
        if self.release {
            command = command.arg("--release");
        }

        let probe_url = config
            .zook_api_url()?
            .join("/governance/parameters")
            .context("failed to build readiness URL")?;

        let probe = ReadinessProbe::new(
            ProbeTarget::HttpGet { url: probe_url },
            config.poll_interval(),
            config.startup_timeout(),
        );

        Ok(ComponentSpec {
            name: COMPONENT,
            command,
            kind: ComponentKind::Service { probe },
            depends_on: &[clarity_deploy::COMPONENT],
        })
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;
    use crate::workspace::WorkspaceRoot;

    #[test]
    fn test_component_spec_waits_on_contract_deploy() {
        let dir = TempDir::new("zooknet-zook").unwrap();
        let workspace = Workspace::open(WorkspaceRoot::Path(dir.path().to_path_buf())).unwrap();
        let config = RuntimeConfig::default();

        let spec = ZookNodeConfig::default()
            .component_spec(&config, &workspace)
            .unwrap();

        assert_eq!(spec.command.display(), "cargo run --release");
        assert_eq!(spec.depends_on, &[clarity_deploy::COMPONENT]);
        match spec.kind {
            ComponentKind::Service { probe } => match probe.target {
                ProbeTarget::HttpGet { url } => {
                    assert_eq!(url.as_str(), "http://127.0.0.1:3030/governance/parameters")
                }
                other => panic!("unexpected probe target: {other:?}"),
            },
            other => panic!("unexpected component kind: {other:?}"),
        }
    }
}
