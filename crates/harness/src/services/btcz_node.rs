//! BitcoinZ L1 node service.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::RuntimeConfig;
use crate::probe::{ProbeTarget, ReadinessProbe};
use crate::proc::CommandSpec;
use crate::provision::BITCOINZ_REPO;
use crate::rpc::RpcAuth;
use crate::supervisor::{ComponentKind, ComponentSpec};
use crate::workspace::Workspace;

/// Component name in the supervisor's graph.
pub const COMPONENT: &str = "btcz-node";

/// Default daemon binary, resolved on the PATH.
pub const DEFAULT_BINARY: &str = "bitcoind";

/// Configuration for the L1 node process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtczNodeConfig {
    /// Daemon binary to launch; may be an absolute path to a local build.
    pub binary: String,
}

impl Default for BtczNodeConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
        }
    }
}

impl BtczNodeConfig {
    /// Build the supervisor descriptor for the L1 node.
    ///
    /// Readiness is the node answering `getblockcount` over RPC, not the
    /// process merely existing.
    pub fn component_spec(
        &self,
        config: &RuntimeConfig,
        workspace: &Workspace,
    ) -> Result<ComponentSpec> {
        let repo = workspace.repo_path(BITCOINZ_REPO);
        let conf_path = repo.join("bitcoinz.conf");

        let command = CommandSpec::new(&self.binary)
            .arg(format!("-conf={}", conf_path.display()))
            .arg(format!("-datadir={}", repo.display()));

        let probe = ReadinessProbe::new(
            ProbeTarget::JsonRpc {
                url: config.btcz_rpc_url()?,
                method: "getblockcount",
                auth: Some(RpcAuth {
                    user: config.rpc_user.clone(),
                    password: config.rpc_password.clone(),
                }),
            },
            config.poll_interval(),
            config.startup_timeout(),
        );

        Ok(ComponentSpec {
            name: COMPONENT,
            command,
            kind: ComponentKind::Service { probe },
            depends_on: &[],
        })
    }
}
