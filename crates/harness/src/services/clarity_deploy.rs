//! Clarity contract deployment step.

use serde::{Deserialize, Serialize};

use crate::config::RuntimeConfig;
use crate::proc::CommandSpec;
use crate::provision::ZOOK_REPO;
use crate::services::btcz_node;
use crate::supervisor::{ComponentKind, ComponentSpec};
use crate::workspace::Workspace;

/// Component name in the supervisor's graph.
pub const COMPONENT: &str = "clarity-deploy";

/// Default contract toolchain binary.
pub const DEFAULT_BINARY: &str = "clarinet";

/// Configuration for the one-shot contract deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarityDeployConfig {
    /// Contract toolchain binary to invoke.
    pub binary: String,
}

impl Default for ClarityDeployConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
        }
    }
}

impl ClarityDeployConfig {
    /// Build the supervisor descriptor for the deploy step.
    ///
    /// This is a terminating step: it is ready when the toolchain exits
    /// zero, failed otherwise. It runs only after the L1 node is ready.
    pub fn component_spec(&self, config: &RuntimeConfig, workspace: &Workspace) -> ComponentSpec {
        let command = CommandSpec::new(&self.binary)
            .arg("deploy")
            .arg(format!("--network={}", config.network))
            .cwd(workspace.repo_path(ZOOK_REPO));

        ComponentSpec {
            name: COMPONENT,
            command,
            kind: ComponentKind::OneShot {
                timeout: config.startup_timeout(),
            },
            depends_on: &[btcz_node::COMPONENT],
        }
    }
}
