//! Config artifact generation.
//!
//! Each artifact is a pure projection of [`RuntimeConfig`]: the same config
//! always renders byte-identical text. Writes default to write-if-absent so
//! a user's manual edits survive reruns.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::{Network, RuntimeConfig};
use crate::error::HarnessError;
use crate::provision::{BITCOINZ_REPO, STACKS_REPO, ZOOK_REPO};
use crate::workspace::Workspace;

/// Whether materialization may replace artifacts already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    #[default]
    WriteIfAbsent,
    Overwrite,
}

/// A rendered config artifact and its workspace-relative destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub component: &'static str,
    pub rel_path: &'static str,
    pub contents: String,
}

/// The `.conf` file consumed by the L1 node.
pub fn render_btcz_conf(config: &RuntimeConfig) -> String {
    let network_flag = match config.network {
        Network::Testnet => "testnet=1",
        Network::Regtest => "regtest=1",
    };
    format!(
        "{network_flag}\n\
         rpcuser={user}\n\
         rpcpassword={password}\n\
         rpcallowip=127.0.0.1\n\
         rpcport={port}\n\
         server=1\n\
         txindex=1\n",
        user = config.rpc_user,
        password = config.rpc_password,
        port = config.btcz_rpc_port,
    )
}

#[derive(Serialize)]
struct ZookNetworkConfig {
    rpc_port: u16,
    network: Network,
    btcz_rpc: String,
    stx_rpc: String,
}

/// The JSON file consumed by the L2 service.
pub fn render_zook_config(config: &RuntimeConfig) -> Result<String> {
    let rendered = serde_json::to_string_pretty(&ZookNetworkConfig {
        rpc_port: config.zook_api_port,
        network: config.network,
        btcz_rpc: config.btcz_rpc_url()?.to_string(),
        stx_rpc: config.stacks_rpc_url()?.to_string(),
    })
    .context("failed to render L2 network config")?;
    Ok(rendered + "\n")
}

#[derive(Serialize)]
struct StacksNodeFile {
    node: StacksNodeSection,
}

#[derive(Serialize)]
struct StacksNodeSection {
    rpc_bind: String,
    bootstrap_node: bool,
    miner: bool,
}

/// The TOML file consumed by the contract network.
pub fn render_stacks_config(config: &RuntimeConfig) -> Result<String> {
    toml::to_string_pretty(&StacksNodeFile {
        node: StacksNodeSection {
            rpc_bind: format!("0.0.0.0:{}", config.stacks_rpc_port),
            bootstrap_node: true,
            miner: false,
        },
    })
    .context("failed to render contract network config")
}

/// All artifacts for one run, in a fixed order.
pub fn artifacts(config: &RuntimeConfig) -> Result<Vec<Artifact>> {
    Ok(vec![
        Artifact {
            component: BITCOINZ_REPO,
            rel_path: "bitcoinz/bitcoinz.conf",
            contents: render_btcz_conf(config),
        },
        Artifact {
            component: ZOOK_REPO,
            rel_path: "zook-network/config/testnet.json",
            contents: render_zook_config(config)?,
        },
        Artifact {
            component: STACKS_REPO,
            rel_path: "stacks-core/config/testnet.toml",
            contents: render_stacks_config(config)?,
        },
    ])
}

/// Write every artifact under the workspace, honoring the write policy.
///
/// Returns the paths actually written.
pub fn write_all(
    config: &RuntimeConfig,
    workspace: &Workspace,
    policy: WritePolicy,
) -> Result<Vec<PathBuf>, HarnessError> {
    let artifacts = artifacts(config).map_err(|source| HarnessError::ConfigWrite {
        path: workspace.root().to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();
    for artifact in artifacts {
        let path = workspace.root().join(artifact.rel_path);

        if path.exists() && policy == WritePolicy::WriteIfAbsent {
            tracing::info!(
                component = artifact.component,
                path = %path.display(),
                "config already present, leaving untouched"
            );
            continue;
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| HarnessError::ConfigWrite {
                path: path.clone(),
                source: anyhow::Error::new(err).context("failed to create parent directory"),
            })?;
        }

        std::fs::write(&path, &artifact.contents).map_err(|err| HarnessError::ConfigWrite {
            path: path.clone(),
            source: err.into(),
        })?;

        tracing::info!(
            component = artifact.component,
            path = %path.display(),
            "config artifact written"
        );
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;
    use crate::workspace::WorkspaceRoot;

    fn test_workspace() -> (TempDir, Workspace) {
        let dir = TempDir::new("zooknet-materialize").unwrap();
        let workspace = Workspace::open(WorkspaceRoot::Path(dir.path().to_path_buf())).unwrap();
        (dir, workspace)
    }

    #[test]
    fn test_btcz_conf_projects_runtime_config() {
        let config = RuntimeConfig::default();
        let conf = render_btcz_conf(&config);
        assert!(conf.contains("testnet=1"));
        assert!(conf.contains("rpcuser=zookrpcuser"));
        assert!(conf.contains("rpcport=8232"));
        assert!(conf.contains("txindex=1"));

        let regtest = RuntimeConfig {
            network: Network::Regtest,
            ..config
        };
        assert!(render_btcz_conf(&regtest).contains("regtest=1"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let config = RuntimeConfig::default();
        let first = artifacts(&config).unwrap();
        let second = artifacts(&config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zook_config_is_valid_json() {
        let config = RuntimeConfig::default();
        let rendered = render_zook_config(&config).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["rpc_port"], 3030);
        assert_eq!(parsed["network"], "testnet");
        assert_eq!(parsed["btcz_rpc"], "http://127.0.0.1:8232/");
    }

    #[test]
    fn test_stacks_config_is_valid_toml() {
        let config = RuntimeConfig::default();
        let rendered = render_stacks_config(&config).unwrap();
        let parsed: toml::Value = rendered.parse().unwrap();
        assert_eq!(
            parsed["node"]["rpc_bind"].as_str(),
            Some("0.0.0.0:20443")
        );
        assert_eq!(parsed["node"]["miner"].as_bool(), Some(false));
    }

    #[test]
    fn test_write_all_creates_parent_directories() {
        let (_dir, workspace) = test_workspace();
        let config = RuntimeConfig::default();

        let written = write_all(&config, &workspace, WritePolicy::WriteIfAbsent).unwrap();
        assert_eq!(written.len(), 3);
        assert!(workspace.root().join("zook-network/config/testnet.json").is_file());
    }

    #[test]
    fn test_write_if_absent_preserves_manual_edits() {
        let (_dir, workspace) = test_workspace();
        let config = RuntimeConfig::default();
        let conf_path = workspace.root().join("bitcoinz/bitcoinz.conf");

        std::fs::create_dir_all(conf_path.parent().unwrap()).unwrap();
        std::fs::write(&conf_path, "# hand-tuned\n").unwrap();

        write_all(&config, &workspace, WritePolicy::WriteIfAbsent).unwrap();
        assert_eq!(
            std::fs::read_to_string(&conf_path).unwrap(),
            "# hand-tuned\n"
        );

        write_all(&config, &workspace, WritePolicy::Overwrite).unwrap();
        assert!(std::fs::read_to_string(&conf_path)
            .unwrap()
            .contains("rpcuser=zookrpcuser"));
    }
}
