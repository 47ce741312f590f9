//! Runtime configuration for a harness run.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::HarnessError;

/// The default name for the harness configuration file.
pub const ZOOKNET_CONF_FILENAME: &str = "Zooknet.toml";

/// Environment variable prefix recognized when loading [`RuntimeConfig`].
pub const ENV_PREFIX: &str = "ZOOKNET_";

/// Network the stack is provisioned for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Regtest,
}

/// The single source of truth for variable parameters.
///
/// Every generated config artifact is a deterministic projection of this
/// structure. It is validated once at harness start and never mutated after
/// config materialization, so what was written to disk is exactly what the
/// supervisor and verifier assume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub network: Network,
    pub rpc_user: String,
    pub rpc_password: String,
    /// RPC port the L1 node binds.
    pub btcz_rpc_port: u16,
    /// HTTP port the L2 bridge API binds.
    pub zook_api_port: u16,
    /// RPC port of the contract network consumed by the deploy toolchain.
    pub stacks_rpc_port: u16,
    pub bitcoinz_repo_url: String,
    pub zook_repo_url: String,
    pub stacks_repo_url: String,
    /// Readiness poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Ceiling timeout for each component to become ready, in seconds.
    pub startup_timeout_secs: u64,
    /// Extra environment injected into every supervised process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_env: BTreeMap<String, String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            rpc_user: "zookrpcuser".to_string(),
            rpc_password: "StrongPassword123".to_string(),
            btcz_rpc_port: 8232,
            zook_api_port: 3030,
            stacks_rpc_port: 20443,
            bitcoinz_repo_url: "https://github.com/btcz/bitcoinz.git".to_string(),
            zook_repo_url: "https://github.com/jeelybeely/Zook-Network.git".to_string(),
            stacks_repo_url: "https://github.com/stacks-network/stacks-core.git".to_string(),
            poll_interval_ms: 2_000,
            startup_timeout_secs: 120,
            extra_env: BTreeMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Load the configuration by layering defaults, an optional TOML file and
    /// `ZOOKNET_`-prefixed environment variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_path {
            if !path.exists() {
                anyhow::bail!("configuration file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        } else {
            figment = figment.merge(Toml::file(ZOOKNET_CONF_FILENAME));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .context("failed to load runtime configuration")
    }

    /// RPC endpoint of the L1 node.
    pub fn btcz_rpc_url(&self) -> Result<Url> {
        local_url(self.btcz_rpc_port)
    }

    /// HTTP endpoint of the L2 bridge API.
    pub fn zook_api_url(&self) -> Result<Url> {
        local_url(self.zook_api_port)
    }

    /// RPC endpoint of the contract network.
    pub fn stacks_rpc_url(&self) -> Result<Url> {
        local_url(self.stacks_rpc_port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    /// Reject configurations that cannot produce a working stack.
    ///
    /// Ports are shared read-only state for the whole run; two components
    /// binding the same port would deterministically fail with "address in
    /// use" long after provisioning has mutated the workspace.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let ports = [self.btcz_rpc_port, self.zook_api_port, self.stacks_rpc_port];
        for (i, port) in ports.iter().enumerate() {
            if ports[i + 1..].contains(port) {
                return Err(HarnessError::InvalidConfig {
                    reason: format!("port {port} is assigned to more than one component"),
                });
            }
        }

        if self.rpc_user.is_empty() || self.rpc_password.is_empty() {
            return Err(HarnessError::InvalidConfig {
                reason: "rpc_user and rpc_password must be non-empty".to_string(),
            });
        }

        Ok(())
    }
}

fn local_url(port: u16) -> Result<Url> {
    Url::parse(&format!("http://127.0.0.1:{port}/")).context("failed to build endpoint URL")
}

/// Parse `KEY=value` lines from an env-file.
///
/// Lines starting with `#` and blank lines are ignored; values may contain
/// `=`. Later entries win over earlier ones.
pub fn parse_env_file(contents: &str) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            env.insert(key.trim().to_string(), value.trim().to_string());
        } else {
            tracing::warn!(line, "ignoring malformed env-file line");
        }
    }
    env
}

/// Load an env-file, returning an empty map when the file does not exist.
pub fn load_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no env-file present");
        return Ok(BTreeMap::new());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read env-file {}", path.display()))?;
    let env = parse_env_file(&contents);
    tracing::info!(path = %path.display(), entries = env.len(), "loaded env-file");
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.btcz_rpc_port, 8232);
        assert_eq!(config.zook_api_port, 3030);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.zook_api_url().unwrap().as_str(),
            "http://127.0.0.1:3030/"
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_ports() {
        let config = RuntimeConfig {
            zook_api_port: 8232,
            ..RuntimeConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, HarnessError::InvalidConfig { .. }));
        assert!(err.to_string().contains("8232"));
    }

    #[test]
    fn test_validate_rejects_empty_credentials() {
        let config = RuntimeConfig {
            rpc_password: String::new(),
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_file() {
        let parsed = parse_env_file(
            "# bridge credentials\n\
             \n\
             BRIDGE_API_KEY=abc=def\n\
             ZOOK_LOG = debug \n\
             not-a-pair\n",
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["BRIDGE_API_KEY"], "abc=def");
        assert_eq!(parsed["ZOOK_LOG"], "debug");
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = RuntimeConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: RuntimeConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
