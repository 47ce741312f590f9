//! Service modules for the testnet components.
//!
//! Each module owns the config and component descriptor for one managed
//! process. The startup graph is fixed:
//! btcz-node -> clarity-deploy -> zook-node.

pub mod btcz_node;
pub mod clarity_deploy;
pub mod zook_node;

pub use btcz_node::BtczNodeConfig;
pub use clarity_deploy::ClarityDeployConfig;
pub use zook_node::ZookNodeConfig;
