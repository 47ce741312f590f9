//! zooknet-harness - Orchestration library for the Zook two-layer testnet.
//!
//! This crate provisions the external toolchain and source trees, materializes
//! per-component configuration, supervises the L1 node / contract deploy / L2
//! service startup graph, and drives the bridge verification protocol against
//! the running stack.

pub mod config;
pub mod error;
pub mod harness;
pub mod materialize;
pub mod probe;
pub mod proc;
pub mod provision;
pub mod rpc;
pub mod services;
pub mod supervisor;
pub mod toolchain;
pub mod verify;
pub mod workspace;

pub use config::{Network, RuntimeConfig};
pub use error::{HarnessError, Stage};
pub use harness::Harness;
pub use materialize::WritePolicy;
pub use probe::{ProbeTarget, ReadinessProbe};
pub use proc::{CommandSpec, ProcessHandle};
pub use supervisor::{ComponentKind, ComponentSpec, ComponentState, Supervisor};
pub use verify::{BridgeVerifier, VerificationStep};
pub use workspace::{Workspace, WorkspaceRoot};
