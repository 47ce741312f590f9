//! zooknet bootstraps a local two-layer BitcoinZ + Zook testnet and verifies
//! its bridge end to end.

mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, WorkspaceArg};
use zooknet_harness::{
    Harness, HarnessError, RuntimeConfig, Workspace, WorkspaceRoot, WritePolicy,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger on stderr; stdout stays clean for tooling.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let stage = err.stage();
            let report = anyhow::Error::new(err);
            tracing::error!(stage = %stage, "harness failed: {report:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), HarnessError> {
    let config = RuntimeConfig::load(cli.config.as_deref()).map_err(HarnessError::Setup)?;

    let root = match cli.workspace {
        Some(WorkspaceArg::TempDir) => WorkspaceRoot::TempDir,
        Some(WorkspaceArg::Path(path)) => WorkspaceRoot::Path(PathBuf::from(path)),
        None => WorkspaceRoot::Path(Workspace::default_root()),
    };
    let workspace = Workspace::open(root).map_err(HarnessError::Setup)?;

    tracing::info!(
        workspace = %workspace.root().display(),
        network = %config.network,
        l1_rpc_port = config.btcz_rpc_port,
        l2_api_port = config.zook_api_port,
        "starting testnet harness"
    );

    let mut harness = Harness::new(config, workspace);
    harness.write_policy = if cli.overwrite_configs {
        WritePolicy::Overwrite
    } else {
        WritePolicy::WriteIfAbsent
    };
    harness.check_only_toolchain = cli.check_only_toolchain;
    harness.keep_running = cli.keep_running;
    harness.env_file = cli.env_file;

    if cli.save_config {
        harness.save_config().map_err(HarnessError::Setup)?;
    }

    harness.run().await?;

    tracing::info!("testnet setup and bridge verification completed");
    Ok(())
}
