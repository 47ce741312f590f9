use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// Where the workspace root should live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum WorkspaceArg {
    TempDir,
    #[strum(default)]
    Path(String),
}

#[derive(Parser)]
#[command(name = "zooknet")]
#[command(
    author,
    version,
    about = "Provision and verify a local two-layer BitcoinZ + Zook testnet"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "ZOOKNET_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Workspace root owning cloned sources and generated config.
    ///
    /// `temp-dir` provisions into a throwaway directory; defaults to
    /// ~/zook-testnet.
    #[arg(short, long, env = "ZOOKNET_WORKSPACE")]
    pub workspace: Option<WorkspaceArg>,

    /// Path to a Zooknet.toml runtime configuration file.
    #[arg(long, alias = "conf", env = "ZOOKNET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Env-file loaded into every supervised component's environment.
    ///
    /// Defaults to <workspace>/zook-network/testnet.env when present.
    #[arg(long, env = "ZOOKNET_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Replace config artifacts that already exist on disk.
    ///
    /// By default existing files are left untouched so manual edits
    /// survive reruns.
    #[arg(long, env = "ZOOKNET_OVERWRITE_CONFIGS", default_value_t = false)]
    pub overwrite_configs: bool,

    /// Fail on missing tools instead of installing them.
    ///
    /// Automatic installation changes the software installed on this
    /// machine and cannot be undone by the harness.
    #[arg(long, env = "ZOOKNET_CHECK_ONLY", default_value_t = false)]
    pub check_only_toolchain: bool,

    /// Keep the stack running after verification until Ctrl-C.
    #[arg(long, env = "ZOOKNET_KEEP_RUNNING", default_value_t = false)]
    pub keep_running: bool,

    /// Write the effective runtime configuration to Zooknet.toml in the
    /// workspace before running.
    #[arg(long, env = "ZOOKNET_SAVE_CONFIG", default_value_t = false)]
    pub save_config: bool,
}
