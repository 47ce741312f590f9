//! External toolchain resolution.
//!
//! Verifies that the tools the harness shells out to are on the PATH and,
//! unless disabled, installs missing ones through the platform package
//! manager. Installation mutates the software installed on the host — an
//! irreversible, possibly privileged side effect — so callers that must not
//! touch the host run with `check_only` and fail fast instead.
//!
//! There are no retries here: if an install fails, a human intervenes.

use crate::error::HarnessError;
use crate::proc::CommandSpec;

/// One required external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    /// Binary name probed on the PATH.
    pub name: &'static str,
    /// Package identifier for `winget install --id`.
    pub winget_id: Option<&'static str>,
    /// Package name for `apt-get install` / `brew install`.
    pub unix_package: Option<&'static str>,
    /// npm package installed globally, preferred over the platform manager.
    pub npm_package: Option<&'static str>,
}

/// The tools every harness run depends on, in install order: npm comes
/// before clarinet because clarinet installs through it.
pub const REQUIRED_TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "git",
        winget_id: Some("Git.Git"),
        unix_package: Some("git"),
        npm_package: None,
    },
    ToolSpec {
        name: "cargo",
        winget_id: Some("Rustlang.Rustup"),
        unix_package: Some("cargo"),
        npm_package: None,
    },
    ToolSpec {
        name: "npm",
        winget_id: Some("OpenJS.NodeJS"),
        unix_package: Some("npm"),
        npm_package: None,
    },
    ToolSpec {
        name: "clarinet",
        winget_id: None,
        unix_package: None,
        npm_package: Some("@clarigen/core"),
    },
];

/// Check that a tool answers `--version` with exit code zero.
pub async fn check_tool(name: &str) -> Result<(), anyhow::Error> {
    let output = CommandSpec::new(name).arg("--version").run_captured().await?;
    if output.status.success() {
        Ok(())
    } else {
        anyhow::bail!(
            "`{name} --version` exited with {:?}",
            output.status.code()
        )
    }
}

/// The install command for a tool on the current platform, if any.
fn install_command(tool: &ToolSpec) -> Option<CommandSpec> {
    if let Some(package) = tool.npm_package {
        return Some(CommandSpec::new("npm").args(["install", "-g", package]));
    }

    if cfg!(target_os = "linux") {
        tool.unix_package
            .map(|package| CommandSpec::new("apt-get").args(["install", "-y", package]))
    } else if cfg!(target_os = "macos") {
        tool.unix_package
            .map(|package| CommandSpec::new("brew").args(["install", package]))
    } else if cfg!(target_os = "windows") {
        tool.winget_id
            .map(|id| CommandSpec::new("winget").args(["install", "--id", id]))
    } else {
        None
    }
}

/// Ensure every required tool is present, installing missing ones unless
/// `check_only` is set.
pub async fn resolve(tools: &[ToolSpec], check_only: bool) -> Result<(), HarnessError> {
    for tool in tools {
        if check_tool(tool.name).await.is_ok() {
            tracing::debug!(tool = tool.name, "tool found");
            continue;
        }

        if check_only {
            return Err(HarnessError::MissingToolchain {
                tool: tool.name.to_string(),
                reason: "not on PATH (automatic install disabled)".to_string(),
            });
        }

        let Some(command) = install_command(tool) else {
            return Err(HarnessError::MissingToolchain {
                tool: tool.name.to_string(),
                reason: "not on PATH and no installer for this platform".to_string(),
            });
        };

        tracing::warn!(
            tool = tool.name,
            command = %command.display(),
            "tool missing, installing via package manager"
        );

        let output = command
            .run_captured()
            .await
            .map_err(|err| HarnessError::MissingToolchain {
                tool: tool.name.to_string(),
                reason: format!("install command could not run: {err:#}"),
            })?;

        if !output.status.success() {
            return Err(HarnessError::MissingToolchain {
                tool: tool.name.to_string(),
                reason: format!(
                    "install command exited with {:?}: {}",
                    output.status.code(),
                    output.stderr_tail(4)
                ),
            });
        }

        check_tool(tool.name)
            .await
            .map_err(|err| HarnessError::MissingToolchain {
                tool: tool.name.to_string(),
                reason: format!("still unavailable after install: {err:#}"),
            })?;

        tracing::info!(tool = tool.name, "tool installed");
    }

    Ok(())
}
