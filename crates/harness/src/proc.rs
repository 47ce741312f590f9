//! Process invocation primitives.
//!
//! Every external command the harness runs goes through [`CommandSpec`]:
//! explicit program, arguments, working directory and environment, with the
//! exit status and output captured for diagnostics. No shell interpolation.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::process::{Child, Command};

/// Fully explicit description of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn envs(
        mut self,
        envs: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.envs
            .extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Render the command line for logs and error messages.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run to completion, capturing exit status, stdout and stderr.
    pub async fn run_captured(&self) -> Result<CommandOutput> {
        let output = self
            .build()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to run `{}`", self.display()))?;

        Ok(CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run to completion and fail on a non-zero exit status.
    pub async fn run_checked(&self) -> Result<CommandOutput> {
        let output = self.run_captured().await?;
        if !output.status.success() {
            anyhow::bail!(
                "`{}` exited with {}: {}",
                self.display(),
                describe_status(output.status),
                output.stderr_tail(8)
            );
        }
        Ok(output)
    }

    /// Spawn as a long-running process owned by the returned handle.
    pub fn spawn(&self, component: &str) -> Result<ProcessHandle> {
        let child = self
            .build()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.display()))?;

        Ok(ProcessHandle {
            component: component.to_string(),
            pid: child.id(),
            started_at: Utc::now(),
            child,
        })
    }
}

/// Captured result of a completed command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// The last `lines` lines of stderr, for compact error reports.
    pub fn stderr_tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.stderr.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Runtime record for a spawned component process.
///
/// Owned exclusively by the supervisor; dropping it (or calling
/// [`ProcessHandle::terminate`]) takes the process down with it.
pub struct ProcessHandle {
    pub component: String,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub child: Child,
}

impl ProcessHandle {
    /// Best-effort termination: signal the process and reap it.
    pub async fn terminate(&mut self) {
        tracing::info!(component = %self.component, pid = ?self.pid, "terminating component");
        if let Err(err) = self.child.start_kill() {
            // Already exited processes report InvalidInput here.
            tracing::debug!(component = %self.component, error = %err, "kill signal not delivered");
        }
        match self.child.wait().await {
            Ok(status) => {
                tracing::debug!(component = %self.component, status = %status, "component stopped")
            }
            Err(err) => {
                tracing::warn!(component = %self.component, error = %err, "failed to reap component")
            }
        }
    }
}
