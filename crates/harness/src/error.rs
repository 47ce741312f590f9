//! Error taxonomy for the harness pipeline.

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline stage reported alongside a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    Config,
    Toolchain,
    Provision,
    Materialize,
    Supervise,
    Verify,
}

/// Errors produced by the harness. Every variant aborts the run; no stage
/// continues past a failure from an earlier stage.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Failure while assembling the harness itself, before any stage runs.
    #[error("harness setup failed")]
    Setup(#[source] anyhow::Error),

    #[error("configuration rejected: {reason}")]
    InvalidConfig { reason: String },

    #[error("required tool `{tool}` is not available: {reason}")]
    MissingToolchain { tool: String, reason: String },

    #[error("failed to provision sources for `{component}`")]
    Provision {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write config artifact {}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("component `{component}` did not become ready within {timeout:?}")]
    StartupTimeout {
        component: String,
        timeout: Duration,
    },

    #[error("component `{component}` exited with {} before becoming ready: {detail}", exit_code(.code))]
    ProcessCrash {
        component: String,
        code: Option<i32>,
        detail: String,
    },

    #[error("component `{component}` cannot start: dependency `{dependency}` is {state}")]
    DependencyNotReady {
        component: String,
        dependency: String,
        state: String,
    },

    #[error("verification step `{step}` failed: {cause}")]
    VerificationStep { step: String, cause: String },
}

impl HarnessError {
    /// The stage this error aborted, for the CLI's terminal report.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Setup(_) | Self::InvalidConfig { .. } => Stage::Config,
            Self::MissingToolchain { .. } => Stage::Toolchain,
            Self::Provision { .. } => Stage::Provision,
            Self::ConfigWrite { .. } => Stage::Materialize,
            Self::StartupTimeout { .. }
            | Self::ProcessCrash { .. }
            | Self::DependencyNotReady { .. } => Stage::Supervise,
            Self::VerificationStep { .. } => Stage::Verify,
        }
    }
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        let err = HarnessError::MissingToolchain {
            tool: "clarinet".to_string(),
            reason: "not on PATH".to_string(),
        };
        assert_eq!(err.stage(), Stage::Toolchain);

        let err = HarnessError::VerificationStep {
            step: "mint-zbtcz".to_string(),
            cause: "status 500".to_string(),
        };
        assert_eq!(err.stage(), Stage::Verify);
        assert_eq!(err.stage().to_string(), "verify");
    }

    #[test]
    fn test_process_crash_display_names_code() {
        let err = HarnessError::ProcessCrash {
            component: "clarity-deploy".to_string(),
            code: Some(3),
            detail: "deployment plan missing".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("clarity-deploy"));
        assert!(message.contains("code 3"));
    }
}
