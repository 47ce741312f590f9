//! Component lifecycle supervision.
//!
//! Components move through `NotStarted -> Starting -> Ready -> Failed`. A
//! long-running service reaches `Ready` only once its readiness probe
//! answers; a one-shot step reaches it on exit code zero. A component is
//! started only after every declared dependency has been observed `Ready`,
//! and any failure tears down everything started so far — a retry of the
//! whole harness must not find orphaned listeners on the configured ports.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use crate::error::HarnessError;
use crate::probe::ReadinessProbe;
use crate::proc::{CommandSpec, ProcessHandle};
use crate::rpc;

/// How a component runs and what makes it ready.
#[derive(Debug, Clone)]
pub enum ComponentKind {
    /// Long-running process; readiness comes from an active probe.
    Service { probe: ReadinessProbe },
    /// Terminating step; readiness is exit code zero, no polling.
    OneShot { timeout: Duration },
}

/// Static descriptor for one managed component.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub name: &'static str,
    pub command: CommandSpec,
    pub kind: ComponentKind,
    pub depends_on: &'static [&'static str],
}

/// Lifecycle state of a managed component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ComponentState {
    NotStarted,
    Starting,
    Ready,
    Failed,
}

/// Starts components in dependency order and owns every process it spawns.
pub struct Supervisor {
    client: reqwest::Client,
    states: HashMap<&'static str, ComponentState>,
    handles: Vec<ProcessHandle>,
}

impl Supervisor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            states: HashMap::new(),
            handles: Vec::new(),
        })
    }

    pub fn state(&self, name: &str) -> ComponentState {
        self.states
            .get(name)
            .copied()
            .unwrap_or(ComponentState::NotStarted)
    }

    /// Number of processes currently owned by the supervisor.
    pub fn running(&self) -> usize {
        self.handles.len()
    }

    /// Start every component in order, tearing everything down on failure.
    pub async fn start_all(&mut self, specs: Vec<ComponentSpec>) -> Result<(), HarnessError> {
        for spec in specs {
            if let Err(err) = self.start_component(spec).await {
                self.shutdown().await;
                return Err(err);
            }
        }
        Ok(())
    }

    async fn start_component(&mut self, spec: ComponentSpec) -> Result<(), HarnessError> {
        // A dependent never starts before its dependencies are Ready.
        for dep in spec.depends_on {
            let state = self.state(dep);
            if state != ComponentState::Ready {
                return Err(HarnessError::DependencyNotReady {
                    component: spec.name.to_string(),
                    dependency: dep.to_string(),
                    state: state.to_string(),
                });
            }
        }

        self.states.insert(spec.name, ComponentState::Starting);
        tracing::info!(
            component = spec.name,
            command = %spec.command.display(),
            "starting component"
        );

        match spec.kind {
            ComponentKind::OneShot { timeout } => {
                self.run_one_shot(spec.name, &spec.command, timeout).await
            }
            ComponentKind::Service { ref probe } => {
                self.start_service(spec.name, &spec.command, probe).await
            }
        }
    }

    async fn run_one_shot(
        &mut self,
        name: &'static str,
        command: &CommandSpec,
        timeout: Duration,
    ) -> Result<(), HarnessError> {
        match tokio::time::timeout(timeout, command.run_captured()).await {
            Err(_elapsed) => {
                self.states.insert(name, ComponentState::Failed);
                Err(HarnessError::StartupTimeout {
                    component: name.to_string(),
                    timeout,
                })
            }
            Ok(Err(err)) => {
                self.states.insert(name, ComponentState::Failed);
                Err(HarnessError::ProcessCrash {
                    component: name.to_string(),
                    code: None,
                    detail: format!("{err:#}"),
                })
            }
            Ok(Ok(output)) if output.status.success() => {
                self.states.insert(name, ComponentState::Ready);
                tracing::info!(component = name, "one-shot component completed");
                Ok(())
            }
            Ok(Ok(output)) => {
                self.states.insert(name, ComponentState::Failed);
                Err(HarnessError::ProcessCrash {
                    component: name.to_string(),
                    code: output.status.code(),
                    detail: output.stderr_tail(8),
                })
            }
        }
    }

    async fn start_service(
        &mut self,
        name: &'static str,
        command: &CommandSpec,
        probe: &ReadinessProbe,
    ) -> Result<(), HarnessError> {
        let mut handle = match command.spawn(name) {
            Ok(handle) => handle,
            Err(err) => {
                self.states.insert(name, ComponentState::Failed);
                return Err(HarnessError::ProcessCrash {
                    component: name.to_string(),
                    code: None,
                    detail: format!("{err:#}"),
                });
            }
        };

        let result = tokio::select! {
            status = handle.child.wait() => {
                let code = status.ok().and_then(|s| s.code());
                Err(HarnessError::ProcessCrash {
                    component: name.to_string(),
                    code,
                    detail: "process exited during startup".to_string(),
                })
            }
            ready = probe.wait_ready(&self.client) => match ready {
                Ok(()) => Ok(()),
                Err(err) => {
                    tracing::error!(
                        component = name,
                        error = format!("{err:#}"),
                        "readiness probe gave up"
                    );
                    Err(HarnessError::StartupTimeout {
                        component: name.to_string(),
                        timeout: probe.timeout,
                    })
                }
            }
        };

        match result {
            Ok(()) => {
                let waited_ms = (Utc::now() - handle.started_at).num_milliseconds();
                tracing::info!(
                    component = name,
                    pid = ?handle.pid,
                    waited_ms,
                    "component ready"
                );
                self.states.insert(name, ComponentState::Ready);
                self.handles.push(handle);
                Ok(())
            }
            Err(err) => {
                self.states.insert(name, ComponentState::Failed);
                // A crashed child is already gone; only kill on probe failure.
                if !matches!(err, HarnessError::ProcessCrash { .. }) {
                    handle.terminate().await;
                }
                Err(err)
            }
        }
    }

    /// Terminate every owned process, dependents first.
    pub async fn shutdown(&mut self) {
        while let Some(mut handle) = self.handles.pop() {
            handle.terminate().await;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::net::Ipv4Addr;

    use tempdir::TempDir;

    use super::*;
    use crate::probe::ProbeTarget;

    fn short_probe(addr: std::net::SocketAddr) -> ReadinessProbe {
        ReadinessProbe::new(
            ProbeTarget::TcpConnect { addr },
            Duration::from_millis(50),
            Duration::from_millis(300),
        )
    }

    fn dead_addr() -> std::net::SocketAddr {
        let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn test_one_shot_success_reaches_ready() {
        let mut supervisor = Supervisor::new().unwrap();
        supervisor
            .start_all(vec![ComponentSpec {
                name: "deploy",
                command: CommandSpec::new("true"),
                kind: ComponentKind::OneShot {
                    timeout: Duration::from_secs(5),
                },
                depends_on: &[],
            }])
            .await
            .unwrap();
        assert_eq!(supervisor.state("deploy"), ComponentState::Ready);
    }

    #[tokio::test]
    async fn test_one_shot_failure_carries_exit_code() {
        let mut supervisor = Supervisor::new().unwrap();
        let err = supervisor
            .start_all(vec![ComponentSpec {
                name: "deploy",
                command: CommandSpec::new("sh").args(["-c", "exit 7"]),
                kind: ComponentKind::OneShot {
                    timeout: Duration::from_secs(5),
                },
                depends_on: &[],
            }])
            .await
            .unwrap_err();

        match err {
            HarnessError::ProcessCrash { component, code, .. } => {
                assert_eq!(component, "deploy");
                assert_eq!(code, Some(7));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(supervisor.state("deploy"), ComponentState::Failed);
    }

    #[tokio::test]
    async fn test_dependency_must_be_ready() {
        let mut supervisor = Supervisor::new().unwrap();
        let err = supervisor
            .start_all(vec![ComponentSpec {
                name: "l2",
                command: CommandSpec::new("true"),
                kind: ComponentKind::OneShot {
                    timeout: Duration::from_secs(5),
                },
                depends_on: &["l1"],
            }])
            .await
            .unwrap_err();

        match err {
            HarnessError::DependencyNotReady {
                component,
                dependency,
                state,
            } => {
                assert_eq!(component, "l2");
                assert_eq!(dependency, "l1");
                assert_eq!(state, "not-started");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failed_dependency_blocks_dependent_command() {
        let dir = TempDir::new("zooknet-supervisor").unwrap();
        let marker = dir.path().join("dependent-ran");

        let mut supervisor = Supervisor::new().unwrap();
        let err = supervisor
            .start_all(vec![
                ComponentSpec {
                    name: "l1",
                    command: CommandSpec::new("false"),
                    kind: ComponentKind::OneShot {
                        timeout: Duration::from_secs(5),
                    },
                    depends_on: &[],
                },
                ComponentSpec {
                    name: "l2",
                    command: CommandSpec::new("touch").arg(marker.display().to_string()),
                    kind: ComponentKind::OneShot {
                        timeout: Duration::from_secs(5),
                    },
                    depends_on: &["l1"],
                },
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, HarnessError::ProcessCrash { .. }));
        // The dependent's start command never executed.
        assert!(!marker.exists());
        assert_eq!(supervisor.state("l2"), ComponentState::NotStarted);
    }

    #[tokio::test]
    async fn test_service_startup_timeout() {
        let mut supervisor = Supervisor::new().unwrap();
        let err = supervisor
            .start_all(vec![ComponentSpec {
                name: "node",
                command: CommandSpec::new("sleep").arg("30"),
                kind: ComponentKind::Service {
                    probe: short_probe(dead_addr()),
                },
                depends_on: &[],
            }])
            .await
            .unwrap_err();

        assert!(matches!(err, HarnessError::StartupTimeout { .. }));
        assert_eq!(supervisor.state("node"), ComponentState::Failed);
        assert_eq!(supervisor.running(), 0);
    }

    #[tokio::test]
    async fn test_service_crash_detected_during_startup() {
        let mut supervisor = Supervisor::new().unwrap();
        let err = supervisor
            .start_all(vec![ComponentSpec {
                name: "node",
                command: CommandSpec::new("true"),
                kind: ComponentKind::Service {
                    probe: ReadinessProbe::new(
                        ProbeTarget::TcpConnect { addr: dead_addr() },
                        Duration::from_secs(1),
                        Duration::from_secs(30),
                    ),
                },
                depends_on: &[],
            }])
            .await
            .unwrap_err();

        match err {
            HarnessError::ProcessCrash { component, .. } => assert_eq!(component, "node"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_service_becomes_ready_and_shuts_down() {
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let _ = listener.accept().await;
            }
        });

        let mut supervisor = Supervisor::new().unwrap();
        supervisor
            .start_all(vec![ComponentSpec {
                name: "node",
                command: CommandSpec::new("sleep").arg("30"),
                kind: ComponentKind::Service {
                    probe: ReadinessProbe::new(
                        ProbeTarget::TcpConnect { addr },
                        Duration::from_millis(50),
                        Duration::from_secs(5),
                    ),
                },
                depends_on: &[],
            }])
            .await
            .unwrap();

        assert_eq!(supervisor.state("node"), ComponentState::Ready);
        assert_eq!(supervisor.running(), 1);

        supervisor.shutdown().await;
        assert_eq!(supervisor.running(), 0);
    }
}
