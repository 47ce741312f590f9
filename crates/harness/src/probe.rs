//! Bounded readiness probing.
//!
//! Readiness is distinct from "process launched": a component counts as
//! ready only once an active check observes it answering. Probes poll on a
//! fixed interval with a ceiling timeout; they never wait indefinitely.

use std::net::SocketAddr;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use url::Url;

use crate::rpc::{self, RpcAuth};

/// What a probe checks.
#[derive(Debug, Clone)]
pub enum ProbeTarget {
    /// An HTTP GET receiving any response.
    HttpGet { url: Url },
    /// A JSON-RPC endpoint answering the given method.
    JsonRpc {
        url: Url,
        method: &'static str,
        auth: Option<RpcAuth>,
    },
    /// A TCP port accepting connections.
    TcpConnect { addr: SocketAddr },
}

/// Active readiness check with a bounded retry budget.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    pub target: ProbeTarget,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl ReadinessProbe {
    pub fn new(target: ProbeTarget, poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            target,
            poll_interval,
            timeout,
        }
    }

    fn max_attempts(&self) -> usize {
        let interval = self.poll_interval.as_millis().max(1);
        (self.timeout.as_millis() / interval).max(1) as usize
    }

    async fn check_once(&self, client: &reqwest::Client) -> Result<(), anyhow::Error> {
        match &self.target {
            ProbeTarget::HttpGet { url } => {
                // Any HTTP response means the service is accepting requests.
                client
                    .get(url.clone())
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| anyhow::anyhow!("GET {url} failed: {err}"))
            }
            ProbeTarget::JsonRpc { url, method, auth } => {
                rpc::json_rpc_ping(client, url, method, auth.as_ref()).await
            }
            ProbeTarget::TcpConnect { addr } => tokio::net::TcpStream::connect(addr)
                .await
                .map(|_| ())
                .map_err(|err| anyhow::anyhow!("connect {addr} failed: {err}")),
        }
    }

    /// Poll until the target answers or the retry budget is exhausted.
    pub async fn wait_ready(&self, client: &reqwest::Client) -> Result<(), anyhow::Error> {
        let check = || self.check_once(client);
        check
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.poll_interval)
                    .with_max_times(self.max_attempts()),
            )
            .notify(|err: &anyhow::Error, _dur: Duration| {
                tracing::trace!(error = %err, "readiness check failed, retrying");
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddrV4, TcpListener};
    use std::time::Instant;

    use super::*;

    /// Reserve a port nobody is listening on.
    fn dead_port() -> u16 {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[tokio::test]
    async fn test_tcp_probe_fails_within_budget() {
        let addr = SocketAddrV4::new(Ipv4Addr::LOCALHOST, dead_port()).into();
        let probe = ReadinessProbe::new(
            ProbeTarget::TcpConnect { addr },
            Duration::from_millis(50),
            Duration::from_millis(250),
        );
        let client = rpc::create_client().unwrap();

        let start = Instant::now();
        let result = probe.wait_ready(&client).await;

        assert!(result.is_err());
        // Bounded retries, not an open-ended hang.
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_tcp_probe_succeeds_once_port_is_bound() {
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let _ = listener.accept().await;
            }
        });

        let probe = ReadinessProbe::new(
            ProbeTarget::TcpConnect { addr },
            Duration::from_millis(50),
            Duration::from_secs(5),
        );
        let client = rpc::create_client().unwrap();
        probe.wait_ready(&client).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_probe_accepts_any_response() {
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().route(
            "/governance/parameters",
            axum::routing::get(|| async { "{}" }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = Url::parse(&format!("http://{addr}/governance/parameters")).unwrap();
        let probe = ReadinessProbe::new(
            ProbeTarget::HttpGet { url },
            Duration::from_millis(50),
            Duration::from_secs(5),
        );
        let client = rpc::create_client().unwrap();
        probe.wait_ready(&client).await.unwrap();
    }

    #[test]
    fn test_max_attempts_is_at_least_one() {
        let probe = ReadinessProbe::new(
            ProbeTarget::TcpConnect {
                addr: SocketAddrV4::new(Ipv4Addr::LOCALHOST, 1).into(),
            },
            Duration::from_secs(10),
            Duration::from_secs(1),
        );
        assert_eq!(probe.max_attempts(), 1);
    }
}
