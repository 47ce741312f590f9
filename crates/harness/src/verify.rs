//! Bridge verification protocol.
//!
//! Drives the fixed anchoring / mint / burn / governance lifecycle against
//! the running stack. Steps execute strictly in order, each gated on the
//! previous step's success; the first failure aborts the remainder and
//! names the step that broke. Steps are never retried individually.

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use url::Url;

use crate::config::RuntimeConfig;
use crate::error::HarnessError;
use crate::rpc;

/// Which service a step talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Layer {
    /// The L1 node RPC surface (basic-auth with the RPC credentials).
    L1,
    /// The L2 bridge API.
    L2,
}

/// What counts as success for a step beyond HTTP 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    /// Body is JSON with `status == "success"`.
    SuccessStatus,
    /// Body is a non-empty JSON document.
    NonEmptyBody,
    /// Body is a JSON array containing an event with this `tx_id`.
    EventRecorded { tx_id: &'static str },
}

/// One named HTTP interaction in the verification sequence.
#[derive(Debug, Clone)]
pub struct VerificationStep {
    pub name: &'static str,
    pub layer: Layer,
    pub method: Method,
    pub path: &'static str,
    pub payload: Option<Value>,
    pub expect: Expect,
}

/// The fixed bridge lifecycle, in execution order: confirm governance is
/// reachable, initialize the bridge trust root, anchor L1 state, run the
/// mint and burn workflows, then round-trip a cross-layer event.
pub fn lifecycle() -> Vec<VerificationStep> {
    vec![
        VerificationStep {
            name: "governance-parameters",
            layer: Layer::L2,
            method: Method::GET,
            path: "/governance/parameters",
            payload: None,
            expect: Expect::NonEmptyBody,
        },
        VerificationStep {
            name: "bridge-init",
            layer: Layer::L2,
            method: Method::POST,
            path: "/bridge/init",
            payload: Some(json!({
                "merkle_root": "initial_merkle_root",
                "validators": ["validator_1"],
            })),
            expect: Expect::SuccessStatus,
        },
        VerificationStep {
            name: "send-anchor",
            layer: Layer::L1,
            method: Method::POST,
            path: "/sendanchor",
            payload: Some(json!({
                "block_height": 1234,
                "state_root": "test_state_root",
                "merkle_proof": [],
            })),
            expect: Expect::SuccessStatus,
        },
        VerificationStep {
            name: "finalize-state",
            layer: Layer::L2,
            method: Method::POST,
            path: "/bridge/finalize",
            payload: Some(json!({
                "block_height": 100,
                "merkle_root": "abc123",
            })),
            expect: Expect::SuccessStatus,
        },
        VerificationStep {
            name: "mint-zbtcz",
            layer: Layer::L2,
            method: Method::POST,
            path: "/mint-zbtcz",
            payload: Some(json!({
                "amount": 10,
                "block_height": 100,
                "merkle_root": "abc123",
            })),
            expect: Expect::SuccessStatus,
        },
        VerificationStep {
            name: "burn-zbtcz",
            layer: Layer::L2,
            method: Method::POST,
            path: "/burn-zbtcz",
            payload: Some(json!({ "ids": [1, 2, 3] })),
            expect: Expect::SuccessStatus,
        },
        VerificationStep {
            name: "burn-sync",
            layer: Layer::L1,
            method: Method::POST,
            path: "/bridge/burn-sync",
            payload: Some(json!([{ "tx-id": "tx123", "amount": 3 }])),
            expect: Expect::SuccessStatus,
        },
        VerificationStep {
            name: "sync-event",
            layer: Layer::L2,
            method: Method::POST,
            path: "/bridge/sync-event",
            payload: Some(json!({
                "event_type": "burn",
                "tx_id": "tx123",
                "amount": 100,
                "merkle_root": "root123",
                "block_height": 500,
            })),
            expect: Expect::SuccessStatus,
        },
        VerificationStep {
            name: "event-roundtrip",
            layer: Layer::L2,
            method: Method::GET,
            path: "/bridge/events",
            payload: None,
            expect: Expect::EventRecorded { tx_id: "tx123" },
        },
    ]
}

/// Executes the verification sequence against the bridge endpoints.
pub struct BridgeVerifier {
    client: reqwest::Client,
    l1_base: Url,
    l2_base: Url,
    rpc_user: String,
    rpc_password: String,
}

impl BridgeVerifier {
    /// Verifier for the endpoints described by the runtime config.
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let l1_base = config.btcz_rpc_url()?;
        let l2_base = config.zook_api_url()?;
        Self::with_endpoints(config, l1_base, l2_base)
    }

    /// Verifier for explicit endpoints; the config supplies credentials.
    pub fn with_endpoints(config: &RuntimeConfig, l1_base: Url, l2_base: Url) -> Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            l1_base,
            l2_base,
            rpc_user: config.rpc_user.clone(),
            rpc_password: config.rpc_password.clone(),
        })
    }

    /// Run the whole lifecycle, stopping at the first failing step.
    pub async fn run(&self) -> Result<(), HarnessError> {
        for step in lifecycle() {
            self.execute(&step)
                .await
                .map_err(|cause| HarnessError::VerificationStep {
                    step: step.name.to_string(),
                    cause: format!("{cause:#}"),
                })?;
            tracing::info!(step = step.name, layer = %step.layer, "verification step passed");
        }
        Ok(())
    }

    async fn execute(&self, step: &VerificationStep) -> Result<()> {
        let base = match step.layer {
            Layer::L1 => &self.l1_base,
            Layer::L2 => &self.l2_base,
        };
        let url = base
            .join(step.path)
            .with_context(|| format!("failed to build URL for {}", step.path))?;

        let mut request = self.client.request(step.method.clone(), url);
        if step.layer == Layer::L1 {
            request = request.basic_auth(&self.rpc_user, Some(&self.rpc_password));
        }
        if let Some(payload) = &step.payload {
            request = request.json(payload);
        }

        let response = request.send().await.context("request failed")?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("response body is not JSON")?;

        if status != StatusCode::OK {
            anyhow::bail!("unexpected HTTP status {status}: {body}");
        }

        match &step.expect {
            Expect::SuccessStatus => {
                if body.get("status").and_then(Value::as_str) != Some("success") {
                    anyhow::bail!("payload did not report success: {body}");
                }
            }
            Expect::NonEmptyBody => {
                let empty = body.is_null()
                    || body.as_object().is_some_and(|o| o.is_empty())
                    || body.as_array().is_some_and(|a| a.is_empty());
                if empty {
                    anyhow::bail!("response body is empty: {body}");
                }
            }
            Expect::EventRecorded { tx_id } => {
                let events = body
                    .as_array()
                    .context("events response is not an array")?;
                let recorded = events
                    .iter()
                    .any(|event| event.get("tx_id").and_then(Value::as_str) == Some(tx_id));
                if !recorded {
                    anyhow::bail!("submitted event {tx_id} missing from event list: {body}");
                }
            }
        }

        Ok(())
    }
}
