//! Shared HTTP and JSON-RPC helpers.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Default timeout for individual HTTP requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Basic-auth credentials for RPC endpoints that require them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcAuth {
    pub user: String,
    pub password: String,
}

/// Create an HTTP client configured for harness requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("failed to create HTTP client")
}

fn rpc_request(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: &[Value],
    auth: Option<&RpcAuth>,
) -> reqwest::RequestBuilder {
    let mut request = client.post(url.clone()).json(&serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    }));
    if let Some(auth) = auth {
        request = request.basic_auth(&auth.user, Some(&auth.password));
    }
    request
}

/// Make a JSON-RPC call and deserialize the result.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: &[Value],
    auth: Option<&RpcAuth>,
) -> Result<T, anyhow::Error> {
    let response = rpc_request(client, url, method, params, auth)
        .send()
        .await
        .with_context(|| format!("failed to send {method} request"))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("failed to parse {method} response"))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("no result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("failed to deserialize {method} result"))
}

/// Check that a JSON-RPC endpoint is answering at all.
///
/// A well-formed response carrying either a result or an error counts: a
/// node still warming up answers RPC errors long before it serves results.
pub async fn json_rpc_ping(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    auth: Option<&RpcAuth>,
) -> Result<(), anyhow::Error> {
    let response = rpc_request(client, url, method, &[], auth)
        .send()
        .await
        .with_context(|| format!("failed to send {method} request"))?;

    let body: Value = response
        .json()
        .await
        .with_context(|| format!("{method} response is not JSON"))?;

    if body.get("result").is_some() || body.get("error").is_some() {
        Ok(())
    } else {
        anyhow::bail!("malformed JSON-RPC response: {body}")
    }
}
