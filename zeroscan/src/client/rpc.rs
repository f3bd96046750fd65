//! JSON-RPC transport: wire types, a retrying client and order-preserving batch calls

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use zeroscan_config::RpcConfig;

use crate::error::ClientError;

/// JSON-RPC 2.0 request object. `id` is the correlation key for batched calls.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    jsonrpc: &'static str,
    method: String,
    params: Vec<Value>,
    id: u64,
}

impl RpcRequest {
    fn new(id: u64, method: &str, params: Vec<Value>) -> Self {
        RpcRequest {
            jsonrpc: "2.0",
            method: method.to_string(),
            params,
            id,
        }
    }
}

/// JSON-RPC 2.0 response object. Error responses may carry a null `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<NodeError>,
    #[serde(default)]
    pub id: Option<u64>,
}

/// Error object returned by the node inside a JSON-RPC response.
#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("node error {code}: {message}")]
pub struct NodeError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
enum TransportError {
    #[error("HTTP error. {0}")]
    Http(#[from] reqwest::Error),
    #[error("Node error. {0}")]
    Node(#[from] NodeError),
}

/// Bounded retry with a fixed delay between attempts.
///
/// Exhaustion degrades to a "no result" sentinel, it never raises past this boundary. The cause
/// of each failed attempt is logged for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            delay,
        }
    }

    pub(crate) async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        for attempt in 1..=self.max_attempts {
            match operation().await {
                Ok(value) => return Some(value),
                Err(cause) if attempt < self.max_attempts => {
                    warn!(%label, attempt, error = %cause, "RPC call failed, retrying");
                    sleep(self.delay).await;
                }
                Err(cause) => {
                    error!(%label, attempts = self.max_attempts, error = %cause, "RPC call failed, giving up");
                }
            }
        }
        None
    }
}

/// Client for a node's JSON-RPC endpoint over HTTP with basic authentication.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    user: String,
    password: String,
    retry: RetryPolicy,
}

impl RpcClient {
    /// Creates a client from [`RpcConfig`]. Fails if the HTTP client cannot be constructed.
    pub fn new(config: &RpcConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(RpcClient {
            http,
            url: config.rpc_uri.to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
            retry: RetryPolicy::new(config.max_retries, config.retry_delay),
        })
    }

    /// Issues one request, retrying per the policy. Returns `None` once retries are exhausted,
    /// or when the node answers with a null result.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Option<Value> {
        self.retry
            .run(method, || {
                let params = params.clone();
                async move { self.try_call(method, params).await }
            })
            .await
            .flatten()
    }

    /// Dispatches all calls as one batched request and returns the results in input order.
    ///
    /// A per-item error leaves `None` at that position while the other items stay occupied.
    /// Transport failure of the whole batch is retried, then degrades to an all-`None` vector of
    /// input length.
    pub async fn batch_call(&self, calls: Vec<(&str, Vec<Value>)>) -> Vec<Option<Value>> {
        if calls.is_empty() {
            return Vec::new();
        }
        let label = format!("{}[{}]", calls[0].0, calls.len());
        let calls = &calls;
        match self
            .retry
            .run(&label, || async move { self.try_batch(calls).await })
            .await
        {
            Some(responses) => order_batch_responses(responses, calls.len()),
            None => vec![None; calls.len()],
        }
    }

    async fn try_call(&self, method: &str, params: Vec<Value>) -> Result<Option<Value>, TransportError> {
        let payload = RpcRequest::new(1, method, params);
        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let body: RpcResponse = response.json().await?;
        if let Some(node_error) = body.error {
            return Err(node_error.into());
        }
        Ok(body.result)
    }

    async fn try_batch(&self, calls: &[(&str, Vec<Value>)]) -> Result<Vec<RpcResponse>, TransportError> {
        let payload: Vec<RpcRequest> = calls
            .iter()
            .enumerate()
            .map(|(id, (method, params))| RpcRequest::new(id as u64, method, params.clone()))
            .collect();
        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

// Responses from a batched channel may arrive out of order relative to the request list; the
// request id is the sole correlation key.
fn order_batch_responses(responses: Vec<RpcResponse>, request_count: usize) -> Vec<Option<Value>> {
    let mut ordered: Vec<Option<Value>> = vec![None; request_count];
    for response in responses {
        let Some(id) = response.id else { continue };
        let Some(slot) = ordered.get_mut(id as usize) else {
            continue;
        };
        *slot = match response.error {
            Some(node_error) => {
                debug!(id, error = %node_error, "batched RPC item failed");
                None
            }
            None => response.result,
        };
    }
    ordered
}
