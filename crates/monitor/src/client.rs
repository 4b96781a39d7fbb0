//! Minimal JSON-RPC 2.0 over HTTP transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::worker::MonitorError;

const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// HTTP client bound to one endpoint. Request ids start from a random seed
/// and increase per call so each request carries its own correlation id.
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MonitorError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(random_id_seed()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issues `method` and returns its non-null `result`.
    pub async fn call<P, T>(&self, method: &str, params: P) -> Result<T, MonitorError>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let body = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let response: JsonRpcResponse<T> = serde_json::from_slice(&body)
            .map_err(|err| MonitorError::InvalidResponse(format!("{method}: {err}")))?;

        if let Some(error) = response.error {
            return Err(MonitorError::Rpc(format!(
                "{method}: code={} msg={}",
                error.code, error.message
            )));
        }

        response
            .result
            .ok_or_else(|| MonitorError::MissingResult(method.to_owned()))
    }
}

fn random_id_seed() -> u64 {
    u64::from(getrandom::u32().unwrap_or(1))
}
