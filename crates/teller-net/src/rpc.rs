//! JSON-RPC and REST client
//!
//! One attempt per call; retries are left to callers.

use crate::{Error, Result, TransportConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

/// HTTP client shared by protocol services
#[derive(Debug)]
pub struct RpcClient {
    client: reqwest::Client,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Build from transport configuration
    pub fn new(config: &TransportConfig) -> Result<Self> {
        Ok(Self::with_client(config.create_http_client()?))
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            request_id: AtomicU64::new(1),
        }
    }

    /// JSON-RPC 2.0 call.
    ///
    /// A response `error` object becomes [`Error::Rpc`]; a missing or null
    /// `result` decodes as JSON null.
    pub async fn json_rpc<P, R>(&self, url: &str, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        debug!("JSON-RPC {} id={} -> {}", method, id, url);

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response: RpcResponse = self.post_json(url, &request).await?;

        if let Some(error) = response.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(response.result)
            .map_err(|e| Error::Decode(format!("{} result: {}", method, e)))
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        read_json(response).await
    }

    /// GET and decode the JSON response
    pub async fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Decode(format!("JSON decode error: {}", e)))
}
