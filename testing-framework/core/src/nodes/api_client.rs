use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use testing_framework_config::constants::DEFAULT_REQUEST_TIMEOUT;
use tracing::{error, trace};

use crate::{
    codec::{CodecError, formatting::FormattingError},
    crypto::KeyError,
    ids::IdParseError,
};

pub const KEYSTORE_ENDPOINT: &str = "/ext/keystore";
pub const INFO_ENDPOINT: &str = "/ext/info";
pub const HEALTH_ENDPOINT: &str = "/ext/health";

/// Endpoint of a chain's API, addressed by alias (`X`, `P`).
#[must_use]
pub fn chain_endpoint(alias: &str) -> String {
    format!("/ext/bc/{alias}")
}

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("{method} failed with code {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    #[error("{method} returned neither a result nor an error")]
    EmptyResponse { method: String },
    #[error("failed to decode {method} response: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed value in {method} response: {message}")]
    Malformed { method: String, message: String },
    #[error(transparent)]
    Formatting(#[from] FormattingError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Id(#[from] IdParseError),
    #[error(transparent)]
    Key(#[from] KeyError),
}

impl ApiClientError {
    pub(crate) fn malformed(method: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            method: method.to_owned(),
            message: message.into(),
        }
    }
}

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
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Thin async JSON-RPC 2.0 client bound to one node's HTTP API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    client: Client,
    next_id: Arc<AtomicU64>,
}

impl ApiClient {
    #[must_use]
    /// Construct from a socket address.
    pub fn new(addr: SocketAddr) -> Self {
        let base_url = Url::parse(&format!("http://{addr}")).unwrap_or_else(|_| unsafe {
            // Safety: `SocketAddr` formatting yields a valid host:port pair.
            std::hint::unreachable_unchecked()
        });
        Self::from_url(base_url)
    }

    #[must_use]
    /// Construct from a prebuilt URL.
    pub fn from_url(base_url: Url) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                error!(error = %err, "failed to build http client; using defaults");
                Client::new()
            });
        Self {
            base_url,
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Invoke `method` on `endpoint` and decode its `result` member.
    pub async fn call<P, R>(&self, endpoint: &str, method: &str, params: P) -> Result<R, ApiClientError>
    where
        P: Serialize + Send + Sync,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        trace!(%method, endpoint, id, "rpc request");

        let response: RpcResponse = self
            .client
            .post(self.join_base(endpoint))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        decode_response(method, response)
    }

    fn join_base(&self, path: &str) -> Url {
        let trimmed = path.trim_start_matches('/');
        match self.base_url.join(trimmed) {
            Ok(url) => url,
            Err(err) => {
                error!(
                    error = %err,
                    base = %self.base_url,
                    path,
                    "failed to join url; falling back to base url"
                );
                self.base_url.clone()
            }
        }
    }
}

fn decode_response<R: DeserializeOwned>(
    method: &str,
    response: RpcResponse,
) -> Result<R, ApiClientError> {
    if let Some(error) = response.error {
        return Err(ApiClientError::Rpc {
            method: method.to_owned(),
            code: error.code,
            message: error.message,
        });
    }
    let result = response.result.ok_or_else(|| ApiClientError::EmptyResponse {
        method: method.to_owned(),
    })?;
    serde_json::from_value(result).map_err(|source| ApiClientError::Decode {
        method: method.to_owned(),
        source,
    })
}
