//! JSON-RPC gateway - Registry Calls over HTTP
//!
//! Talks JSON-RPC 2.0 to a registry endpoint. One method per gateway
//! operation:
//! - oracle_accounts / oracle_registrationFee
//! - oracle_registerOracle / oracle_getMyIndexes
//! - oracle_submitOracleResponse
//! - oracle_getOracleRequests (polled to drive the subscription)
//!
//! Every call names the registry address; write calls carry a gas limit.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::{GatewayError, TransportError};
use crate::schema::{
    AssignedIndexSet, BlockOffset, Fee, Identity, InboundRequest, OracleIndex, ResponseSubmission,
};
use crate::traits::{GatewayResult, LedgerGateway, RequestStream};

/// Gas limit attached to registration and submission calls.
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

/// JSON-RPC server error range used for reverted contract calls.
const RPC_EXECUTION_REVERTED: i64 = -32000;

/// Configuration for the registry JSON-RPC endpoint
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP endpoint URL (e.g., "http://localhost:8545")
    pub endpoint: String,
    /// Address of the oracle registry contract
    pub registry_address: String,
    /// Gas limit for write calls (default: 300000)
    pub gas_limit: u64,
    /// Per-request timeout (default: 30s)
    pub request_timeout: Duration,
    /// Delay between subscription polls (default: 1s)
    pub poll_interval: Duration,
}

impl GatewayConfig {
    /// Create a new configuration with default limits
    pub fn new(endpoint: impl Into<String>, registry_address: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            registry_address: registry_address.into(),
            gas_limit: DEFAULT_GAS_LIMIT,
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Set gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set subscription poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - ORACLE_RPC_URL (required)
    /// - ORACLE_REGISTRY_ADDRESS (required)
    /// - ORACLE_GAS_LIMIT (optional, default: 300000)
    pub fn from_env() -> std::result::Result<Self, String> {
        let endpoint = std::env::var("ORACLE_RPC_URL").map_err(|_| "ORACLE_RPC_URL not set")?;
        let registry_address = std::env::var("ORACLE_REGISTRY_ADDRESS")
            .map_err(|_| "ORACLE_REGISTRY_ADDRESS not set")?;
        let gas_limit = match std::env::var("ORACLE_GAS_LIMIT") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| format!("ORACLE_GAS_LIMIT invalid: {e}"))?,
            Err(_) => DEFAULT_GAS_LIMIT,
        };

        Ok(Self::new(endpoint, registry_address).with_gas_limit(gas_limit))
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

/// One page of request events from `oracle_getOracleRequests`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestBatch {
    #[serde(default)]
    events: Vec<InboundRequest>,
    latest_block: u64,
}

fn decode_response<T>(response: RpcResponse<T>) -> GatewayResult<T> {
    if let Some(err) = response.error {
        if err.code == RPC_EXECUTION_REVERTED {
            return Err(GatewayError::Rejected(err.message));
        }
        return Err(GatewayError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    response
        .result
        .ok_or_else(|| GatewayError::Decode("response carried neither result nor error".into()))
}

struct Inner {
    config: GatewayConfig,
    client: reqwest::Client,
    next_id: AtomicU64,
}

/// JSON-RPC client for the oracle registry
#[derive(Clone)]
pub struct HttpLedgerGateway {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for HttpLedgerGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLedgerGateway")
            .field("endpoint", &self.inner.config.endpoint)
            .field("registry_address", &self.inner.config.registry_address)
            .finish()
    }
}

impl HttpLedgerGateway {
    /// Build a client for the configured endpoint
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("flight-oracle-ledger-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {e}")))?;

        info!(
            endpoint = %config.endpoint,
            registry = %config.registry_address,
            "Ledger gateway configured"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                client,
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> GatewayResult<Self> {
        let config = GatewayConfig::from_env().map_err(GatewayError::Transport)?;
        Self::new(config)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> GatewayResult<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, "RPC call");

        let timeout = self.inner.config.request_timeout;
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                GatewayError::Timeout(timeout)
            } else {
                GatewayError::from(e)
            }
        };

        let response = self
            .inner
            .client
            .post(&self.inner.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "{method} returned HTTP {status}"
            )));
        }

        let body: RpcResponse<T> = response.json().await.map_err(classify)?;
        decode_response(body)
    }

    fn registry(&self) -> &str {
        &self.inner.config.registry_address
    }

    async fn fetch_requests(&self, from_block: u64) -> GatewayResult<RequestBatch> {
        self.call(
            "oracle_getOracleRequests",
            json!({ "registry": self.registry(), "fromBlock": from_block }),
        )
        .await
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    #[instrument(skip(self))]
    async fn accounts(&self) -> GatewayResult<Vec<Identity>> {
        self.call("oracle_accounts", json!({ "registry": self.registry() }))
            .await
    }

    #[instrument(skip(self))]
    async fn registration_fee(&self) -> GatewayResult<Fee> {
        self.call("oracle_registrationFee", json!({ "registry": self.registry() }))
            .await
    }

    #[instrument(skip_all, fields(identity = %identity, fee = %fee))]
    async fn register_oracle(&self, identity: &Identity, fee: Fee) -> GatewayResult<()> {
        let _receipt: Value = self
            .call(
                "oracle_registerOracle",
                json!({
                    "registry": self.registry(),
                    "from": identity,
                    "value": fee,
                    "gas": self.inner.config.gas_limit,
                }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(identity = %identity))]
    async fn assigned_indexes(&self, identity: &Identity) -> GatewayResult<AssignedIndexSet> {
        let raw: Vec<OracleIndex> = self
            .call(
                "oracle_getMyIndexes",
                json!({ "registry": self.registry(), "from": identity }),
            )
            .await?;
        AssignedIndexSet::try_from(raw)
    }

    #[instrument(skip_all, fields(sender = %sender, index = %submission.index()))]
    async fn submit_response(
        &self,
        submission: &ResponseSubmission,
        sender: &Identity,
    ) -> GatewayResult<()> {
        let _receipt: Value = self
            .call(
                "oracle_submitOracleResponse",
                json!({
                    "registry": self.registry(),
                    "from": sender,
                    "gas": self.inner.config.gas_limit,
                    "index": submission.index(),
                    "airline": submission.airline(),
                    "flight": submission.flight(),
                    "timestamp": submission.timestamp(),
                    "statusCode": submission.status(),
                }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn subscribe_requests(&self, from: BlockOffset) -> GatewayResult<RequestStream> {
        // First page fetched eagerly so an unreachable registry fails here.
        let first = self.fetch_requests(from.0).await?;
        let mut poller = RequestPoller {
            gateway: self.clone(),
            cursor: from.0,
            pending: VecDeque::new(),
        };
        poller.absorb(first);
        info!(from_block = from.0, "Request subscription opened");

        let interval = self.inner.config.poll_interval;
        let stream = futures::stream::unfold(poller, move |mut poller| async move {
            loop {
                if let Some(request) = poller.pending.pop_front() {
                    return Some((Ok(request), poller));
                }
                tokio::time::sleep(interval).await;
                match poller.gateway.fetch_requests(poller.cursor).await {
                    Ok(batch) => poller.absorb(batch),
                    Err(e) => {
                        warn!(error = %e, cursor = poller.cursor, "Request poll failed");
                        return Some((Err(TransportError::from(e)), poller));
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

/// Cursor state behind the polling subscription.
struct RequestPoller {
    gateway: HttpLedgerGateway,
    cursor: u64,
    pending: VecDeque<InboundRequest>,
}

impl RequestPoller {
    fn absorb(&mut self, batch: RequestBatch) {
        let cursor = self.cursor;
        let mut fresh: Vec<InboundRequest> = batch
            .events
            .into_iter()
            .filter(|r| r.block.map(|b| b >= cursor).unwrap_or(true))
            .collect();
        fresh.sort_by_key(|r| r.block.unwrap_or(cursor));
        self.pending.extend(fresh);
        if batch.latest_block >= self.cursor {
            self.cursor = batch.latest_block + 1;
        }
    }
}
