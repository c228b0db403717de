//! Error types for ledger-gateway

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a single Ledger Gateway call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Endpoint unreachable or connection dropped
    #[error("Ledger transport failed: {0}")]
    Transport(String),

    /// JSON-RPC level error object returned by the endpoint
    #[error("Ledger RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The registry refused the call (bad fee, duplicate, stale or unauthorized)
    #[error("Ledger rejected call: {0}")]
    Rejected(String),

    /// Response payload did not match the expected shape
    #[error("Ledger response decode failed: {0}")]
    Decode(String),

    /// The request subscription was already handed out
    #[error("Request subscription already taken")]
    AlreadySubscribed,

    /// Call did not complete within the allotted time
    #[error("Ledger call timed out after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// Whether the registry itself refused the call, as opposed to the call
    /// never reaching it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, GatewayError::Rejected(_) | GatewayError::Rpc { .. })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// Delivery-layer failure on the request subscription.
///
/// Yielded in place of a request; the stream stays usable afterwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Subscription delivery failed: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<GatewayError> for TransportError {
    fn from(err: GatewayError) -> Self {
        TransportError::new(err.to_string())
    }
}
