//! The Ledger Gateway contract.
//!
//! One async trait covers everything the bridge needs from the registry:
//! - fee lookup and oracle registration
//! - index lookup for a registered identity
//! - response submission
//! - the inbound request subscription
//!
//! The trait is backend-agnostic and object-safe. An in-memory fake is
//! provided in the `fakes` module.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::{GatewayError, TransportError};
use crate::schema::{AssignedIndexSet, BlockOffset, Fee, Identity, InboundRequest, ResponseSubmission};

/// Result type for gateway calls
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// One delivery from the request subscription.
pub type SubscriptionItem = std::result::Result<InboundRequest, TransportError>;

/// Lazy, unbounded, non-restartable sequence of deliveries.
pub type RequestStream = BoxStream<'static, SubscriptionItem>;

/// Ledger-resident oracle registry, reached over an RPC boundary.
///
/// Guarantees:
/// - `register_oracle` succeeds at most once per identity.
/// - `assigned_indexes` returns exactly three indices for a registered identity.
/// - `subscribe_requests` either fails up front or returns a stream that keeps
///   delivering; per-delivery failures arrive as `Err(TransportError)` items.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Accounts the ledger node will sign for.
    async fn accounts(&self) -> GatewayResult<Vec<Identity>>;

    /// Current fee required to register one oracle.
    async fn registration_fee(&self) -> GatewayResult<Fee>;

    /// Register `identity` as an oracle, paying `fee`.
    async fn register_oracle(&self, identity: &Identity, fee: Fee) -> GatewayResult<()>;

    /// Indices assigned to a registered `identity`.
    async fn assigned_indexes(&self, identity: &Identity) -> GatewayResult<AssignedIndexSet>;

    /// Submit one response, signed by `sender`.
    async fn submit_response(
        &self,
        submission: &ResponseSubmission,
        sender: &Identity,
    ) -> GatewayResult<()>;

    /// Open the request subscription starting at `from`.
    async fn subscribe_requests(&self, from: BlockOffset) -> GatewayResult<RequestStream>;
}
