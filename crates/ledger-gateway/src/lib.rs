//! Ledger-Gateway: Registry Contract Boundary for the Flight Oracle Bridge
//!
//! This crate is the only wire-level boundary of the bridge. It describes the
//! ledger-resident oracle registry as a typed async interface and ships two
//! implementations of it: an in-memory fake for tests and a JSON-RPC client
//! for a live registry endpoint.
//!
//! ## Layer 0 - Ledger Access
//!
//! Focus: Typed calls, error classification, and the request subscription.
//!
//! ## Key Components
//!
//! - `LedgerGateway`: Fee lookup, registration, index lookup, submission, subscription
//! - `InboundRequest` / `ResponseSubmission`: Request event and its echoed answer
//! - `HttpLedgerGateway`: JSON-RPC over HTTP with a polling subscription
//! - `MemoryLedgerGateway`: Scriptable in-memory registry (testing)

mod error;
pub mod fakes;
mod http;
pub mod schema;
pub mod traits;

pub use error::{GatewayError, TransportError};
pub use http::{GatewayConfig, HttpLedgerGateway, DEFAULT_GAS_LIMIT};
pub use schema::{
    AssignedIndexSet, BlockOffset, Fee, Identity, InboundRequest, OracleIndex,
    ResponseSubmission, StatusCode,
};
pub use traits::{GatewayResult, LedgerGateway, RequestStream, SubscriptionItem};
