//! Contract tests for the LedgerGateway trait.
//!
//! These tests pin the behaviour the bridge relies on, exercised through the
//! in-memory fake. Any conforming gateway must behave the same way.

use futures::StreamExt;
use ledger_gateway::fakes::{MemoryLedgerGateway, DEFAULT_FAKE_FEE};
use ledger_gateway::*;

fn request(index: u32, block: Option<u64>) -> InboundRequest {
    InboundRequest {
        index: OracleIndex(index),
        airline: Identity::new("0xairline"),
        flight: "ND1309".to_string(),
        timestamp: 1_700_000_000,
        block,
    }
}

// ===========================================================================
// Registration
// ===========================================================================

#[tokio::test]
async fn accounts_are_returned_in_order() {
    let gateway = MemoryLedgerGateway::new().with_accounts(["0xa", "0xb", "0xc"]);
    let accounts = gateway.accounts().await.unwrap();

    assert_eq!(
        accounts,
        vec![Identity::new("0xa"), Identity::new("0xb"), Identity::new("0xc")]
    );
}

#[tokio::test]
async fn register_then_fetch_three_indexes() {
    let gateway = MemoryLedgerGateway::new().with_indexes("0xa", [4, 5, 6]);
    let id = Identity::new("0xa");
    let fee = gateway.registration_fee().await.unwrap();

    gateway.register_oracle(&id, fee).await.unwrap();
    let indexes = gateway.assigned_indexes(&id).await.unwrap();

    assert_eq!(indexes, AssignedIndexSet::from([4, 5, 6]));
    assert_eq!(indexes.len(), 3);
}

#[tokio::test]
async fn register_rejects_insufficient_fee() {
    let gateway = MemoryLedgerGateway::new().with_fee(Fee(100));
    let err = gateway
        .register_oracle(&Identity::new("0xa"), Fee(99))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Rejected(_)));
    assert!(err.is_rejection());
}

#[tokio::test]
async fn register_rejects_duplicate() {
    let gateway = MemoryLedgerGateway::new();
    let id = Identity::new("0xa");
    gateway.register_oracle(&id, DEFAULT_FAKE_FEE).await.unwrap();

    let err = gateway.register_oracle(&id, DEFAULT_FAKE_FEE).await.unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)));
    assert_eq!(gateway.registered_count(), 1);
}

#[tokio::test]
async fn indexes_unknown_for_unregistered_identity() {
    let gateway = MemoryLedgerGateway::new();
    let err = gateway
        .assigned_indexes(&Identity::new("0xnobody"))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Rejected(_)));
}

// ===========================================================================
// Submission
// ===========================================================================

#[tokio::test]
async fn submission_accepted_for_assigned_index() {
    let gateway = MemoryLedgerGateway::new().with_indexes("0xa", [1, 2, 3]);
    let id = Identity::new("0xa");
    gateway.register_oracle(&id, DEFAULT_FAKE_FEE).await.unwrap();

    let submission = ResponseSubmission::answer(&request(2, None), StatusCode::LateWeather);
    gateway.submit_response(&submission, &id).await.unwrap();

    assert_eq!(gateway.submissions_from(&id), vec![submission]);
}

#[tokio::test]
async fn submission_rejected_for_foreign_index() {
    let gateway = MemoryLedgerGateway::new().with_indexes("0xa", [1, 2, 3]);
    let id = Identity::new("0xa");
    gateway.register_oracle(&id, DEFAULT_FAKE_FEE).await.unwrap();

    let submission = ResponseSubmission::answer(&request(9, None), StatusCode::OnTime);
    let err = gateway.submit_response(&submission, &id).await.unwrap_err();

    assert!(matches!(err, GatewayError::Rejected(_)));
    assert_eq!(gateway.attempts().len(), 1);
    assert!(gateway.submissions().is_empty());
}

// ===========================================================================
// Subscription
// ===========================================================================

#[tokio::test]
async fn subscription_delivers_requests_and_transport_errors_in_order() {
    let gateway = MemoryLedgerGateway::new();
    gateway.emit_request(request(1, Some(1)));
    gateway.emit_transport_error("socket closed");
    gateway.emit_request(request(2, Some(2)));
    gateway.close_requests();

    let items: Vec<SubscriptionItem> = gateway
        .subscribe_requests(BlockOffset::GENESIS)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap().index, OracleIndex(1));
    assert!(items[1].is_err());
    assert_eq!(items[2].as_ref().unwrap().index, OracleIndex(2));
}

#[tokio::test]
async fn subscription_skips_requests_before_offset() {
    let gateway = MemoryLedgerGateway::new();
    gateway.emit_request(request(1, Some(3)));
    gateway.emit_request(request(2, Some(10)));
    gateway.emit_request(request(3, None));
    gateway.close_requests();

    let items: Vec<SubscriptionItem> = gateway
        .subscribe_requests(BlockOffset(5))
        .await
        .unwrap()
        .collect()
        .await;

    let indexes: Vec<u32> = items.into_iter().map(|i| i.unwrap().index.0).collect();
    assert_eq!(indexes, vec![2, 3]);
}

#[tokio::test]
async fn subscription_is_not_restartable() {
    let gateway = MemoryLedgerGateway::new();
    let _first = gateway.subscribe_requests(BlockOffset::GENESIS).await.unwrap();

    let err = gateway
        .subscribe_requests(BlockOffset::GENESIS)
        .await
        .err()
        .unwrap();
    assert_eq!(err, GatewayError::AlreadySubscribed);
}
