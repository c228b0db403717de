//! Observability tests for the oracle lifecycle.
//!
//! Registration, delivery, and submission each emit a structured event
//! tagged with an `event` field; these tests check the events surface.

use std::sync::Arc;

use ledger_gateway::fakes::MemoryLedgerGateway;
use ledger_gateway::*;
use oracle_core::{
    build_registry, emit_agent_registered, emit_registration_failed, emit_request_received,
    emit_submission_failed, emit_subscription_ended, emit_transport_error, DispatchConfig,
    FixedStatusGenerator, RegistrationConfig, RegistrationStage, RequestDispatcher, RequestSpan,
};
use tracing::Instrument;
use tracing_test::traced_test;

fn request(index: u32) -> InboundRequest {
    InboundRequest {
        index: OracleIndex(index),
        airline: Identity::new("0xairline"),
        flight: "ND1309".to_string(),
        timestamp: 1_700_000_000,
        block: Some(7),
    }
}

#[traced_test]
#[test]
fn agent_registered_event_names_indexes() {
    emit_agent_registered(&Identity::new("0xa1"), &AssignedIndexSet::from([1, 2, 3]));

    assert!(logs_contain("oracle.registered"));
    assert!(logs_contain("0xa1"));
}

#[traced_test]
#[test]
fn registration_failure_is_a_warning() {
    emit_registration_failed(
        &Identity::new("0xa2"),
        RegistrationStage::Fee,
        &GatewayError::Transport("node unreachable".into()),
    );

    assert!(logs_contain("WARN"));
    assert!(logs_contain("oracle.registration_failed"));
    assert!(logs_contain("node unreachable"));
}

#[traced_test]
#[test]
fn request_received_reports_match_count() {
    emit_request_received(&request(4), 2);

    assert!(logs_contain("request.received"));
    assert!(logs_contain("matched=2"));
}

#[traced_test]
#[test]
fn submission_failure_carries_full_tuple() {
    let submission = ResponseSubmission::answer(&request(4), StatusCode::LateTechnical);
    emit_submission_failed(&Identity::new("0xa3"), &submission, &"reverted");

    assert!(logs_contain("response.failed"));
    assert!(logs_contain("ND1309"));
    assert!(logs_contain("status=40"));
    assert!(logs_contain("reverted"));
}

#[traced_test]
#[test]
fn subscription_events_are_warnings() {
    emit_transport_error(&TransportError::new("socket closed"));
    emit_subscription_ended(3);

    assert!(logs_contain("subscription.transport_error"));
    assert!(logs_contain("socket closed"));
    assert!(logs_contain("subscription.ended"));
}

#[traced_test]
#[tokio::test]
async fn request_span_tags_nested_events() {
    let req = request(1);
    let span = RequestSpan::new(&req);
    let id = span.delivery_id().to_string();

    async { emit_request_received(&req, 0) }
        .instrument(span.span().clone())
        .await;

    assert!(logs_contain("oracle.request"));
    assert!(logs_contain(&id));
}

#[traced_test]
#[tokio::test]
async fn registration_and_dispatch_emit_lifecycle_events() {
    let gateway = Arc::new(MemoryLedgerGateway::new().with_indexes("0xa1", [1, 2, 3]));
    let registry = build_registry(
        gateway.as_ref(),
        &[Identity::new("0xa1")],
        &RegistrationConfig::default(),
    )
    .await
    .registry;
    let dispatcher = RequestDispatcher::new(
        gateway.clone(),
        Arc::new(registry),
        Arc::new(FixedStatusGenerator(StatusCode::OnTime)),
        DispatchConfig::default(),
    );

    dispatcher.handle_request(&request(2)).await;

    assert!(logs_contain("oracle.registered"));
    assert!(logs_contain("request.received"));
    assert!(logs_contain("response.submitted"));
    assert!(!logs_contain("response.failed"));
}
