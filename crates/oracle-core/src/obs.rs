//! Structured observability hooks for the oracle lifecycle.
//!
//! This module provides:
//! - Request-scoped tracing spans via `RequestSpan`
//! - Emission functions for registration, delivery, and submission events
//!
//! The bridge is headless; these events are the only place failures surface.

use ledger_gateway::{
    AssignedIndexSet, GatewayError, Identity, InboundRequest, ResponseSubmission, TransportError,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::RegistrationStage;

/// Span tagged with one delivery's identifiers.
///
/// Not entered on creation: attach it to the handling future with
/// `tracing::Instrument` so it stays valid across await points.
///
/// ```ignore
/// let span = RequestSpan::new(&request);
/// handle(&request).instrument(span.span().clone()).await;
/// ```
pub struct RequestSpan {
    delivery_id: Uuid,
    span: tracing::Span,
}

impl RequestSpan {
    pub fn new(request: &InboundRequest) -> Self {
        let delivery_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "oracle.request",
            delivery_id = %delivery_id,
            index = request.index.0,
            flight = %request.flight,
        );
        Self { delivery_id, span }
    }

    /// Correlation id attached to every event inside the span.
    pub fn delivery_id(&self) -> Uuid {
        self.delivery_id
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

pub fn emit_agent_registered(identity: &Identity, indexes: &AssignedIndexSet) {
    info!(
        event = "oracle.registered",
        identity = %identity,
        indexes = %indexes,
    );
}

pub fn emit_registration_failed(identity: &Identity, stage: RegistrationStage, error: &GatewayError) {
    warn!(
        event = "oracle.registration_failed",
        identity = %identity,
        stage = %stage,
        error = %error,
    );
}

/// Emit event: a request arrived and `matched` agents hold its index.
pub fn emit_request_received(request: &InboundRequest, matched: usize) {
    info!(
        event = "request.received",
        index = request.index.0,
        airline = %request.airline,
        flight = %request.flight,
        timestamp = request.timestamp,
        block = ?request.block,
        matched = matched,
    );
}

pub fn emit_response_submitted(sender: &Identity, submission: &ResponseSubmission) {
    info!(
        event = "response.submitted",
        sender = %sender,
        index = submission.index().0,
        status = submission.status().code(),
    );
}

/// Emit event: one response failed (warning level). Never retried.
pub fn emit_submission_failed(
    sender: &Identity,
    submission: &ResponseSubmission,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "response.failed",
        sender = %sender,
        index = submission.index().0,
        airline = %submission.airline(),
        flight = %submission.flight(),
        timestamp = submission.timestamp(),
        status = submission.status().code(),
        error = %error,
    );
}

pub fn emit_transport_error(error: &TransportError) {
    warn!(event = "subscription.transport_error", error = %error);
}

/// Emit event: the subscription stopped delivering (it cannot be reopened).
pub fn emit_subscription_ended(requests: u64) {
    warn!(event = "subscription.ended", requests = requests);
}
