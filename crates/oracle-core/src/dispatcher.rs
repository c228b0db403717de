//! Request Dispatcher
//!
//! Consumes the ledger's request subscription in delivery order. For every
//! request it selects the registered agents holding the request's index,
//! draws one status per agent, and submits each response independently:
//! - submissions for one request run concurrently
//! - each returns its own `SubmissionOutcome`; failures are logged, never retried
//! - transport errors on the stream are logged and listening continues
//!
//! There is no deduplication. A request delivered twice is answered twice.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use ledger_gateway::{
    BlockOffset, GatewayResult, Identity, InboundRequest, LedgerGateway, RequestStream,
    ResponseSubmission, SubscriptionItem,
};
use serde::Serialize;
use tracing::{info, instrument, warn, Instrument};

use crate::deadline::bounded;
use crate::error::SubmissionError;
use crate::metrics::METRICS;
use crate::obs::{
    emit_request_received, emit_response_submitted, emit_submission_failed,
    emit_subscription_ended, emit_transport_error, RequestSpan,
};
use crate::registry::{Agent, AgentRegistry};
use crate::status::StatusGenerator;

/// Dispatch phase settings
#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    /// Where the request subscription starts (default: genesis)
    pub from_block: BlockOffset,
    /// Limit applied to each submission call
    pub call_timeout: Option<Duration>,
}

impl DispatchConfig {
    pub fn from_block(mut self, from: BlockOffset) -> Self {
        self.from_block = from;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

/// Result of one submission attempt.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub identity: Identity,
    pub submission: ResponseSubmission,
    pub result: std::result::Result<(), SubmissionError>,
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything that happened for one request.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub request: InboundRequest,
    /// One entry per matching agent, in registry order
    pub outcomes: Vec<SubmissionOutcome>,
}

impl DispatchReport {
    pub fn matched(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.matched() - self.succeeded()
    }
}

/// Why the dispatch loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    #[default]
    Shutdown,
    StreamEnded,
}

/// Totals over the lifetime of one dispatch loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub requests: u64,
    pub transport_errors: u64,
    pub submissions_attempted: u64,
    pub submissions_failed: u64,
    pub stop: StopReason,
}

impl DispatchSummary {
    fn record(&mut self, handled: Option<DispatchReport>) {
        match handled {
            Some(report) => {
                self.requests += 1;
                self.submissions_attempted += report.matched() as u64;
                self.submissions_failed += report.failed() as u64;
            }
            None => self.transport_errors += 1,
        }
    }
}

/// Matches inbound requests against the registry and submits responses.
pub struct RequestDispatcher {
    gateway: Arc<dyn LedgerGateway>,
    registry: Arc<AgentRegistry>,
    generator: Arc<dyn StatusGenerator>,
    config: DispatchConfig,
}

impl RequestDispatcher {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        registry: Arc<AgentRegistry>,
        generator: Arc<dyn StatusGenerator>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            gateway,
            registry,
            generator,
            config,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Open the request subscription at the configured offset.
    pub async fn subscribe(&self) -> GatewayResult<RequestStream> {
        self.gateway.subscribe_requests(self.config.from_block).await
    }

    /// Answer one request with every matching agent.
    ///
    /// An empty match is a no-op. Submissions are issued concurrently and
    /// one failing does not affect the others.
    pub async fn handle_request(&self, request: &InboundRequest) -> DispatchReport {
        let span = RequestSpan::new(request);
        async {
            let matched: Vec<&Agent> = self.registry.matching(request.index).collect();
            METRICS.inc_requests();
            emit_request_received(request, matched.len());

            let outcomes = futures::future::join_all(
                matched.into_iter().map(|agent| self.submit(agent, request)),
            )
            .await;

            DispatchReport {
                request: request.clone(),
                outcomes,
            }
        }
        .instrument(span.span().clone())
        .await
    }

    /// Handle one delivery. Transport errors are logged and yield `None`.
    pub async fn handle_item(&self, item: SubscriptionItem) -> Option<DispatchReport> {
        match item {
            Ok(request) => Some(self.handle_request(&request).await),
            Err(err) => {
                METRICS.inc_transport_errors();
                emit_transport_error(&err);
                None
            }
        }
    }

    /// Consume `stream` until `shutdown` resolves or the stream ends.
    ///
    /// Deliveries are handled one at a time in arrival order. On shutdown,
    /// submissions still in flight are abandoned and the stream is dropped.
    pub async fn run<S, F>(&self, mut stream: S, shutdown: F) -> DispatchSummary
    where
        S: Stream<Item = SubscriptionItem> + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut summary = DispatchSummary::default();
        info!(
            agents = self.registry.len(),
            from_block = self.config.from_block.0,
            "Dispatcher listening for oracle requests"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    summary.stop = StopReason::Shutdown;
                    break;
                }
                next = stream.next() => match next {
                    Some(item) => {
                        tokio::select! {
                            biased;
                            _ = &mut shutdown => {
                                warn!("Shutdown during dispatch, abandoning in-flight submissions");
                                summary.stop = StopReason::Shutdown;
                                break;
                            }
                            handled = self.handle_item(item) => summary.record(handled),
                        }
                    }
                    None => {
                        emit_subscription_ended(summary.requests);
                        summary.stop = StopReason::StreamEnded;
                        break;
                    }
                },
            }
        }

        drop(stream);
        info!(
            requests = summary.requests,
            transport_errors = summary.transport_errors,
            submissions_attempted = summary.submissions_attempted,
            submissions_failed = summary.submissions_failed,
            stop = ?summary.stop,
            "Dispatcher stopped"
        );
        summary
    }

    /// Subscribe, then run until `shutdown`. Only the subscribe call can fail.
    #[instrument(skip_all, fields(from_block = self.config.from_block.0))]
    pub async fn listen<F>(&self, shutdown: F) -> GatewayResult<DispatchSummary>
    where
        F: Future<Output = ()>,
    {
        let stream = self.subscribe().await?;
        Ok(self.run(stream, shutdown).await)
    }

    async fn submit(&self, agent: &Agent, request: &InboundRequest) -> SubmissionOutcome {
        let status = self.generator.generate(request);
        let submission = ResponseSubmission::answer(request, status);
        METRICS.inc_submissions();

        let result = bounded(
            self.config.call_timeout,
            self.gateway.submit_response(&submission, &agent.identity),
        )
        .await
        .map_err(|source| SubmissionError {
            identity: agent.identity.clone(),
            index: request.index,
            source,
        });

        match &result {
            Ok(()) => emit_response_submitted(&agent.identity, &submission),
            Err(err) => {
                METRICS.inc_submission_failures();
                emit_submission_failed(&agent.identity, &submission, err);
            }
        }

        SubmissionOutcome {
            identity: agent.identity.clone(),
            submission,
            result,
        }
    }
}
