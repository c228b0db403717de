//! Oracle Core Library
//!
//! Registration and response-matching engine for off-chain flight status
//! oracles. Agents are registered once at startup; afterwards every request
//! the ledger emits is matched against the roster and answered by each agent
//! holding the request's index.

mod deadline;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod obs;
pub mod registry;
pub mod status;
pub mod telemetry;

pub use dispatcher::{
    DispatchConfig, DispatchReport, DispatchSummary, RequestDispatcher, StopReason,
    SubmissionOutcome,
};
pub use error::{
    OracleError, PartialRegistrationError, RegistrationError, RegistrationStage, Result,
    SubmissionError,
};
pub use registry::{
    build_registry, register_available, Agent, AgentRegistry, RegistrationConfig, RegistrationReport,
    DEFAULT_CAPACITY,
};
pub use status::{
    FixedStatusGenerator, RandomStatusGenerator, SeededStatusGenerator, StatusGenerator,
    DRAWABLE_STATUS_CODES,
};

pub use metrics::METRICS;
pub use obs::{
    emit_agent_registered, emit_registration_failed, emit_request_received,
    emit_response_submitted, emit_submission_failed, emit_subscription_ended,
    emit_transport_error, RequestSpan,
};
pub use telemetry::{init_tracing, LogFormat};

/// Oracle bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
