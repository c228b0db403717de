//! Error taxonomy for the oracle engine.
//!
//! Only `OracleError` ever leaves the engine as a failure. The per-agent
//! errors below are collected into reports and logged; none of them stops a
//! registration batch or the dispatcher.

use ledger_gateway::{GatewayError, Identity, OracleIndex};

use crate::registry::AgentRegistry;

/// Step of the registration sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStage {
    Fee,
    Register,
    Indexes,
}

impl std::fmt::Display for RegistrationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RegistrationStage::Fee => "fee",
            RegistrationStage::Register => "register",
            RegistrationStage::Indexes => "indexes",
        };
        f.write_str(s)
    }
}

/// One identity could not be registered.
#[derive(Debug, Clone, thiserror::Error)]
#[error("oracle {identity} failed at {stage}: {source}")]
pub struct RegistrationError {
    pub identity: Identity,
    pub stage: RegistrationStage,
    #[source]
    pub source: GatewayError,
}

/// Registration finished with at least one failed identity.
///
/// Carries the registry of the identities that did succeed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} of {} oracle registrations failed", failures.len(), failures.len() + registry.len())]
pub struct PartialRegistrationError {
    pub registry: AgentRegistry,
    pub failures: Vec<RegistrationError>,
}

impl PartialRegistrationError {
    /// Identities that failed, in attempt order.
    pub fn failed_identities(&self) -> Vec<&Identity> {
        self.failures.iter().map(|f| &f.identity).collect()
    }
}

/// One response could not be submitted.
#[derive(Debug, Clone, thiserror::Error)]
#[error("submission by {identity} for index {index} failed: {source}")]
pub struct SubmissionError {
    pub identity: Identity,
    pub index: OracleIndex,
    #[source]
    pub source: GatewayError,
}

/// Engine-level failures (bootstrap only).
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("ledger gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, OracleError>;
