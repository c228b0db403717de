//! Agent Registry
//!
//! Registers a bounded set of identities with the ledger and keeps the
//! resulting roster. The roster is built once, sequentially, before any
//! request is dispatched, and is read-only afterwards. Share it as
//! `Arc<AgentRegistry>`; no locking is needed.

use std::time::Duration;

use ledger_gateway::{AssignedIndexSet, GatewayError, Identity, LedgerGateway, OracleIndex};
use serde::Serialize;
use tracing::{info, instrument};

use crate::deadline::bounded;
use crate::error::{PartialRegistrationError, RegistrationError, RegistrationStage, Result};
use crate::metrics::METRICS;
use crate::obs::{emit_agent_registered, emit_registration_failed};

/// Default cap on registered agents per run.
pub const DEFAULT_CAPACITY: usize = 20;

/// A registered oracle agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub identity: Identity,
    pub indexes: AssignedIndexSet,
}

impl Agent {
    /// Whether this agent is eligible to answer a request tagged `index`.
    pub fn answers(&self, index: OracleIndex) -> bool {
        self.indexes.contains(index)
    }
}

/// Immutable roster of registered agents, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
}

impl AgentRegistry {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Agent> {
        self.agents.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    /// Every agent holding `index`, by full linear scan.
    pub fn matching(&self, index: OracleIndex) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(move |a| a.answers(index))
    }
}

impl<'a> IntoIterator for &'a AgentRegistry {
    type Item = &'a Agent;
    type IntoIter = std::slice::Iter<'a, Agent>;

    fn into_iter(self) -> Self::IntoIter {
        self.agents.iter()
    }
}

/// Registration phase settings
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Maximum identities to register (default: 20)
    pub capacity: usize,
    /// Limit applied to each gateway call
    pub call_timeout: Option<Duration>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            call_timeout: None,
        }
    }
}

impl RegistrationConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

/// Outcome of a registration batch.
#[derive(Debug, Clone)]
pub struct RegistrationReport {
    /// Agents that registered and returned their indices
    pub registry: AgentRegistry,
    /// Identities that did not, in attempt order
    pub failures: Vec<RegistrationError>,
}

impl RegistrationReport {
    /// Number of identities attempted.
    pub fn attempted(&self) -> usize {
        self.registry.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fail if any identity failed; the error still carries the partial roster.
    pub fn into_result(self) -> std::result::Result<AgentRegistry, PartialRegistrationError> {
        if self.failures.is_empty() {
            Ok(self.registry)
        } else {
            Err(PartialRegistrationError {
                registry: self.registry,
                failures: self.failures,
            })
        }
    }
}

/// Register up to `config.capacity` of `identities`, one at a time.
///
/// Per identity: fetch the current fee, register paying it, then fetch the
/// assigned indices. A failure at any step records the identity and moves on
/// to the next one; it never aborts the batch.
#[instrument(skip_all, fields(available = identities.len(), capacity = config.capacity))]
pub async fn build_registry(
    gateway: &dyn LedgerGateway,
    identities: &[Identity],
    config: &RegistrationConfig,
) -> RegistrationReport {
    let count = identities.len().min(config.capacity);
    let mut agents = Vec::with_capacity(count);
    let mut failures = Vec::new();

    for identity in &identities[..count] {
        match register_one(gateway, identity, config.call_timeout).await {
            Ok(agent) => {
                emit_agent_registered(&agent.identity, &agent.indexes);
                METRICS.inc_registrations();
                agents.push(agent);
            }
            Err(err) => {
                emit_registration_failed(&err.identity, err.stage, &err.source);
                METRICS.inc_registration_failures();
                failures.push(err);
            }
        }
    }

    info!(
        registered = agents.len(),
        failed = failures.len(),
        "Oracle registration finished"
    );

    RegistrationReport {
        registry: AgentRegistry::new(agents),
        failures,
    }
}

/// Register from the accounts the ledger node manages.
///
/// Failing to list accounts is fatal; everything after that follows
/// [`build_registry`].
pub async fn register_available(
    gateway: &dyn LedgerGateway,
    config: &RegistrationConfig,
) -> Result<RegistrationReport> {
    let identities = bounded(config.call_timeout, gateway.accounts()).await?;
    info!(accounts = identities.len(), "Ledger accounts available");
    Ok(build_registry(gateway, &identities, config).await)
}

async fn register_one(
    gateway: &dyn LedgerGateway,
    identity: &Identity,
    limit: Option<Duration>,
) -> std::result::Result<Agent, RegistrationError> {
    let fee = bounded(limit, gateway.registration_fee())
        .await
        .map_err(failed_at(identity, RegistrationStage::Fee))?;
    bounded(limit, gateway.register_oracle(identity, fee))
        .await
        .map_err(failed_at(identity, RegistrationStage::Register))?;
    let indexes = bounded(limit, gateway.assigned_indexes(identity))
        .await
        .map_err(failed_at(identity, RegistrationStage::Indexes))?;

    Ok(Agent {
        identity: identity.clone(),
        indexes,
    })
}

fn failed_at(
    identity: &Identity,
    stage: RegistrationStage,
) -> impl FnOnce(GatewayError) -> RegistrationError + '_ {
    move |source| RegistrationError {
        identity: identity.clone(),
        stage,
        source,
    }
}
