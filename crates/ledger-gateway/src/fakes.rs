//! In-memory fake of the ledger registry (testing only)
//!
//! `MemoryLedgerGateway` satisfies the `LedgerGateway` contract without a
//! network: it charges a fee, assigns indices, rejects duplicates, records
//! submissions, and feeds the request subscription from a channel the test
//! drives through `emit_request` / `emit_transport_error`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::{GatewayError, TransportError};
use crate::schema::*;
use crate::traits::*;

/// Default fee charged by the fake: one whole unit at 18 decimals.
pub const DEFAULT_FAKE_FEE: Fee = Fee(1_000_000_000_000_000_000);

/// Indices handed out by the fake cycle through `0..INDEX_SPACE`.
const INDEX_SPACE: u32 = 10;

#[derive(Debug)]
struct RegistryState {
    fee: Fee,
    accounts: Vec<Identity>,
    preassigned: HashMap<Identity, AssignedIndexSet>,
    registered: HashMap<Identity, AssignedIndexSet>,
    fee_lookups: usize,
    failing_fee_lookups: usize,
    failing_registrations: HashSet<Identity>,
    failing_index_lookups: HashSet<Identity>,
    failing_submissions: HashSet<Identity>,
    attempts: Vec<(Identity, ResponseSubmission)>,
    accepted: Vec<(Identity, ResponseSubmission)>,
}

/// In-memory ledger registry backed by a `Mutex<RegistryState>`.
#[derive(Debug)]
pub struct MemoryLedgerGateway {
    state: Mutex<RegistryState>,
    sender: Mutex<Option<mpsc::UnboundedSender<SubscriptionItem>>>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<SubscriptionItem>>>,
}

impl Default for MemoryLedgerGateway {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(RegistryState {
                fee: DEFAULT_FAKE_FEE,
                accounts: Vec::new(),
                preassigned: HashMap::new(),
                registered: HashMap::new(),
                fee_lookups: 0,
                failing_fee_lookups: 0,
                failing_registrations: HashSet::new(),
                failing_index_lookups: HashSet::new(),
                failing_submissions: HashSet::new(),
                attempts: Vec::new(),
                accepted: Vec::new(),
            }),
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
        }
    }
}

impl MemoryLedgerGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the registration fee.
    pub fn with_fee(self, fee: Fee) -> Self {
        self.state.lock().unwrap().fee = fee;
        self
    }

    /// Set the accounts returned by `accounts()`.
    pub fn with_accounts<I, T>(self, accounts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identity>,
    {
        self.state.lock().unwrap().accounts = accounts.into_iter().map(Into::into).collect();
        self
    }

    /// Pin the indices `identity` receives when it registers.
    pub fn with_indexes(self, identity: impl Into<Identity>, indexes: [u32; 3]) -> Self {
        self.state
            .lock()
            .unwrap()
            .preassigned
            .insert(identity.into(), AssignedIndexSet::from(indexes));
        self
    }

    /// Make the first `count` fee lookups fail with a transport error.
    pub fn failing_fee_lookups(self, count: usize) -> Self {
        self.state.lock().unwrap().failing_fee_lookups = count;
        self
    }

    /// Reject registration for `identity`.
    pub fn failing_registration(self, identity: impl Into<Identity>) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_registrations
            .insert(identity.into());
        self
    }

    /// Accept registration for `identity` but fail its index lookup.
    pub fn failing_index_lookup(self, identity: impl Into<Identity>) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_index_lookups
            .insert(identity.into());
        self
    }

    /// Reject every submission signed by `identity`.
    pub fn failing_submissions(self, identity: impl Into<Identity>) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_submissions
            .insert(identity.into());
        self
    }

    /// Deliver a request to the subscription.
    pub fn emit_request(&self, request: InboundRequest) {
        self.push(Ok(request));
    }

    /// Deliver a transport failure to the subscription.
    pub fn emit_transport_error(&self, message: &str) {
        self.push(Err(TransportError::new(message)));
    }

    /// End the subscription once buffered deliveries are drained.
    pub fn close_requests(&self) {
        self.sender.lock().unwrap().take();
    }

    fn push(&self, item: SubscriptionItem) {
        if let Some(tx) = self.sender.lock().unwrap().as_ref() {
            // Receiver may already be dropped; deliveries are best-effort.
            let _ = tx.send(item);
        }
    }

    /// Every submission attempt, accepted or not, in arrival order.
    pub fn attempts(&self) -> Vec<(Identity, ResponseSubmission)> {
        self.state.lock().unwrap().attempts.clone()
    }

    /// Submissions the fake accepted, in arrival order.
    pub fn submissions(&self) -> Vec<(Identity, ResponseSubmission)> {
        self.state.lock().unwrap().accepted.clone()
    }

    /// Accepted submissions signed by `identity`.
    pub fn submissions_from(&self, identity: &Identity) -> Vec<ResponseSubmission> {
        self.state
            .lock()
            .unwrap()
            .accepted
            .iter()
            .filter(|(sender, _)| sender == identity)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.state.lock().unwrap().registered.contains_key(identity)
    }

    pub fn registered_count(&self) -> usize {
        self.state.lock().unwrap().registered.len()
    }

    /// Number of fee lookups served or failed so far.
    pub fn fee_lookups(&self) -> usize {
        self.state.lock().unwrap().fee_lookups
    }
}

#[async_trait]
impl LedgerGateway for MemoryLedgerGateway {
    async fn accounts(&self) -> GatewayResult<Vec<Identity>> {
        Ok(self.state.lock().unwrap().accounts.clone())
    }

    async fn registration_fee(&self) -> GatewayResult<Fee> {
        let mut state = self.state.lock().unwrap();
        state.fee_lookups += 1;
        if state.failing_fee_lookups > 0 {
            state.failing_fee_lookups -= 1;
            return Err(GatewayError::Transport("fee lookup unavailable".to_string()));
        }
        Ok(state.fee)
    }

    async fn register_oracle(&self, identity: &Identity, fee: Fee) -> GatewayResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_registrations.contains(identity) {
            return Err(GatewayError::Rejected(format!(
                "registration refused for {identity}"
            )));
        }
        if fee < state.fee {
            return Err(GatewayError::Rejected(format!(
                "registration fee is required: paid {fee}, need {}",
                state.fee
            )));
        }
        if state.registered.contains_key(identity) {
            return Err(GatewayError::Rejected(format!(
                "oracle {identity} already registered"
            )));
        }
        let indexes = match state.preassigned.get(identity) {
            Some(set) => *set,
            None => {
                let base = (state.registered.len() as u32) * 3;
                AssignedIndexSet::from([
                    base % INDEX_SPACE,
                    (base + 1) % INDEX_SPACE,
                    (base + 2) % INDEX_SPACE,
                ])
            }
        };
        state.registered.insert(identity.clone(), indexes);
        Ok(())
    }

    async fn assigned_indexes(&self, identity: &Identity) -> GatewayResult<AssignedIndexSet> {
        let state = self.state.lock().unwrap();
        if state.failing_index_lookups.contains(identity) {
            return Err(GatewayError::Transport(format!(
                "index lookup dropped for {identity}"
            )));
        }
        state
            .registered
            .get(identity)
            .copied()
            .ok_or_else(|| GatewayError::Rejected(format!("not registered as an oracle: {identity}")))
    }

    async fn submit_response(
        &self,
        submission: &ResponseSubmission,
        sender: &Identity,
    ) -> GatewayResult<()> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push((sender.clone(), submission.clone()));

        if state.failing_submissions.contains(sender) {
            return Err(GatewayError::Rejected(format!(
                "submission refused for {sender}"
            )));
        }
        let authorized = state
            .registered
            .get(sender)
            .map(|set| set.contains(submission.index()))
            .unwrap_or(false);
        if !authorized {
            return Err(GatewayError::Rejected(format!(
                "index {} does not match oracle request for {sender}",
                submission.index()
            )));
        }
        state.accepted.push((sender.clone(), submission.clone()));
        Ok(())
    }

    async fn subscribe_requests(&self, from: BlockOffset) -> GatewayResult<RequestStream> {
        let rx = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or(GatewayError::AlreadySubscribed)?;

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .filter(move |item| {
            let keep = match item {
                Ok(request) => request.block.map(|b| b >= from.0).unwrap_or(true),
                Err(_) => true,
            };
            futures::future::ready(keep)
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_assignment_cycles_index_space() {
        let gateway = MemoryLedgerGateway::new();
        for n in 0..4 {
            let id = Identity::new(format!("0x{n}"));
            gateway.register_oracle(&id, DEFAULT_FAKE_FEE).await.unwrap();
        }
        let fourth = gateway.assigned_indexes(&Identity::new("0x3")).await.unwrap();
        assert_eq!(fourth, AssignedIndexSet::from([9, 0, 1]));
    }

    #[tokio::test]
    async fn fee_failures_are_consumed_in_order() {
        let gateway = MemoryLedgerGateway::new().failing_fee_lookups(1);
        assert!(gateway.registration_fee().await.is_err());
        assert_eq!(gateway.registration_fee().await.unwrap(), DEFAULT_FAKE_FEE);
        assert_eq!(gateway.fee_lookups(), 2);
    }
}
