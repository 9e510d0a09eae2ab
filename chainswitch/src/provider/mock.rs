//! Scripted in-memory provider for tests.
//!
//! Behaves like a browser wallet that knows a set of chains: switching to an
//! unknown chain fails with 4902, adding a chain makes it known and active,
//! and chain changes are announced to subscribers. Failures can be queued
//! per method, and every request is recorded.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::{
    ETH_ACCOUNTS, ETH_CHAIN_ID, ETH_REQUEST_ACCOUNTS, EventHub, ProviderEvent, ProviderHandle,
    Subscription, WALLET_ADD_ETHEREUM_CHAIN, WALLET_SWITCH_ETHEREUM_CHAIN,
};
use crate::chain::{ChainDescriptor, ChainId};
use crate::error::ProviderError;

/// A request received by a [`MockProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// EIP-1193 method name.
    pub method: &'static str,
    /// Request params as they would be sent on the wire.
    pub params: Value,
}

#[derive(Debug, Default)]
struct MockState {
    accounts: Vec<Address>,
    authorized: bool,
    chain_id: String,
    known_chains: Vec<String>,
    failures: HashMap<&'static str, VecDeque<ProviderError>>,
    requests: Vec<RecordedRequest>,
}

/// In-memory [`ProviderHandle`] with scripted behavior.
#[derive(Debug)]
pub struct MockProvider {
    state: Mutex<MockState>,
    events: EventHub,
}

impl MockProvider {
    /// A wallet on `chain_id` that knows only that chain and has no accounts.
    #[must_use]
    pub fn new(chain_id: &str) -> Self {
        Self {
            state: Mutex::new(MockState {
                chain_id: chain_id.to_owned(),
                known_chains: vec![chain_id.to_owned()],
                ..MockState::default()
            }),
            events: EventHub::default(),
        }
    }

    /// Accounts revealed by `eth_requestAccounts`.
    #[must_use]
    pub fn with_accounts(self, accounts: impl IntoIterator<Item = Address>) -> Self {
        self.state().accounts = accounts.into_iter().collect();
        self
    }

    /// Mark the page as already authorized, so `eth_accounts` answers
    /// without a prior `eth_requestAccounts`.
    #[must_use]
    pub fn authorized(self) -> Self {
        self.state().authorized = true;
        self
    }

    /// Chains the wallet already knows, besides the active one.
    #[must_use]
    pub fn with_known_chains<'a>(self, chain_ids: impl IntoIterator<Item = &'a str>) -> Self {
        {
            let mut state = self.state();
            for id in chain_ids {
                if !state.known_chains.iter().any(|c| c == id) {
                    state.known_chains.push(id.to_owned());
                }
            }
        }
        self
    }

    /// Make the next call to `method` fail with `err`. Calls queue in order.
    pub fn fail_next(&self, method: &'static str, err: ProviderError) {
        self.state()
            .failures
            .entry(method)
            .or_default()
            .push_back(err);
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// Method names of every request received so far.
    #[must_use]
    pub fn methods(&self) -> Vec<&'static str> {
        self.state().requests.iter().map(|r| r.method).collect()
    }

    /// The wallet's active chain id.
    #[must_use]
    pub fn active_chain(&self) -> String {
        self.state().chain_id.clone()
    }

    /// Whether the wallet knows `chain_id`.
    #[must_use]
    pub fn knows_chain(&self, chain_id: &str) -> bool {
        self.state().known_chains.iter().any(|c| c == chain_id)
    }

    /// Simulate the user changing accounts in the wallet.
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state().accounts.clone_from(&accounts);
        self.events.emit(ProviderEvent::AccountsChanged(accounts));
    }

    /// Simulate the user changing chains in the wallet.
    pub fn set_chain(&self, chain_id: &str) {
        self.activate(chain_id);
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a request and pop a queued failure for it, if any.
    fn begin(&self, method: &'static str, params: Value) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.requests.push(RecordedRequest { method, params });
        match state.failures.get_mut(method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn activate(&self, chain_id: &str) {
        let changed = {
            let mut state = self.state();
            if !state.known_chains.iter().any(|c| c == chain_id) {
                state.known_chains.push(chain_id.to_owned());
            }
            let changed = state.chain_id != chain_id;
            chain_id.clone_into(&mut state.chain_id);
            changed
        };
        if changed {
            self.events
                .emit(ProviderEvent::ChainChanged(ChainId::from(chain_id)));
        }
    }
}

#[async_trait]
impl ProviderHandle for MockProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.begin(ETH_REQUEST_ACCOUNTS, json!([]))?;
        let mut state = self.state();
        state.authorized = true;
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.begin(ETH_ACCOUNTS, json!([]))?;
        let state = self.state();
        if state.authorized {
            Ok(state.accounts.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        self.begin(ETH_CHAIN_ID, json!([]))?;
        Ok(ChainId::new(self.state().chain_id.clone()))
    }

    async fn switch_chain(&self, chain_id: &str) -> Result<(), ProviderError> {
        self.begin(WALLET_SWITCH_ETHEREUM_CHAIN, json!([{ "chainId": chain_id }]))?;
        if !self.knows_chain(chain_id) {
            return Err(ProviderError::unrecognized_chain(chain_id));
        }
        self.activate(chain_id);
        Ok(())
    }

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), ProviderError> {
        let params = serde_json::to_value(descriptor)
            .map_err(|e| ProviderError::internal(format!("invalid chain params: {e}")))?;
        self.begin(WALLET_ADD_ETHEREUM_CHAIN, json!([params]))?;
        self.activate(descriptor.chain_id);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }
}
