//! The injected wallet provider seam.
//!
//! [`ProviderHandle`] is the capability a page hands to the adapter: the
//! handful of EIP-1193 requests this crate issues plus a way to listen for
//! account and chain changes.
//!
//! # Architecture
//!
//! ```text
//! ProviderHandle (injected wallet, or MockProvider in tests)
//!   ├── request_accounts() → eth_requestAccounts (may prompt)
//!   ├── accounts()         → eth_accounts (silent)
//!   ├── chain_id()         → eth_chainId
//!   ├── switch_chain()     → wallet_switchEthereumChain
//!   ├── add_chain()        → wallet_addEthereumChain
//!   └── subscribe()        → Subscription (released on drop)
//! ```

use std::fmt;

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::chain::{ChainDescriptor, ChainId};
use crate::error::ProviderError;
use crate::wasm_compat::{WasmCompatSend, WasmCompatSync};

#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockProvider, RecordedRequest};

/// Prompts the user to reveal accounts.
pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
/// Returns already-authorized accounts without prompting.
pub const ETH_ACCOUNTS: &str = "eth_accounts";
/// Returns the active chain id as a hex string.
pub const ETH_CHAIN_ID: &str = "eth_chainId";
/// Switches the active chain.
pub const WALLET_SWITCH_ETHEREUM_CHAIN: &str = "wallet_switchEthereumChain";
/// Registers and activates a chain.
pub const WALLET_ADD_ETHEREUM_CHAIN: &str = "wallet_addEthereumChain";

/// Provider event name for account changes.
pub const ACCOUNTS_CHANGED: &str = "accountsChanged";
/// Provider event name for chain changes.
pub const CHAIN_CHANGED: &str = "chainChanged";

/// Default capacity of an [`EventHub`].
pub const DEFAULT_EVENT_CAPACITY: usize = 16;

/// A notification pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Authorized accounts changed. An empty list means disconnected.
    AccountsChanged(Vec<Address>),
    /// The active chain changed.
    ChainChanged(ChainId),
}

/// Capability handle for an injected wallet.
///
/// Every request may suspend until the wallet (or the user, for prompts)
/// answers. Requests cannot be cancelled once issued.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ProviderHandle: fmt::Debug + WasmCompatSend + WasmCompatSync {
    /// Ask the wallet to reveal accounts. May prompt the user.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Accounts the page is already authorized for. Never prompts.
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// The wallet's active chain id.
    async fn chain_id(&self) -> Result<ChainId, ProviderError>;

    /// Ask the wallet to switch its active chain.
    ///
    /// Fails with code 4902 if the wallet does not know the chain.
    async fn switch_chain(&self, chain_id: &str) -> Result<(), ProviderError>;

    /// Ask the wallet to register (and activate) a chain.
    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), ProviderError>;

    /// Start listening for provider events.
    fn subscribe(&self) -> Subscription;
}

/// Fan-out of provider events to any number of [`Subscription`]s.
///
/// Provider implementations embed one and push every wallet notification
/// through [`EventHub::emit`].
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<ProviderEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventHub {
    /// Create a hub buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        debug!(
            subscribers = self.tx.receiver_count() + 1,
            "provider subscription acquired"
        );
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver `event` to every live subscriber. Returns how many received it.
    pub fn emit(&self, event: ProviderEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "no provider subscribers, event dropped");
                0
            }
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live listener on provider events.
///
/// Dropping the subscription releases it; no event is delivered to it
/// afterwards.
pub struct Subscription {
    rx: broadcast::Receiver<ProviderEvent>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pending", &self.rx.len())
            .finish()
    }
}

impl Subscription {
    /// Wait for the next event.
    ///
    /// Returns `None` once the provider side has gone away. Events missed
    /// because this subscriber fell behind are skipped.
    pub async fn recv(&mut self) -> Option<ProviderEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "provider subscriber lagged, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<ProviderEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "provider subscriber lagged, events skipped");
                }
                Err(_) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("provider subscription released");
    }
}
