//! Caller-side mirror of the wallet connection.
//!
//! A [`WalletSession`] remembers the account and chain the wallet last
//! reported, so a UI can render a status without asking again. The wallet
//! stays authoritative: the session only records what it observed from
//! requests and provider events, and the status is always recomputed from
//! the last observed chain id.
//!
//! # Examples
//!
//! ```rust,ignore
//! let session = WalletSession::builder()
//!     .provider(provider)
//!     .notifier(Arc::new(TracingNotifier))
//!     .build();
//!
//! session.restore().await?;
//! let mut events = session.subscribe();
//!
//! if !session.status().is_connected() {
//!     if let Some(connection) = session.connect().await? {
//!         println!("{}", connection.status());
//!     }
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::Address;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::adapter::{self, Connection, report_connection_failure};
use crate::chain::{ChainDescriptor, ChainId, Registry};
use crate::error::{Error, Result};
use crate::notify::{Notice, Notifier, TracingNotifier};
use crate::provider::{ProviderEvent, ProviderHandle, Subscription};
use crate::status::{ConnectionStatus, classify_chain};

#[derive(Debug, Default)]
struct Observed {
    account: Option<Address>,
    chain_id: Option<ChainId>,
}

/// Builder for a [`WalletSession`].
#[derive(Debug, Default)]
pub struct WalletSessionBuilder {
    provider: Option<Arc<dyn ProviderHandle>>,
    registry: Option<Registry>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl WalletSessionBuilder {
    /// Set the injected provider. Without one every request reports
    /// [`Error::ProviderUnavailable`].
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn ProviderHandle>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the chain registry (default: Ethereum and CoreDAO).
    #[must_use]
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the notice sink (default: [`TracingNotifier`]).
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Build the session.
    #[must_use]
    pub fn build(self) -> WalletSession {
        WalletSession {
            provider: self.provider,
            registry: self.registry.unwrap_or_default(),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
            observed: Mutex::new(Observed::default()),
            in_flight: AsyncMutex::new(()),
        }
    }
}

/// Mirror of the wallet's account and chain for one page.
///
/// At most one `connect`/`switch_to` request runs at a time; an overlapping
/// call fails with [`Error::Busy`] instead of queueing.
#[derive(Debug)]
pub struct WalletSession {
    provider: Option<Arc<dyn ProviderHandle>>,
    registry: Registry,
    notifier: Arc<dyn Notifier>,
    observed: Mutex<Observed>,
    in_flight: AsyncMutex<()>,
}

impl WalletSession {
    /// Create a builder for constructing a [`WalletSession`].
    #[must_use]
    pub fn builder() -> WalletSessionBuilder {
        WalletSessionBuilder::default()
    }

    /// Last observed account.
    #[must_use]
    pub fn account(&self) -> Option<Address> {
        self.observed().account
    }

    /// Last observed chain id.
    #[must_use]
    pub fn chain_id(&self) -> Option<ChainId> {
        self.observed().chain_id.clone()
    }

    /// Status derived from the last observed chain id.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        classify_chain(self.observed().chain_id.as_ref().map(ChainId::as_str))
    }

    /// Registry entry for the last observed chain, if it is registered.
    ///
    /// `None` with a chain id present means the wallet is on a chain this
    /// session does not support.
    #[must_use]
    pub fn current_chain(&self) -> Option<ChainDescriptor> {
        let observed = self.observed();
        let chain_id = observed.chain_id.as_ref()?;
        self.registry.lookup(chain_id.as_str()).copied()
    }

    /// The session's chain registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Whether a connect or switch request is in flight.
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Whether a provider was injected at all.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Listen for provider events. `None` without a provider.
    ///
    /// Feed received events to [`apply`](Self::apply) or
    /// [`drain`](Self::drain); drop the subscription on teardown.
    #[must_use]
    pub fn subscribe(&self) -> Option<Subscription> {
        self.provider.as_deref().map(|p| p.subscribe())
    }

    /// Restore a connection granted earlier, without prompting.
    ///
    /// # Errors
    ///
    /// The categorized provider failure. Nothing is recorded in that case.
    pub async fn restore(&self) -> Result<ConnectionStatus> {
        if let Some(connection) = adapter::check_connection(self.provider.as_deref()).await? {
            self.record(Some(connection.account), Some(connection.chain_id));
        }
        Ok(self.status())
    }

    /// Ask the wallet to connect and record what it reports.
    ///
    /// Returns `Ok(None)` when the wallet reveals no accounts; the mirrored
    /// state is left untouched in that case.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] while another request is in flight. Provider failures
    /// are reported through the notifier and returned.
    pub async fn connect(&self) -> Result<Option<Connection>> {
        let _guard = self.in_flight.try_lock().map_err(|_| Error::Busy)?;

        match adapter::try_request_connection(self.provider.as_deref()).await {
            Ok(Some(connection)) => {
                self.record(Some(connection.account), Some(connection.chain_id.clone()));
                Ok(Some(connection))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                report_connection_failure(&err, self.notifier.as_ref());
                Err(err)
            }
        }
    }

    /// Ask the wallet to switch to `descriptor`. Returns whether the request
    /// succeeded.
    ///
    /// The chain is re-read from the wallet afterwards: a wallet may accept
    /// `wallet_addEthereumChain` without activating the chain, and the
    /// recorded status only follows what the wallet reports.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] while another request is in flight. Provider failures
    /// are logged and reported as `Ok(false)`.
    pub async fn switch_to(&self, descriptor: &ChainDescriptor) -> Result<bool> {
        let _guard = self.in_flight.try_lock().map_err(|_| Error::Busy)?;

        let Some(provider) = self.provider.as_deref() else {
            debug!(chain = %descriptor, "no wallet provider, cannot switch");
            return Ok(false);
        };
        if !adapter::request_network_switch(Some(provider), descriptor).await {
            return Ok(false);
        }

        match provider.chain_id().await {
            Ok(active) => {
                let activated = descriptor.matches(active.as_str());
                self.observed().chain_id = Some(active);
                if activated {
                    self.notifier.notify(Notice::info(
                        "Network switched",
                        format!("Now connected to {}", descriptor.chain_name),
                    ));
                } else {
                    warn!(chain = %descriptor, "wallet accepted the request but stayed on another chain");
                }
            }
            Err(err) => warn!(error = %err, "could not re-read chain after switch"),
        }
        Ok(true)
    }

    /// Switch to the registry entry named `key`.
    ///
    /// Returns `Ok(false)` for a name the registry does not know.
    ///
    /// # Errors
    ///
    /// See [`switch_to`](Self::switch_to).
    pub async fn switch_to_named(&self, key: &str) -> Result<bool> {
        let Some(descriptor) = self.registry.get(key).copied() else {
            debug!(key, "no registered chain with this name");
            return Ok(false);
        };
        self.switch_to(&descriptor).await
    }

    /// Apply a provider event to the mirrored state.
    ///
    /// An empty account list clears the session. A new account list records
    /// the first account and re-reads the chain id.
    ///
    /// # Errors
    ///
    /// The provider failure when re-reading the chain id.
    pub async fn apply(&self, event: ProviderEvent) -> Result<ConnectionStatus> {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    info!("wallet disconnected");
                    self.record(None, None);
                }
                Some(&account) => {
                    let provider = self.provider.as_deref().ok_or(Error::ProviderUnavailable)?;
                    let chain_id = provider.chain_id().await?;
                    debug!(account = %account, chain_id = %chain_id, "wallet accounts changed");
                    self.record(Some(account), Some(chain_id));
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                debug!(chain_id = %chain_id, "wallet chain changed");
                self.observed().chain_id = Some(chain_id);
            }
        }
        Ok(self.status())
    }

    /// Apply every event already queued on `subscription`.
    ///
    /// # Errors
    ///
    /// The first failure from [`apply`](Self::apply); later events stay
    /// queued.
    pub async fn drain(&self, subscription: &mut Subscription) -> Result<ConnectionStatus> {
        while let Some(event) = subscription.try_recv() {
            self.apply(event).await?;
        }
        Ok(self.status())
    }

    fn observed(&self) -> MutexGuard<'_, Observed> {
        self.observed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, account: Option<Address>, chain_id: Option<ChainId>) {
        let mut observed = self.observed();
        observed.account = account;
        observed.chain_id = chain_id;
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::chain::{CORE_DAO, ETHEREUM};
    use crate::error::ProviderError;
    use crate::notify::testing::RecordingNotifier;
    use crate::provider::{ETH_REQUEST_ACCOUNTS, MockProvider};

    const ALICE: Address = address!("0x52908400098527886E0F7030069857D2E4169EE7");
    const BOB: Address = address!("0x8617E340B3D01FA5F11F306F4090FD50E238070D");

    fn session_with(provider: Arc<MockProvider>) -> (WalletSession, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let session = WalletSession::builder()
            .provider(provider)
            .notifier(Arc::clone(&notifier) as Arc<dyn Notifier>)
            .build();
        (session, notifier)
    }

    /// Holds `eth_requestAccounts` until a permit is released.
    #[derive(Debug)]
    struct GatedProvider {
        inner: MockProvider,
        gate: Semaphore,
    }

    #[async_trait]
    impl ProviderHandle for GatedProvider {
        async fn request_accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| ProviderError::internal("gate closed"))?;
            self.inner.request_accounts().await
        }

        async fn accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
            self.inner.accounts().await
        }

        async fn chain_id(&self) -> std::result::Result<ChainId, ProviderError> {
            self.inner.chain_id().await
        }

        async fn switch_chain(&self, chain_id: &str) -> std::result::Result<(), ProviderError> {
            self.inner.switch_chain(chain_id).await
        }

        async fn add_chain(
            &self,
            descriptor: &ChainDescriptor,
        ) -> std::result::Result<(), ProviderError> {
            self.inner.add_chain(descriptor).await
        }

        fn subscribe(&self) -> Subscription {
            self.inner.subscribe()
        }
    }

    /// Accepts `wallet_addEthereumChain` without activating the chain, as a
    /// wallet does when the user approves the add and declines the switch.
    #[derive(Debug)]
    struct AddWithoutActivate {
        inner: MockProvider,
    }

    #[async_trait]
    impl ProviderHandle for AddWithoutActivate {
        async fn request_accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
            self.inner.request_accounts().await
        }

        async fn accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
            self.inner.accounts().await
        }

        async fn chain_id(&self) -> std::result::Result<ChainId, ProviderError> {
            self.inner.chain_id().await
        }

        async fn switch_chain(&self, chain_id: &str) -> std::result::Result<(), ProviderError> {
            self.inner.switch_chain(chain_id).await
        }

        async fn add_chain(
            &self,
            _descriptor: &ChainDescriptor,
        ) -> std::result::Result<(), ProviderError> {
            Ok(())
        }

        fn subscribe(&self) -> Subscription {
            self.inner.subscribe()
        }
    }

    #[tokio::test]
    async fn test_connect_records_account_and_chain() {
        let provider = Arc::new(MockProvider::new("0x45c").with_accounts([ALICE]));
        let (session, notifier) = session_with(provider);

        assert_eq!(session.status(), ConnectionStatus::NotConnected);
        let connection = session.connect().await.unwrap().unwrap();
        assert_eq!(connection.status(), ConnectionStatus::CoreDao);
        assert_eq!(session.status(), ConnectionStatus::CoreDao);
        assert_eq!(session.account(), Some(ALICE));
        assert_eq!(session.chain_id(), Some(ChainId::from("0x45c")));
        assert_eq!(session.current_chain(), Some(CORE_DAO));
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_connect_without_provider_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let session = WalletSession::builder()
            .notifier(Arc::clone(&notifier) as Arc<dyn Notifier>)
            .build();

        assert!(!session.has_provider());
        assert!(session.subscribe().is_none());
        assert!(matches!(
            session.connect().await,
            Err(Error::ProviderUnavailable)
        ));
        assert_eq!(notifier.titles(), vec!["MetaMask not found".to_owned()]);
        assert_eq!(session.restore().await.unwrap(), ConnectionStatus::NotConnected);
    }

    #[tokio::test]
    async fn test_connect_rejected_keeps_state() {
        let provider = Arc::new(MockProvider::new("0x1").with_accounts([ALICE]));
        provider.fail_next(ETH_REQUEST_ACCOUNTS, ProviderError::user_rejected());
        let (session, notifier) = session_with(provider);

        assert!(matches!(
            session.connect().await,
            Err(Error::UserRejected(_))
        ));
        assert_eq!(session.account(), None);
        assert_eq!(notifier.titles(), vec!["Connection Error".to_owned()]);
        assert!(!session.is_connecting());
    }

    #[tokio::test]
    async fn test_unsupported_chain_is_distinguishable() {
        let provider = Arc::new(MockProvider::new("0x89").with_accounts([ALICE]));
        let (session, _) = session_with(provider);

        let connection = session.connect().await.unwrap().unwrap();
        assert_eq!(connection.status(), ConnectionStatus::NotConnected);
        assert_eq!(session.chain_id(), Some(ChainId::from("0x89")));
        assert_eq!(session.current_chain(), None);
    }

    #[tokio::test]
    async fn test_restore_is_silent() {
        let provider = Arc::new(
            MockProvider::new("0x1")
                .with_accounts([ALICE])
                .authorized(),
        );
        let (session, _) = session_with(Arc::clone(&provider));

        assert_eq!(session.restore().await.unwrap(), ConnectionStatus::Ethereum);
        assert!(!provider.methods().contains(&ETH_REQUEST_ACCOUNTS));
    }

    #[tokio::test]
    async fn test_switch_updates_status() {
        let provider = Arc::new(MockProvider::new("0x1").with_accounts([ALICE]));
        let (session, notifier) = session_with(Arc::clone(&provider));
        session.connect().await.unwrap();

        assert!(session.switch_to(&CORE_DAO).await.unwrap());
        assert_eq!(session.status(), ConnectionStatus::CoreDao);
        assert_eq!(provider.active_chain(), "0x45c");
        assert_eq!(notifier.titles(), vec!["Network switched".to_owned()]);

        assert!(session.switch_to_named("ethereum").await.unwrap());
        assert_eq!(session.status(), ConnectionStatus::Ethereum);
        assert!(!session.switch_to_named("polygon").await.unwrap());
    }

    #[tokio::test]
    async fn test_switch_failure_keeps_status() {
        let provider = Arc::new(MockProvider::new("0x1").with_accounts([ALICE]));
        let (session, notifier) = session_with(Arc::clone(&provider));
        session.connect().await.unwrap();
        provider.fail_next(
            crate::provider::WALLET_SWITCH_ETHEREUM_CHAIN,
            ProviderError::user_rejected(),
        );

        assert!(!session.switch_to(&CORE_DAO).await.unwrap());
        assert_eq!(session.status(), ConnectionStatus::Ethereum);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_events_update_state() {
        let provider = Arc::new(
            MockProvider::new("0x1")
                .with_accounts([ALICE])
                .with_known_chains(["0x45c"]),
        );
        let (session, _) = session_with(Arc::clone(&provider));
        let mut events = session.subscribe().unwrap();
        session.connect().await.unwrap();

        provider.set_chain("0x45c");
        assert_eq!(session.drain(&mut events).await.unwrap(), ConnectionStatus::CoreDao);

        provider.set_accounts(vec![BOB]);
        assert_eq!(session.drain(&mut events).await.unwrap(), ConnectionStatus::CoreDao);
        assert_eq!(session.account(), Some(BOB));

        provider.set_accounts(Vec::new());
        assert_eq!(
            session.drain(&mut events).await.unwrap(),
            ConnectionStatus::NotConnected
        );
        assert_eq!(session.account(), None);
        assert_eq!(session.chain_id(), None);
    }

    #[tokio::test]
    async fn test_chain_change_to_unknown_chain() {
        let (session, _) = session_with(Arc::new(MockProvider::new("0x1")));
        let status = session
            .apply(ProviderEvent::ChainChanged(ChainId::from("0x01")))
            .await
            .unwrap();
        assert_eq!(status, ConnectionStatus::NotConnected);
    }

    #[tokio::test]
    async fn test_subscription_released_on_drop() {
        let provider = Arc::new(MockProvider::new("0x1"));
        let (session, _) = session_with(Arc::clone(&provider));

        let events = session.subscribe().unwrap();
        assert_eq!(provider.subscriber_count(), 1);
        drop(events);
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_requests_are_rejected() {
        let provider = Arc::new(GatedProvider {
            inner: MockProvider::new("0x1").with_accounts([ALICE]),
            gate: Semaphore::new(0),
        });
        let session = WalletSession::builder()
            .provider(Arc::clone(&provider) as Arc<dyn ProviderHandle>)
            .notifier(Arc::new(crate::notify::NoopNotifier))
            .build();

        let (first, second) = tokio::join!(session.connect(), async {
            assert!(session.is_connecting());
            let switch = session.switch_to(&ETHEREUM).await;
            let connect = session.connect().await;
            provider.gate.add_permits(1);
            (switch, connect)
        });

        assert_eq!(
            first.unwrap().map(|c| c.status()),
            Some(ConnectionStatus::Ethereum)
        );
        assert!(matches!(second.0, Err(Error::Busy)));
        assert!(matches!(second.1, Err(Error::Busy)));
        assert!(!session.is_connecting());
    }

    #[tokio::test]
    async fn test_added_but_inactive_chain_follows_wallet() {
        let provider = Arc::new(AddWithoutActivate {
            inner: MockProvider::new("0x1").with_accounts([ALICE]),
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let session = WalletSession::builder()
            .provider(Arc::clone(&provider) as Arc<dyn ProviderHandle>)
            .notifier(Arc::clone(&notifier) as Arc<dyn Notifier>)
            .build();
        session.connect().await.unwrap();

        assert!(session.switch_to(&CORE_DAO).await.unwrap());
        let wallet_chain = provider.inner.active_chain();
        assert_eq!(wallet_chain, "0x1");
        assert_eq!(session.status(), classify_chain(Some(&wallet_chain)));
        assert_eq!(session.status(), ConnectionStatus::Ethereum);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_registered_chain_names_resolve() {
        let provider = Arc::new(
            MockProvider::new("0x1")
                .with_accounts([ALICE])
                .with_known_chains(["0x45c"]),
        );
        let (session, _) = session_with(Arc::clone(&provider));
        session.connect().await.unwrap();

        for (name, status) in [
            ("core_dao", ConnectionStatus::CoreDao),
            ("ethereum", ConnectionStatus::Ethereum),
        ] {
            assert!(session.switch_to_named(name).await.unwrap(), "{name}");
            assert_eq!(session.status(), status);
        }
        assert!(!session.switch_to_named("coredao").await.unwrap());
        assert_eq!(
            session.registry().iter().map(|c| c.key).collect::<Vec<_>>(),
            vec!["ethereum", "core_dao"]
        );
    }

    #[tokio::test]
    async fn test_connect_without_accounts_after_restore() {
        let provider = Arc::new(
            MockProvider::new("0x45c")
                .with_accounts([ALICE])
                .authorized(),
        );
        let (session, notifier) = session_with(Arc::clone(&provider));
        assert_eq!(session.restore().await.unwrap(), ConnectionStatus::CoreDao);

        provider.set_accounts(Vec::new());
        assert_eq!(session.connect().await.unwrap(), None);
        assert!(notifier.notices().is_empty());
        assert_eq!(
            provider.methods().last(),
            Some(&ETH_REQUEST_ACCOUNTS),
            "chain must not be queried without accounts"
        );
    }

    #[tokio::test]
    async fn test_custom_chain_resolves_but_does_not_classify() {
        use crate::chain::NativeCurrency;

        const POLYGON: ChainDescriptor = ChainDescriptor {
            key: "polygon",
            chain_id: "0x89",
            chain_name: "Polygon",
            native_currency: NativeCurrency {
                name: "POL",
                symbol: "POL",
                decimals: 18,
            },
            rpc_urls: &["https://polygon-rpc.com"],
            block_explorer_urls: &["https://polygonscan.com"],
        };

        let provider = Arc::new(MockProvider::new("0x1").with_accounts([ALICE]));
        let session = WalletSession::builder()
            .provider(provider)
            .registry(Registry::builder().chain(ETHEREUM).chain(POLYGON).build())
            .notifier(Arc::new(crate::notify::NoopNotifier))
            .build();
        session.connect().await.unwrap();

        assert!(session.switch_to_named("polygon").await.unwrap());
        assert_eq!(session.current_chain(), Some(POLYGON));
        assert_eq!(session.status(), ConnectionStatus::NotConnected);
    }
}
