//! Connection adapter.
//!
//! Stateless operations over an optional [`ProviderHandle`]. Each comes in
//! two forms:
//!
//! - `try_*` returns a typed [`Result`] for callers that want to branch on
//!   the failure category.
//! - the plain form catches every failure, logs it (and notifies the user
//!   where appropriate), and hands back a plain value.
//!
//! # Examples
//!
//! ```rust,ignore
//! use chainswitch::adapter::{request_connection, request_network_switch};
//! use chainswitch::chain::CORE_DAO;
//! use chainswitch::notify::TracingNotifier;
//! use chainswitch::status::classify_chain;
//!
//! let chain_id = request_connection(Some(&provider), &TracingNotifier).await;
//! let status = classify_chain(chain_id.as_ref().map(|c| c.as_str()));
//!
//! if request_network_switch(Some(&provider), &CORE_DAO).await {
//!     // wallet is now on CoreDAO
//! }
//! ```

use alloy::primitives::Address;
use tracing::{debug, error, info, warn};

use crate::chain::{ChainDescriptor, ChainId};
use crate::error::{Error, Result};
use crate::notify::{Notice, Notifier};
use crate::provider::ProviderHandle;
use crate::status::{ConnectionStatus, classify_chain};

/// An account together with the chain the wallet reported for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// First account revealed by the wallet.
    pub account: Address,
    /// Active chain at the time of the request.
    pub chain_id: ChainId,
}

impl Connection {
    /// Classify the connection's chain.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        classify_chain(Some(self.chain_id.as_str()))
    }
}

/// How a successful switch was achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The wallet already knew the chain and switched to it.
    Switched,
    /// The wallet did not know the chain; it was added (and activated).
    Added,
}

/// Render an address as `0x1234...abcd`.
#[must_use]
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Ask the wallet for accounts and, if any are revealed, its chain.
///
/// Returns `Ok(None)` when the wallet reveals no accounts; the chain is not
/// queried in that case.
///
/// # Errors
///
/// [`Error::ProviderUnavailable`] without a provider, otherwise the
/// categorized provider failure.
pub async fn try_request_connection(
    provider: Option<&dyn ProviderHandle>,
) -> Result<Option<Connection>> {
    let provider = provider.ok_or(Error::ProviderUnavailable)?;

    debug!("requesting wallet accounts");
    let accounts = provider.request_accounts().await?;
    let Some(&account) = accounts.first() else {
        debug!("wallet revealed no accounts");
        return Ok(None);
    };

    let chain_id = provider.chain_id().await?;
    info!(
        account = %account,
        chain_id = %chain_id,
        "wallet connected",
    );
    Ok(Some(Connection { account, chain_id }))
}

/// Connect to the wallet and return its active chain id.
///
/// Never fails: a missing provider or any provider error is reported through
/// `notifier` and yields `None`, as does a wallet that reveals no accounts.
pub async fn request_connection(
    provider: Option<&dyn ProviderHandle>,
    notifier: &dyn Notifier,
) -> Option<ChainId> {
    match try_request_connection(provider).await {
        Ok(connection) => connection.map(|c| c.chain_id),
        Err(err) => {
            report_connection_failure(&err, notifier);
            None
        }
    }
}

/// Log a failed connection attempt and tell the user about it.
pub(crate) fn report_connection_failure(err: &Error, notifier: &dyn Notifier) {
    if matches!(err, Error::ProviderUnavailable) {
        warn!("no wallet provider detected");
        notifier.notify(Notice::provider_missing());
    } else {
        error!(error = %err, "error connecting to wallet");
        notifier.notify(Notice::connection_failed());
    }
}

/// Ask the wallet to switch to `descriptor`, adding the chain if the wallet
/// does not know it.
///
/// Switching to the chain the wallet is already on is left to the wallet,
/// which treats it as a successful no-op.
///
/// # Errors
///
/// [`Error::ProviderUnavailable`] without a provider. Any switch failure
/// other than an unrecognized chain is returned as is, and so is a failed
/// add-chain follow-up.
pub async fn try_request_network_switch(
    provider: Option<&dyn ProviderHandle>,
    descriptor: &ChainDescriptor,
) -> Result<SwitchOutcome> {
    let provider = provider.ok_or(Error::ProviderUnavailable)?;

    debug!(chain_id = descriptor.chain_id, "requesting chain switch");
    let Err(err) = provider.switch_chain(descriptor.chain_id).await else {
        info!(chain = %descriptor, "wallet switched chain");
        return Ok(SwitchOutcome::Switched);
    };

    match Error::from_provider(err, Some(descriptor.chain_id)) {
        Error::UnrecognizedChain { chain_id, source } => {
            warn!(chain_id = %chain_id, error = %source, "chain unknown to wallet, adding it");
            provider.add_chain(descriptor).await?;
            info!(chain = %descriptor, "wallet added chain");
            Ok(SwitchOutcome::Added)
        }
        other => Err(other),
    }
}

/// Ask the wallet to switch to `descriptor`. Returns whether it succeeded.
///
/// Never fails: every error is logged and yields `false`.
pub async fn request_network_switch(
    provider: Option<&dyn ProviderHandle>,
    descriptor: &ChainDescriptor,
) -> bool {
    match try_request_network_switch(provider, descriptor).await {
        Ok(_) => true,
        Err(Error::ProviderUnavailable) => {
            debug!(chain = %descriptor, "no wallet provider, cannot switch");
            false
        }
        Err(err) => {
            error!(chain = %descriptor, error = %err, "error switching network");
            false
        }
    }
}

/// Look up an existing authorization without prompting.
///
/// Used on page load to restore a connection the user granted earlier.
/// Returns `Ok(None)` without a provider or without authorized accounts.
///
/// # Errors
///
/// The categorized provider failure.
pub async fn check_connection(provider: Option<&dyn ProviderHandle>) -> Result<Option<Connection>> {
    let Some(provider) = provider else {
        return Ok(None);
    };

    let accounts = provider.accounts().await?;
    let Some(&account) = accounts.first() else {
        return Ok(None);
    };

    let chain_id = provider.chain_id().await?;
    debug!(account = %account, chain_id = %chain_id, "restored wallet connection");
    Ok(Some(Connection { account, chain_id }))
}
