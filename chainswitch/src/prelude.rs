//! Commonly used items.

pub use crate::adapter::{
    Connection, SwitchOutcome, check_connection, request_connection, request_network_switch,
    short_address, try_request_connection, try_request_network_switch,
};
pub use crate::chain::{CORE_DAO, ChainDescriptor, ChainId, ETHEREUM, Registry};
pub use crate::error::{Error, ProviderError, Result};
pub use crate::notify::{Notice, Notifier, TracingNotifier};
pub use crate::provider::{ProviderEvent, ProviderHandle, Subscription};
pub use crate::session::WalletSession;
pub use crate::status::{ConnectionStatus, classify_chain};

#[cfg(feature = "mock")]
pub use crate::provider::MockProvider;
