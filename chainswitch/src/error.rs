//! Error types for wallet provider interaction.
//!
//! Provider failures arrive as [`ProviderError`] values carrying an EIP-1193
//! code. [`Error`] sorts them into the categories callers act on:
//! - the provider is missing entirely
//! - the user (or wallet) rejected the request
//! - the wallet does not know the requested chain (recoverable by adding it)
//! - anything else the provider reported

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type alias for chainswitch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for chainswitch.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No injected wallet provider was detected.
    #[error("no wallet provider detected")]
    ProviderUnavailable,

    /// The user declined the request, or the wallet refused it.
    #[error("request rejected: {0}")]
    UserRejected(ProviderError),

    /// The wallet does not recognize the requested chain.
    #[error("chain {chain_id} is not recognized by the wallet")]
    UnrecognizedChain {
        /// Chain identifier that was requested.
        chain_id: String,
        /// The provider error that reported the condition.
        #[source]
        source: ProviderError,
    },

    /// Any other provider-side failure.
    #[error("provider error: {0}")]
    Provider(ProviderError),

    /// The provider answered with something that could not be interpreted.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Another wallet request is still in flight for this caller.
    #[error("a wallet request is already in flight")]
    Busy,
}

impl Error {
    /// Sort a provider error into the matching category.
    ///
    /// `chain_id` is the chain a switch was attempted for, if any. Only
    /// switch requests can yield [`Error::UnrecognizedChain`].
    #[must_use]
    pub fn from_provider(err: ProviderError, chain_id: Option<&str>) -> Self {
        match (err.kind(), chain_id) {
            (ProviderErrorKind::UserRejected | ProviderErrorKind::Unauthorized, _) => {
                Self::UserRejected(err)
            }
            (ProviderErrorKind::UnrecognizedChain, Some(chain_id)) => Self::UnrecognizedChain {
                chain_id: chain_id.to_owned(),
                source: err,
            },
            _ => Self::Provider(err),
        }
    }

    /// Create an invalid response error.
    #[must_use]
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// The provider error behind this error, if there is one.
    #[must_use]
    pub const fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::UserRejected(err) | Self::Provider(err) => Some(err),
            Self::UnrecognizedChain { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        Self::from_provider(err, None)
    }
}

/// EIP-1193 error code: the user rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// EIP-1193 error code: the requested method or account is not authorized.
pub const UNAUTHORIZED: i64 = 4100;
/// EIP-1193 error code: the provider does not support the method.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// EIP-1193 error code: the provider is disconnected from all chains.
pub const DISCONNECTED: i64 = 4900;
/// EIP-1193 error code: the provider is not connected to the requested chain.
pub const CHAIN_DISCONNECTED: i64 = 4901;
/// Wallet error code for a chain that has not been added to the wallet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// JSON-RPC server error used by wallets when a prompt is already open.
pub const REQUEST_PENDING: i64 = -32002;
/// JSON-RPC internal error.
pub const INTERNAL_ERROR: i64 = -32603;

/// Error returned by an injected provider for a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ProviderError {
    /// Numeric error code (EIP-1193 or JSON-RPC).
    pub code: i64,
    /// Human-readable message from the provider.
    pub message: String,
    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Categories of provider errors, derived from the error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderErrorKind {
    /// The user rejected the request (4001).
    UserRejected,
    /// Not authorized (4100).
    Unauthorized,
    /// Method not supported (4200).
    UnsupportedMethod,
    /// Provider disconnected (4900, 4901).
    Disconnected,
    /// Chain not added to the wallet (4902).
    UnrecognizedChain,
    /// A permission prompt is already open (-32002).
    RequestPending,
    /// Anything else.
    Other,
}

impl ProviderError {
    /// Create a provider error with a code and message.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a user rejection error.
    #[must_use]
    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED, "User rejected the request.")
    }

    /// Create an unrecognized chain error for `chain_id`.
    #[must_use]
    pub fn unrecognized_chain(chain_id: &str) -> Self {
        Self::new(
            UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID \"{chain_id}\". Try adding the chain first."),
        )
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    /// Attach a structured payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Classify this error by its code.
    #[must_use]
    pub const fn kind(&self) -> ProviderErrorKind {
        match self.code {
            USER_REJECTED => ProviderErrorKind::UserRejected,
            UNAUTHORIZED => ProviderErrorKind::Unauthorized,
            UNSUPPORTED_METHOD => ProviderErrorKind::UnsupportedMethod,
            DISCONNECTED | CHAIN_DISCONNECTED => ProviderErrorKind::Disconnected,
            UNRECOGNIZED_CHAIN => ProviderErrorKind::UnrecognizedChain,
            REQUEST_PENDING => ProviderErrorKind::RequestPending,
            _ => ProviderErrorKind::Other,
        }
    }

    /// Whether this is the "chain not added" condition.
    #[must_use]
    pub const fn is_unrecognized_chain(&self) -> bool {
        self.code == UNRECOGNIZED_CHAIN
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)
    }
}

impl std::error::Error for ProviderError {}
