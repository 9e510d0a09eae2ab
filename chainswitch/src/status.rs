//! Connection status classification.

use std::fmt;

use serde::Serialize;

use crate::chain::{CORE_DAO, ChainDescriptor, ETHEREUM};

/// Which supported chain, if any, the wallet is on.
///
/// Always recomputed from the last observed chain id with [`classify_chain`];
/// never stored as the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ConnectionStatus {
    /// No chain observed, or a chain outside the registry.
    #[default]
    NotConnected,
    /// Connected to Ethereum Mainnet.
    Ethereum,
    /// Connected to CoreDAO.
    CoreDao,
}

impl ConnectionStatus {
    /// Label shown to the user.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotConnected => "Not Connected",
            Self::Ethereum => "Connected to Ethereum",
            Self::CoreDao => "Connected to CoreDAO",
        }
    }

    /// Whether the wallet is on one of the supported chains.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        !matches!(self, Self::NotConnected)
    }

    /// Descriptor of the chain this status refers to.
    #[must_use]
    pub const fn descriptor(self) -> Option<&'static ChainDescriptor> {
        match self {
            Self::NotConnected => None,
            Self::Ethereum => Some(&ETHEREUM),
            Self::CoreDao => Some(&CORE_DAO),
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a chain id into a [`ConnectionStatus`].
///
/// Pure and total. Comparison is exact and case-sensitive with no numeric
/// normalization, so `"0x1"` is Ethereum but `"0x01"`, `"0X1"` and `"1"` are
/// [`ConnectionStatus::NotConnected`].
#[must_use]
pub fn classify_chain(chain_id: Option<&str>) -> ConnectionStatus {
    match chain_id {
        None => ConnectionStatus::NotConnected,
        Some(id) if ETHEREUM.matches(id) => ConnectionStatus::Ethereum,
        Some(id) if CORE_DAO.matches(id) => ConnectionStatus::CoreDao,
        Some(_) => ConnectionStatus::NotConnected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_chains() {
        assert_eq!(classify_chain(Some("0x1")), ConnectionStatus::Ethereum);
        assert_eq!(classify_chain(Some("0x45c")), ConnectionStatus::CoreDao);
    }

    #[test]
    fn test_absent_is_not_connected() {
        assert_eq!(classify_chain(None), ConnectionStatus::NotConnected);
    }

    #[test]
    fn test_no_numeric_normalization() {
        for id in ["0x01", "1", "0X1", "0x45C", "1116", "0x045c", ""] {
            assert_eq!(
                classify_chain(Some(id)),
                ConnectionStatus::NotConnected,
                "{id:?} must not classify as a supported chain"
            );
        }
    }

    #[test]
    fn test_other_chains_not_connected() {
        for id in ["0x89", "0xa4b1", "0x38", "0xaa36a7", "not-a-chain", " 0x1", "0x1 "] {
            assert_eq!(classify_chain(Some(id)), ConnectionStatus::NotConnected);
        }
    }

    #[test]
    fn test_labels_and_descriptors() {
        assert_eq!(ConnectionStatus::NotConnected.to_string(), "Not Connected");
        assert_eq!(ConnectionStatus::Ethereum.to_string(), "Connected to Ethereum");
        assert_eq!(ConnectionStatus::CoreDao.to_string(), "Connected to CoreDAO");
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::NotConnected);
        assert!(!ConnectionStatus::NotConnected.is_connected());
        assert_eq!(
            ConnectionStatus::CoreDao.descriptor().map(|c| c.chain_id),
            Some("0x45c")
        );
        assert!(ConnectionStatus::NotConnected.descriptor().is_none());
    }
}
