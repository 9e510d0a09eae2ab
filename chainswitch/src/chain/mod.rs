//! Network registry.
//!
//! Static descriptors for the chains a wallet can be asked to switch to,
//! plus a [`Registry`] that looks them up by symbolic name or chain id.
//!
//! # Supported Chains
//!
//! - Ethereum Mainnet (`0x1`)
//! - CoreDAO (`0x45c`)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Native currency of a chain, as wallets expect it in `wallet_addEthereumChain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    /// Currency name (e.g. "Ether").
    pub name: &'static str,
    /// Ticker symbol (e.g. "ETH").
    pub symbol: &'static str,
    /// Decimal precision.
    pub decimals: u8,
}

/// Everything a wallet needs to add or activate a chain.
///
/// Serializes to the `AddEthereumChainParameter` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    /// Symbolic registry name.
    #[serde(skip)]
    pub key: &'static str,
    /// Hex-encoded chain id (`0x`-prefixed).
    pub chain_id: &'static str,
    /// Human-readable chain name.
    pub chain_name: &'static str,
    /// Native currency.
    pub native_currency: NativeCurrency,
    /// RPC endpoints, in preference order.
    pub rpc_urls: &'static [&'static str],
    /// Block explorers, in preference order.
    pub block_explorer_urls: &'static [&'static str],
}

impl ChainDescriptor {
    /// Whether `chain_id` names this chain. Exact string comparison.
    #[must_use]
    pub fn matches(&self, chain_id: &str) -> bool {
        self.chain_id == chain_id
    }
}

impl fmt::Display for ChainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.chain_name, self.chain_id)
    }
}

/// Ethereum Mainnet.
pub const ETHEREUM: ChainDescriptor = ChainDescriptor {
    key: "ethereum",
    chain_id: "0x1",
    chain_name: "Ethereum Mainnet",
    native_currency: NativeCurrency {
        name: "Ether",
        symbol: "ETH",
        decimals: 18,
    },
    rpc_urls: &["https://mainnet.infura.io/v3/"],
    block_explorer_urls: &["https://etherscan.io"],
};

/// CoreDAO mainnet (chain 1116).
pub const CORE_DAO: ChainDescriptor = ChainDescriptor {
    key: "core_dao",
    chain_id: "0x45c",
    chain_name: "CoreDAO",
    native_currency: NativeCurrency {
        name: "CORE",
        symbol: "CORE",
        decimals: 18,
    },
    rpc_urls: &["https://rpc.coredao.org"],
    block_explorer_urls: &["https://scan.coredao.org"],
};

/// A chain identifier as reported by a provider.
///
/// Equality is exact string equality: `"0x1"`, `"0x01"` and `"1"` are three
/// different identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as received.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode a `0x`-prefixed hex identifier into its numeric value.
    ///
    /// Only used for display and logging; classification never normalizes.
    #[must_use]
    pub fn to_u64(&self) -> Option<u64> {
        let digits = self.0.strip_prefix("0x")?;
        u64::from_str_radix(digits, 16).ok()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ChainId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ChainId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&ChainDescriptor> for ChainId {
    fn from(descriptor: &ChainDescriptor) -> Self {
        Self(descriptor.chain_id.to_owned())
    }
}

/// Read-only lookup over a fixed set of chain descriptors.
///
/// `Registry::default()` holds [`ETHEREUM`] and [`CORE_DAO`]. Extra chains
/// registered through [`Registry::builder`] can be looked up and switched
/// to, but [`classify_chain`](crate::status::classify_chain) only knows the
/// two built-in chains and reports any other as `NotConnected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    chains: Vec<ChainDescriptor>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            chains: vec![ETHEREUM, CORE_DAO],
        }
    }
}

impl Registry {
    /// Create a builder starting from an empty registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up a descriptor by symbolic name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.key == key)
    }

    /// Look up a descriptor by exact chain id.
    #[must_use]
    pub fn lookup(&self, chain_id: &str) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.matches(chain_id))
    }

    /// Iterate over registered descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.iter()
    }

    /// Number of registered chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Builder for a [`Registry`].
#[derive(Debug, Default, Clone)]
pub struct RegistryBuilder {
    chains: Vec<ChainDescriptor>,
}

impl RegistryBuilder {
    /// Register a descriptor. A later entry with the same key or chain id
    /// replaces the earlier one.
    #[must_use]
    pub fn chain(mut self, descriptor: ChainDescriptor) -> Self {
        self.chains
            .retain(|c| c.key != descriptor.key && c.chain_id != descriptor.chain_id);
        self.chains.push(descriptor);
        self
    }

    /// Build the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            chains: self.chains,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_descriptors() {
        assert_eq!(ETHEREUM.chain_id, "0x1");
        assert_eq!(ETHEREUM.native_currency.symbol, "ETH");
        assert_eq!(CORE_DAO.chain_id, "0x45c");
        assert_eq!(ChainId::from(&CORE_DAO).to_u64(), Some(1116));
        assert_eq!(CORE_DAO.to_string(), "CoreDAO (0x45c)");
    }

    #[test]
    fn test_add_chain_params_shape() {
        let value = serde_json::to_value(CORE_DAO).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "chainId": "0x45c",
                "chainName": "CoreDAO",
                "nativeCurrency": { "name": "CORE", "symbol": "CORE", "decimals": 18 },
                "rpcUrls": ["https://rpc.coredao.org"],
                "blockExplorerUrls": ["https://scan.coredao.org"]
            })
        );
    }

    #[test]
    fn test_default_registry_lookup() {
        let registry = Registry::default();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("ethereum"), Some(&ETHEREUM));
        assert_eq!(registry.get("core_dao"), Some(&CORE_DAO));
        assert_eq!(registry.get("polygon"), None);
        assert_eq!(registry.lookup("0x45c"), Some(&CORE_DAO));
        assert_eq!(registry.lookup("0x01"), None);
        assert_eq!(registry.lookup("1"), None);
    }

    #[test]
    fn test_builder_replaces_duplicates() {
        let custom = ChainDescriptor {
            rpc_urls: &["https://rpc.ankr.com/eth"],
            ..ETHEREUM
        };
        let registry = Registry::builder()
            .chain(ETHEREUM)
            .chain(CORE_DAO)
            .chain(custom)
            .build();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get("ethereum").map(|c| c.rpc_urls),
            Some(&["https://rpc.ankr.com/eth"][..])
        );
        assert!(Registry::builder().build().is_empty());
    }

    #[test]
    fn test_chain_id_exact_and_numeric() {
        assert_ne!(ChainId::from("0x1"), ChainId::from("0x01"));
        assert_eq!(ChainId::from("0x01").to_u64(), Some(1));
        assert_eq!(ChainId::from("1").to_u64(), None);
        assert_eq!(ChainId::from("0xzz").to_u64(), None);
    }
}
