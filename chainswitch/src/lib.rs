#![cfg_attr(docsrs, feature(doc_cfg))]
//! Chainswitch connects a page to an injected wallet (EIP-1193), tells which
//! supported chain it is on, and asks it to switch between Ethereum and
//! CoreDAO.
//!
//! The wallet is reached through the [`provider::ProviderHandle`] trait, so
//! the same code runs against the browser binding in `chainswitch-wasm` and
//! against [`provider::MockProvider`] in tests.
//!
//! ```text
//! adapter::request_connection ──► Option<ChainId> ──► status::classify_chain
//! adapter::request_network_switch(&chain::CORE_DAO) ──► bool
//! session::WalletSession  (mirrors account + chain, applies provider events)
//! ```

pub mod adapter;
pub mod chain;
pub mod error;
pub mod notify;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod status;
pub mod wasm_compat;

pub use error::{Error, ProviderError, Result};
