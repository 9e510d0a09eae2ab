//! WebAssembly bindings for chainswitch.
//!
//! Binds the page's injected wallet (`window.ethereum`) to
//! [`chainswitch::provider::ProviderHandle`] and exports `connectWallet`,
//! `switchNetwork`, `connectionState`, `restoreWallet` and `watchWallet` to
//! JavaScript. Everything except [`decode`] only exists on `wasm32`.

pub mod decode;

#[cfg(target_arch = "wasm32")]
pub mod exports;
#[cfg(target_arch = "wasm32")]
pub mod injected;
#[cfg(target_arch = "wasm32")]
mod logging;

#[cfg(target_arch = "wasm32")]
pub use injected::InjectedProvider;
