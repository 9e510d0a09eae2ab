//! Send/Sync bounds that relax to nothing on `wasm32`.
//!
//! Browser handles (`JsValue` and friends) are neither `Send` nor `Sync`, so
//! traits implemented by them use these aliases instead of the std markers.

#[cfg(not(target_arch = "wasm32"))]
/// `Send` on native targets.
pub trait WasmCompatSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + ?Sized> WasmCompatSend for T {}

#[cfg(target_arch = "wasm32")]
/// No bound on `wasm32`.
pub trait WasmCompatSend {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> WasmCompatSend for T {}

#[cfg(not(target_arch = "wasm32"))]
/// `Sync` on native targets.
pub trait WasmCompatSync: Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Sync + ?Sized> WasmCompatSync for T {}

#[cfg(target_arch = "wasm32")]
/// No bound on `wasm32`.
pub trait WasmCompatSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> WasmCompatSync for T {}
