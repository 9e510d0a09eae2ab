//! `window.ethereum` as a [`ProviderHandle`].

use std::cell::RefCell;
use std::fmt;

use alloy::primitives::Address;
use async_trait::async_trait;
use chainswitch::ProviderError;
use chainswitch::chain::{ChainDescriptor, ChainId};
use chainswitch::provider::{
    ACCOUNTS_CHANGED, CHAIN_CHANGED, ETH_ACCOUNTS, ETH_CHAIN_ID, ETH_REQUEST_ACCOUNTS, EventHub,
    ProviderEvent, ProviderHandle, Subscription, WALLET_ADD_ETHEREUM_CHAIN,
    WALLET_SWITCH_ETHEREUM_CHAIN,
};
use js_sys::{Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::decode;

/// Arguments object for `ethereum.request`.
#[derive(Serialize)]
struct RequestArguments<'a> {
    method: &'a str,
    params: Value,
}

/// A JS listener registered on the provider.
struct Listener {
    event: &'static str,
    callback: Closure<dyn FnMut(JsValue)>,
}

/// The wallet injected into the page as `window.ethereum`.
///
/// Event listeners are attached on the first [`subscribe`](ProviderHandle::subscribe)
/// and removed when the provider is dropped.
pub struct InjectedProvider {
    ethereum: Object,
    events: EventHub,
    listeners: RefCell<Vec<Listener>>,
}

impl fmt::Debug for InjectedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectedProvider")
            .field("listeners", &self.listeners.borrow().len())
            .field("subscribers", &self.events.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl InjectedProvider {
    /// Find the injected provider, if the page has one.
    #[must_use]
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let ethereum = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            debug!("window.ethereum is not defined");
            return None;
        }
        let ethereum = ethereum.dyn_into::<Object>().ok()?;
        Some(Self {
            ethereum,
            events: EventHub::default(),
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// Issue an EIP-1193 request and wait for the reply.
    async fn request(&self, method: &str, params: Value) -> Result<JsValue, ProviderError> {
        debug!(method, "provider request");
        let args = RequestArguments { method, params }
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| ProviderError::internal(format!("invalid request arguments: {e}")))?;

        let request = self
            .method("request")
            .ok_or_else(|| ProviderError::internal("provider has no request method"))?;
        let promise = request
            .call1(&self.ethereum, &args)
            .map_err(js_error)?
            .dyn_into::<Promise>()
            .map_err(|_| ProviderError::internal("request did not return a promise"))?;

        JsFuture::from(promise).await.map_err(|err| {
            let err = js_error(err);
            debug!(method, code = err.code, "provider request rejected");
            err
        })
    }

    async fn request_account_list(&self, method: &str) -> Result<Vec<Address>, ProviderError> {
        let reply = self.request(method, json!([])).await?;
        let raw: Vec<String> = serde_wasm_bindgen::from_value(reply)
            .map_err(|e| ProviderError::internal(format!("invalid accounts reply: {e}")))?;
        decode::accounts(&raw)
    }

    fn method(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.ethereum, &JsValue::from_str(name))
            .ok()?
            .dyn_into::<Function>()
            .ok()
    }

    fn attach_listeners(&self) {
        let mut listeners = self.listeners.borrow_mut();
        if !listeners.is_empty() {
            return;
        }
        let Some(on) = self.method("on") else {
            warn!("provider does not support event listeners");
            return;
        };

        let hub = self.events.clone();
        let accounts_changed = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            let parsed = serde_wasm_bindgen::from_value::<Vec<String>>(value)
                .map_err(|e| ProviderError::internal(e.to_string()))
                .and_then(|raw| decode::accounts(&raw));
            match parsed {
                Ok(accounts) => {
                    hub.emit(ProviderEvent::AccountsChanged(accounts));
                }
                Err(err) => warn!(error = %err, "ignoring malformed accountsChanged event"),
            }
        });

        let hub = self.events.clone();
        let chain_changed = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            match decode::chain_id(value.as_string()) {
                Ok(chain_id) => {
                    hub.emit(ProviderEvent::ChainChanged(chain_id));
                }
                Err(err) => warn!(error = %err, "ignoring malformed chainChanged event"),
            }
        });

        for (event, callback) in [
            (ACCOUNTS_CHANGED, accounts_changed),
            (CHAIN_CHANGED, chain_changed),
        ] {
            if let Err(err) = on.call2(
                &self.ethereum,
                &JsValue::from_str(event),
                callback.as_ref().unchecked_ref(),
            ) {
                warn!(event, error = %js_error(err), "failed to attach provider listener");
                continue;
            }
            debug!(event, "provider listener attached");
            listeners.push(Listener { event, callback });
        }
    }
}

impl Drop for InjectedProvider {
    fn drop(&mut self) {
        let listeners = self.listeners.get_mut();
        if listeners.is_empty() {
            return;
        }
        let Some(remove) = self.method("removeListener") else {
            return;
        };
        for listener in listeners.drain(..) {
            if remove
                .call2(
                    &self.ethereum,
                    &JsValue::from_str(listener.event),
                    listener.callback.as_ref().unchecked_ref(),
                )
                .is_err()
            {
                warn!(event = listener.event, "failed to remove provider listener");
            }
        }
    }
}

#[async_trait(?Send)]
impl ProviderHandle for InjectedProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.request_account_list(ETH_REQUEST_ACCOUNTS).await
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.request_account_list(ETH_ACCOUNTS).await
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let reply = self.request(ETH_CHAIN_ID, json!([])).await?;
        decode::chain_id(reply.as_string())
    }

    async fn switch_chain(&self, chain_id: &str) -> Result<(), ProviderError> {
        self.request(WALLET_SWITCH_ETHEREUM_CHAIN, json!([{ "chainId": chain_id }]))
            .await
            .map(drop)
    }

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), ProviderError> {
        let params = serde_json::to_value(descriptor)
            .map_err(|e| ProviderError::internal(format!("invalid chain params: {e}")))?;
        self.request(WALLET_ADD_ETHEREUM_CHAIN, json!([params]))
            .await
            .map(drop)
    }

    fn subscribe(&self) -> Subscription {
        self.attach_listeners();
        self.events.subscribe()
    }
}

/// Read `{ code, message, data }` off a rejected request.
///
/// `message` on an `Error` is not enumerable, so fields are read one by one.
fn js_error(err: JsValue) -> ProviderError {
    let field = |name: &str| {
        Reflect::get(&err, &JsValue::from_str(name))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    };
    let code = field("code").and_then(|v| v.as_f64());
    let message = field("message")
        .and_then(|v| v.as_string())
        .or_else(|| err.as_string());
    let data = field("data").and_then(|v| serde_wasm_bindgen::from_value(v).ok());
    decode::provider_error(code, message, data)
}
