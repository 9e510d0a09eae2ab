//! Functions exported to JavaScript.
//!
//! ```js
//! import init, { connectWallet, switchNetwork, connectionState, watchWallet } from "chainswitch-wasm";
//!
//! await init();
//! const chainId = await connectWallet();
//! console.log(connectionState(chainId));
//! if (await switchNetwork("core_dao")) { ... }
//! const watch = watchWallet((status, chainId) => render(status, chainId));
//! watch.free();
//! ```

use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::rc::Rc;
use std::sync::Arc;
use std::task::Poll;

use chainswitch::Error;
use chainswitch::notify::{Notice, Notifier, Severity};
use chainswitch::provider::ProviderHandle;
use chainswitch::session::WalletSession;
use chainswitch::status::classify_chain;
use js_sys::Function;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use tracing_subscriber::filter::LevelFilter;
use wasm_bindgen::prelude::*;
use web_sys::console;

use crate::injected::InjectedProvider;
use crate::logging;

thread_local! {
    static SESSION: Rc<WalletSession> = Rc::new(build_session());
}

#[allow(clippy::arc_with_non_send_sync)]
fn build_session() -> WalletSession {
    let mut builder = WalletSession::builder().notifier(Arc::new(ConsoleNotifier));
    match InjectedProvider::detect() {
        Some(provider) => builder = builder.provider(Arc::new(provider) as Arc<dyn ProviderHandle>),
        None => debug!("no injected provider"),
    }
    builder.build()
}

fn session() -> Rc<WalletSession> {
    SESSION.with(Rc::clone)
}

/// Writes notices to the browser console.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let title = JsValue::from_str(&notice.title);
        let description = JsValue::from_str(&notice.description);
        match notice.severity {
            Severity::Info => console::info_2(&title, &description),
            Severity::Destructive => console::error_2(&title, &description),
        }
    }
}

/// Module entry point: panic hook and console logging.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logging::init(LevelFilter::INFO);
}

/// Ask the wallet to connect. Resolves to the active chain id, or
/// `undefined` when there is no provider, no account, or the request failed.
#[wasm_bindgen(js_name = connectWallet)]
pub async fn connect_wallet() -> Option<String> {
    let session = session();
    match session.connect().await {
        Ok(connection) => connection.map(|c| c.chain_id.as_str().to_owned()),
        Err(Error::Busy) => {
            debug!("connect ignored, a request is already in flight");
            None
        }
        Err(_) => None,
    }
}

/// Ask the wallet to switch to the registered chain `name`
/// (`"ethereum"` or `"core_dao"`). Resolves to whether it did.
#[wasm_bindgen(js_name = switchNetwork)]
pub async fn switch_network(name: String) -> bool {
    let session = session();
    match session.switch_to_named(&name).await {
        Ok(switched) => switched,
        Err(err) => {
            debug!(error = %err, "switch ignored");
            false
        }
    }
}

/// Status label for a chain id: `"Connected to Ethereum"`,
/// `"Connected to CoreDAO"` or `"Not Connected"`.
#[wasm_bindgen(js_name = connectionState)]
#[must_use]
pub fn connection_state(chain_id: Option<String>) -> String {
    classify_chain(chain_id.as_deref()).label().to_owned()
}

/// Restore a connection granted earlier without prompting. Resolves to the
/// status label.
#[wasm_bindgen(js_name = restoreWallet)]
pub async fn restore_wallet() -> String {
    let session = session();
    if let Err(err) = session.restore().await {
        warn!(error = %err, "could not restore wallet connection");
    }
    session.status().label().to_owned()
}

/// A running [`watchWallet`] listener. Stops when freed.
#[wasm_bindgen]
#[derive(Debug)]
pub struct WalletWatch {
    _stop: oneshot::Sender<()>,
}

/// Call `callback(status, chainId)` whenever the wallet's account or chain
/// changes. Returns `undefined` without a provider.
#[wasm_bindgen(js_name = watchWallet)]
#[must_use]
pub fn watch_wallet(callback: Function) -> Option<WalletWatch> {
    let session = session();
    let mut events = session.subscribe()?;
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    wasm_bindgen_futures::spawn_local(async move {
        loop {
            let next = {
                let mut recv = pin!(events.recv());
                poll_fn(|cx| {
                    if Pin::new(&mut stop_rx).poll(cx).is_ready() {
                        return Poll::Ready(None);
                    }
                    recv.as_mut().poll(cx)
                })
                .await
            };
            let Some(event) = next else { break };

            let status = match session.apply(event).await {
                Ok(status) => status,
                Err(err) => {
                    warn!(error = %err, "failed to apply wallet event");
                    continue;
                }
            };
            let chain_id = session
                .chain_id()
                .map_or(JsValue::UNDEFINED, |id| JsValue::from_str(id.as_str()));
            if let Err(err) = callback.call2(
                &JsValue::NULL,
                &JsValue::from_str(status.label()),
                &chain_id,
            ) {
                warn!(?err, "wallet watch callback threw");
            }
        }
        debug!("wallet watch stopped");
    });

    Some(WalletWatch { _stop: stop_tx })
}
