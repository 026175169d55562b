//! JavaScript surface for the UI layer.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use js_sys::{Function, Promise, JSON};
use serde::Serialize;
use shared::Result;
use tracing::{error, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::app::VotingApp;
use crate::browser::BrowserWallet;
use crate::config::CONFIG;
use crate::telemetry;

#[wasm_bindgen(start)]
pub fn start() {
    if let Err(e) = telemetry::init_logging(CONFIG.log_filter) {
        web_sys::console::warn_1(&e.to_string().into());
    }
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_json::to_string(value)
        .ok()
        .and_then(|json| JSON::parse(&json).ok())
        .unwrap_or(JsValue::NULL)
}

struct Inner {
    app: VotingApp<BrowserWallet>,
    on_change: RefCell<Option<Function>>,
    listening: Cell<bool>,
}

impl Inner {
    fn notify(&self) {
        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                warn!("change callback threw: {e:?}");
            }
        }
    }

    /// Starts the wallet event loop once the session holds a subscription.
    fn listen(self: &Rc<Self>) {
        if self.listening.get() || !self.app.wallet().is_subscribed() {
            return;
        }
        self.listening.set(true);
        let inner = self.clone();
        spawn_local(async move {
            inner.app.run_events(|| inner.notify()).await;
            inner.listening.set(false);
            // A reconnect that happened while draining may need a new loop.
            inner.listen();
        });
    }
}

#[wasm_bindgen]
pub struct VotingClient {
    inner: Rc<Inner>,
}

#[wasm_bindgen]
impl VotingClient {
    /// Uses the compiled-in contract address unless one is given.
    #[wasm_bindgen(constructor)]
    pub fn new(contract_address: Option<String>) -> VotingClient {
        let provider = Rc::new(BrowserWallet::new(CONFIG.receipt_poll_interval_ms));
        let address = contract_address.unwrap_or_else(|| CONFIG.contract_address.to_string());
        VotingClient {
            inner: Rc::new(Inner {
                app: VotingApp::new(provider, address),
                on_change: RefCell::new(None),
                listening: Cell::new(false),
            }),
        }
    }

    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Option<Function>) {
        self.inner.on_change.replace(callback);
    }

    #[wasm_bindgen(js_name = walletView)]
    pub fn wallet_view(&self) -> JsValue {
        to_js(&self.inner.app.wallet_view())
    }

    #[wasm_bindgen(js_name = votingView)]
    pub fn voting_view(&self) -> JsValue {
        to_js(&self.inner.app.voting_view())
    }

    pub fn results(&self) -> JsValue {
        to_js(&self.inner.app.results())
    }

    /// Resolves to the wallet view; rejects with the error message.
    pub fn connect(&self) -> Promise {
        self.run(|inner| async move {
            inner.app.connect().await?;
            Ok(to_js(&inner.app.wallet_view()))
        })
    }

    /// Resolves to whether an already authorized account was picked up.
    pub fn resume(&self) -> Promise {
        self.run(|inner| async move {
            let resumed = inner.app.resume().await?;
            Ok(JsValue::from_bool(resumed))
        })
    }

    pub fn refresh(&self) -> Promise {
        self.run(|inner| async move {
            inner.app.refresh_all().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Resolves to the confirmed transaction hash.
    #[wasm_bindgen(js_name = addCandidate)]
    pub fn add_candidate(&self, name: String) -> Promise {
        self.run(|inner| async move {
            let hash = inner.app.add_candidate(&name).await?;
            Ok(to_js(&hash))
        })
    }

    #[wasm_bindgen(js_name = allowVoter)]
    pub fn allow_voter(&self, address: String) -> Promise {
        self.run(|inner| async move {
            let hash = inner.app.allow_voter(&address).await?;
            Ok(to_js(&hash))
        })
    }

    pub fn vote(&self, index: u32) -> Promise {
        self.run(|inner| async move {
            let hash = inner.app.vote(u64::from(index)).await?;
            Ok(to_js(&hash))
        })
    }
}

impl VotingClient {
    fn run<F, Fut>(&self, op: F) -> Promise
    where
        F: FnOnce(Rc<Inner>) -> Fut,
        Fut: Future<Output = Result<JsValue>> + 'static,
    {
        let inner = self.inner.clone();
        let fut = op(inner.clone());
        future_to_promise(async move {
            let result = fut.await;
            inner.listen();
            inner.notify();
            result.map_err(|e| {
                error!("{e}");
                JsValue::from_str(&e.message)
            })
        })
    }
}
