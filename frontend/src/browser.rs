//! `WalletProvider` over the EIP-1193 object injected as `window.ethereum`.

use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, TransactionReceipt, TxHash};
use futures::channel::mpsc;
use gloo_timers::future::TimeoutFuture;
use js_sys::{Array, Function, Promise, Reflect, JSON};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::parse_address;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::abi;
use crate::provider::{ProviderError, WalletEvent, WalletProvider, WalletSubscription};

const USER_REJECTED: i64 = 4001;
const EXECUTION_REVERTED: i64 = 3;

pub struct BrowserWallet {
    receipt_poll_interval_ms: u32,
}

fn field(value: &JsValue, name: &str) -> Option<JsValue> {
    Reflect::get(value, &JsValue::from_str(name))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

fn method(target: &JsValue, name: &str) -> Result<Function, ProviderError> {
    field(target, name)
        .and_then(|f| f.dyn_into::<Function>().ok())
        .ok_or_else(|| ProviderError::Malformed(format!("wallet has no {name}()")))
}

fn to_json(value: &JsValue) -> Result<Value, ProviderError> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }
    let text: String = JSON::stringify(value)
        .map_err(|e| ProviderError::Malformed(format!("{e:?}")))?
        .into();
    serde_json::from_str(&text).map_err(|e| ProviderError::Malformed(e.to_string()))
}

fn from_json(value: &Value) -> Result<JsValue, ProviderError> {
    JSON::parse(&value.to_string()).map_err(|e| ProviderError::Malformed(format!("{e:?}")))
}

fn hex_payload(value: &JsValue) -> Option<Vec<u8>> {
    let text = value.as_string()?;
    let bytes = hex::decode(text.trim_start_matches("0x")).ok()?;
    (!bytes.is_empty()).then_some(bytes)
}

/// Wallets nest revert data differently; look in the usual places.
fn revert_data(err: &JsValue) -> Option<Vec<u8>> {
    let data = field(err, "data");
    let candidates = [
        data.clone(),
        data.as_ref().and_then(|d| field(d, "data")),
        data.as_ref().and_then(|d| field(d, "originalError")).and_then(|o| field(&o, "data")),
        field(err, "error").and_then(|e| field(&e, "data")),
    ];
    candidates.into_iter().flatten().find_map(|v| hex_payload(&v))
}

fn provider_error(err: JsValue) -> ProviderError {
    let code = field(&err, "code").and_then(|c| c.as_f64()).map(|c| c as i64);
    let message = field(&err, "message")
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{err:?}"));

    if code == Some(USER_REJECTED) {
        return ProviderError::UserRejected;
    }
    if let Some(data) = revert_data(&err) {
        return ProviderError::Reverted { reason: abi::decode_revert_reason(&data) };
    }
    if code == Some(EXECUTION_REVERTED) || message.contains("execution reverted") {
        let reason = message
            .split_once("execution reverted:")
            .map(|(_, reason)| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());
        return ProviderError::Reverted { reason };
    }
    ProviderError::Rpc { code: code.unwrap_or(-1), message }
}

fn parse_accounts(value: &JsValue) -> Vec<Address> {
    Array::from(value)
        .iter()
        .filter_map(|v| v.as_string())
        .filter_map(|raw| match parse_address(&raw) {
            Ok(address) => Some(address),
            Err(e) => {
                warn!("ignoring account {raw:?}: {e}");
                None
            }
        })
        .collect()
}

impl BrowserWallet {
    pub fn new(receipt_poll_interval_ms: u32) -> Self {
        Self { receipt_poll_interval_ms }
    }

    /// Looked up on every use: the extension may inject it after page load.
    fn ethereum(&self) -> Result<JsValue, ProviderError> {
        web_sys::window()
            .and_then(|window| field(&window, "ethereum"))
            .ok_or(ProviderError::Unavailable)
    }

    async fn request(&self, method_name: &str, params: Value) -> Result<Value, ProviderError> {
        let ethereum = self.ethereum()?;
        let request = method(&ethereum, "request")?;
        let args = from_json(&json!({ "method": method_name, "params": params }))?;

        let promise = request
            .call1(&ethereum, &args)
            .map_err(provider_error)?
            .dyn_into::<Promise>()
            .map_err(|_| ProviderError::Malformed(format!("{method_name} did not return a promise")))?;

        let result = JsFuture::from(promise).await.map_err(provider_error)?;
        to_json(&result)
    }

    async fn request_as<T: DeserializeOwned>(&self, method_name: &str, params: Value) -> Result<T, ProviderError> {
        let value = self.request(method_name, params).await?;
        serde_json::from_value(value).map_err(|e| ProviderError::Malformed(format!("{method_name}: {e}")))
    }
}

#[async_trait(?Send)]
impl WalletProvider for BrowserWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.request_as("eth_requestAccounts", json!([])).await
    }

    async fn current_address(&self) -> Result<Option<Address>, ProviderError> {
        let accounts: Vec<Address> = self.request_as("eth_accounts", json!([])).await?;
        Ok(accounts.first().copied())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        self.request_as("eth_call", json!([{ "to": to, "data": data }, "latest"])).await
    }

    async fn send_transaction(&self, from: Address, to: Address, data: Bytes) -> Result<TxHash, ProviderError> {
        self.request_as("eth_sendTransaction", json!([{ "from": from, "to": to, "data": data }])).await
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TransactionReceipt, ProviderError> {
        loop {
            let receipt = self.request("eth_getTransactionReceipt", json!([hash])).await?;
            if !receipt.is_null() {
                return serde_json::from_value(receipt)
                    .map_err(|e| ProviderError::Malformed(format!("receipt: {e}")));
            }
            debug!(?hash, "transaction pending");
            TimeoutFuture::new(self.receipt_poll_interval_ms).await;
        }
    }

    fn subscribe(&self) -> Result<WalletSubscription, ProviderError> {
        let ethereum = self.ethereum()?;
        let on = method(&ethereum, "on")?;
        let remove = method(&ethereum, "removeListener")?;
        let (sender, receiver) = mpsc::unbounded();

        let accounts_sender = sender.clone();
        let on_accounts = Closure::<dyn FnMut(JsValue)>::new(move |accounts: JsValue| {
            let _ = accounts_sender.unbounded_send(WalletEvent::AccountsChanged(parse_accounts(&accounts)));
        });
        let on_chain = Closure::<dyn FnMut(JsValue)>::new(move |chain: JsValue| {
            let chain = chain.as_string().unwrap_or_default();
            let _ = sender.unbounded_send(WalletEvent::ChainChanged(chain));
        });

        let listeners = [
            (JsValue::from_str("accountsChanged"), on_accounts),
            (JsValue::from_str("chainChanged"), on_chain),
        ];
        let registered = listeners
            .iter()
            .try_for_each(|(name, listener)| on.call2(&ethereum, name, listener.as_ref()).map(drop));

        let unsubscribe = move || {
            for (name, listener) in &listeners {
                if let Err(e) = remove.call2(&ethereum, name, listener.as_ref()) {
                    warn!("failed to remove {name:?} listener: {e:?}");
                }
            }
            // Dropping the closures drops the senders, which ends the stream.
            drop(listeners);
        };

        match registered {
            Ok(()) => Ok(WalletSubscription::new(receiver, unsubscribe)),
            Err(e) => {
                unsubscribe();
                Err(provider_error(e))
            }
        }
    }

    fn reload(&self) {
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.location().reload() {
                warn!("page reload failed: {e:?}");
            }
        }
    }
}
