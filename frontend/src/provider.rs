//! The wallet the session talks to, reduced to what the voting client needs.

use std::cell::RefCell;
use std::task::Poll;

use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, TransactionReceipt, TxHash};
use futures::channel::mpsc::UnboundedReceiver;
use futures::future::poll_fn;
use futures::StreamExt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("Please install MetaMask to use this application")]
    Unavailable,
    #[error("Request rejected in wallet")]
    UserRejected,
    #[error("Execution reverted{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Reverted { reason: Option<String> },
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Malformed wallet response: {0}")]
    Malformed(String),
}

/// Notifications pushed by the wallet outside of any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The exposed accounts changed; empty means access was revoked.
    AccountsChanged(Vec<Address>),
    /// Hex chain id of the newly selected network.
    ChainChanged(String),
}

/// Live registration of the account/network listeners.
///
/// Dropping or releasing it removes the listeners exactly once and closes the
/// channel; events already queued can still be drained.
pub struct WalletSubscription {
    events: RefCell<UnboundedReceiver<WalletEvent>>,
    unsubscribe: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl WalletSubscription {
    pub fn new(events: UnboundedReceiver<WalletEvent>, unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            events: RefCell::new(events),
            unsubscribe: RefCell::new(Some(Box::new(unsubscribe))),
        }
    }

    pub async fn next(&self) -> Option<WalletEvent> {
        poll_fn(|cx| match self.events.try_borrow_mut() {
            Ok(mut events) => events.poll_next_unpin(cx),
            // Another task is already waiting on this channel.
            Err(_) => Poll::Ready(None),
        })
        .await
    }

    pub fn release(&self) {
        let unsubscribe = self.unsubscribe.borrow_mut().take();
        if let Some(unsubscribe) = unsubscribe {
            unsubscribe();
            if let Ok(mut events) = self.events.try_borrow_mut() {
                events.close();
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.unsubscribe.borrow().is_some()
    }
}

impl Drop for WalletSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Single-threaded view of an injected wallet. Reads go through `call`,
/// writes are signed and broadcast by the wallet itself.
#[async_trait(?Send)]
pub trait WalletProvider {
    /// Prompts the user for account access.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// The currently exposed account, without prompting.
    async fn current_address(&self) -> Result<Option<Address>, ProviderError>;

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError>;

    async fn send_transaction(&self, from: Address, to: Address, data: Bytes) -> Result<TxHash, ProviderError>;

    /// Resolves once the transaction is mined. There is no timeout.
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TransactionReceipt, ProviderError>;

    fn subscribe(&self) -> Result<WalletSubscription, ProviderError>;

    /// Throws away all client state, e.g. by reloading the page.
    fn reload(&self);
}
