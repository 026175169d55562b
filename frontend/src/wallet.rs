//! Wallet connection lifecycle and the per-user state derived from it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ethers_core::types::Address;
use shared::{
    checksum, parse_address, shorten_address, Error, ErrorCode, Result, SessionPhase, VoterStatus,
    WalletView,
};
use tracing::{debug, info, warn};

use crate::gateway::ContractGateway;
use crate::provider::{ProviderError, WalletEvent, WalletProvider, WalletSubscription};

/// Inputs of the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    ConnectRequested,
    ConnectSucceeded,
    ConnectFailed,
    AccountChanged,
    AccountsRevoked,
    NetworkChanged,
}

/// Transition table. `None` means the event does not apply in that phase.
pub fn transition(phase: SessionPhase, event: SessionEvent) -> Option<SessionPhase> {
    use SessionEvent::*;
    use SessionPhase::*;

    match (phase, event) {
        (_, ConnectRequested) => Some(Connecting),
        (Connecting, ConnectSucceeded) => Some(Connected),
        (Connecting, ConnectFailed) => Some(Disconnected),
        (Connected | Connecting, AccountChanged) => Some(Connecting),
        (_, AccountsRevoked) => Some(Disconnected),
        (_, NetworkChanged) => Some(Disconnected),
        _ => None,
    }
}

/// What happened in response to a wallet notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    Reconnected,
    Disconnected,
    /// Chain-specific state is void; the host must reset completely.
    ReloadRequired,
}

/// Snapshot of the session. Replaced wholesale on every transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub address: Option<Address>,
    pub is_admin: bool,
    pub eligibility: VoterStatus,
    pub last_error: Option<Error>,
}

impl SessionState {
    fn connecting() -> Self {
        Self { phase: SessionPhase::Connecting, ..Self::default() }
    }

    fn failed(error: Error) -> Self {
        Self { last_error: Some(error), ..Self::default() }
    }

    pub fn is_connected(&self) -> bool {
        self.phase == SessionPhase::Connected
    }

    pub fn view(&self) -> WalletView {
        WalletView {
            phase: self.phase,
            connected: self.is_connected(),
            address: self.address.as_ref().map(checksum),
            short_address: self.address.as_ref().map(shorten_address),
            is_admin: self.is_admin,
            eligibility: self.eligibility,
            error: self.last_error.as_ref().map(|e| e.message.clone()),
        }
    }
}

fn wallet_error(err: ProviderError) -> Error {
    match err {
        ProviderError::Unavailable => Error::new(ErrorCode::WalletUnavailable, err.to_string()),
        other => Error::with_details(ErrorCode::RemoteCall, "Failed to connect to wallet", other.to_string()),
    }
}

pub struct WalletSession<P: WalletProvider> {
    provider: Rc<P>,
    contract_address: String,
    state: RefCell<SessionState>,
    gateway: RefCell<Option<Rc<ContractGateway<P>>>>,
    subscription: RefCell<Option<Rc<WalletSubscription>>>,
    /// Bumped by every connection attempt; results of older attempts are dropped.
    attempt: Cell<u64>,
}

impl<P: WalletProvider> WalletSession<P> {
    pub fn new(provider: Rc<P>, contract_address: impl Into<String>) -> Self {
        Self {
            provider,
            contract_address: contract_address.into(),
            state: RefCell::new(SessionState::default()),
            gateway: RefCell::new(None),
            subscription: RefCell::new(None),
            attempt: Cell::new(0),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn view(&self) -> WalletView {
        self.state.borrow().view()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    pub fn address(&self) -> Option<Address> {
        self.state.borrow().address
    }

    pub fn gateway(&self) -> Option<Rc<ContractGateway<P>>> {
        self.gateway.borrow().clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.borrow().as_ref().is_some_and(|s| s.is_active())
    }

    fn apply(&self, event: SessionEvent, next: SessionState) {
        let from = self.phase();
        match transition(from, event) {
            Some(to) if to == next.phase => {
                debug!(?from, ?to, ?event, "session transition");
            }
            other => {
                warn!(?from, ?event, expected = ?other, actual = ?next.phase, "unexpected session transition");
            }
        }
        *self.state.borrow_mut() = next;
    }

    fn begin_attempt(&self) -> u64 {
        let attempt = self.attempt.get() + 1;
        self.attempt.set(attempt);
        attempt
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.attempt.get() == attempt
    }

    fn contract(&self) -> Result<Address> {
        parse_address(&self.contract_address).map_err(Error::config)
    }

    /// Whether the configured contract address is well-formed.
    pub fn has_valid_contract(&self) -> bool {
        self.contract().is_ok()
    }

    /// Requests account access and binds a gateway for the configured contract.
    ///
    /// The contract address is checked before the wallet is touched. Any
    /// failure leaves the session fully disconnected with the error recorded.
    pub async fn connect(&self) -> Result<()> {
        let attempt = self.begin_attempt();
        let contract = match self.contract() {
            Ok(contract) => contract,
            Err(err) => {
                warn!(address = %self.contract_address, "refusing to connect: {err}");
                self.apply(SessionEvent::ConnectRequested, SessionState::connecting());
                return Err(self.fail(attempt, err));
            }
        };

        self.gateway.replace(None);
        self.apply(SessionEvent::ConnectRequested, SessionState::connecting());

        let account = match self.provider.request_accounts().await {
            Ok(accounts) => accounts.first().copied().ok_or_else(|| {
                Error::new(ErrorCode::RemoteCall, "Wallet did not expose any account")
            }),
            Err(e) => Err(wallet_error(e)),
        };

        match account {
            Ok(account) => self.establish(attempt, contract, account).await,
            Err(err) => Err(self.fail(attempt, err)),
        }
    }

    async fn establish(&self, attempt: u64, contract: Address, account: Address) -> Result<()> {
        let gateway = Rc::new(ContractGateway::new(self.provider.clone(), contract, account));

        let derived = async {
            let admin = gateway.admin().await.map_err(|e| {
                Error::with_details(
                    ErrorCode::ContractNotFound,
                    "Could not connect to contract. Please make sure you are connected to the correct network.",
                    e.to_string(),
                )
            })?;
            let eligibility = gateway.voter_status(account).await?;
            Ok::<_, Error>((admin == account, eligibility))
        };

        let (is_admin, eligibility) = match derived.await {
            Ok(derived) => derived,
            Err(err) => return Err(self.fail(attempt, err)),
        };

        if !self.is_current(attempt) {
            debug!(attempt, "discarding superseded connection attempt");
            return Ok(());
        }

        if !self.is_subscribed() {
            match self.provider.subscribe() {
                Ok(subscription) => {
                    self.subscription.replace(Some(Rc::new(subscription)));
                }
                Err(err) => return Err(self.fail(attempt, wallet_error(err))),
            }
        }

        self.gateway.replace(Some(gateway));
        self.apply(SessionEvent::ConnectSucceeded, SessionState {
            phase: SessionPhase::Connected,
            address: Some(account),
            is_admin,
            eligibility,
            last_error: None,
        });
        info!(account = %checksum(&account), is_admin, "wallet connected");
        Ok(())
    }

    fn fail(&self, attempt: u64, err: Error) -> Error {
        if self.is_current(attempt) {
            warn!("connection failed: {err}");
            self.teardown(SessionEvent::ConnectFailed, Some(err.clone()));
        }
        err
    }

    /// Drops the gateway and the wallet listeners and resets the state.
    fn teardown(&self, event: SessionEvent, error: Option<Error>) {
        self.gateway.replace(None);
        if let Some(subscription) = self.subscription.replace(None) {
            subscription.release();
        }
        self.apply(event, error.map(SessionState::failed).unwrap_or_default());
    }

    /// Re-reads the bound account's voter record. No-op while not connected.
    ///
    /// On failure the previous eligibility stays and the error is recorded.
    pub async fn refresh_eligibility(&self) -> Result<()> {
        let (Some(gateway), Some(account)) = (self.gateway(), self.address()) else {
            return Ok(());
        };
        let attempt = self.attempt.get();

        let result = gateway.voter_status(account).await;
        if !self.is_current(attempt) {
            return Ok(());
        }

        let mut next = self.state();
        match result {
            Ok(eligibility) => {
                next.eligibility = eligibility;
                next.last_error = None;
                self.state.replace(next);
                Ok(())
            }
            Err(err) => {
                warn!("failed to refresh voter status: {err}");
                next.last_error = Some(err.clone());
                self.state.replace(next);
                Err(err)
            }
        }
    }

    /// Waits for the next wallet notification. `None` once the session no
    /// longer listens (never connected, or torn down).
    pub async fn next_event(&self) -> Option<WalletEvent> {
        let subscription = self.subscription.borrow().clone()?;
        subscription.next().await
    }

    pub async fn handle_event(&self, event: WalletEvent) -> Result<EventOutcome> {
        match event {
            WalletEvent::ChainChanged(chain) => {
                info!(%chain, "network changed, resetting session");
                self.begin_attempt();
                self.teardown(SessionEvent::NetworkChanged, None);
                Ok(EventOutcome::ReloadRequired)
            }
            WalletEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                None => {
                    if self.phase() == SessionPhase::Disconnected {
                        return Ok(EventOutcome::Ignored);
                    }
                    info!("wallet access revoked");
                    self.begin_attempt();
                    self.teardown(SessionEvent::AccountsRevoked, None);
                    Ok(EventOutcome::Disconnected)
                }
                Some(account) => {
                    if transition(self.phase(), SessionEvent::AccountChanged).is_none() {
                        return Ok(EventOutcome::Ignored);
                    }
                    info!(account = %checksum(&account), "account changed, reconnecting");
                    let attempt = self.begin_attempt();
                    self.gateway.replace(None);
                    self.apply(SessionEvent::AccountChanged, SessionState::connecting());
                    let contract = self.contract().map_err(|err| self.fail(attempt, err))?;
                    self.establish(attempt, contract, account).await?;
                    Ok(EventOutcome::Reconnected)
                }
            },
        }
    }
}
