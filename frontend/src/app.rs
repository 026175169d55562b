use std::rc::Rc;

use ethers_core::types::TxHash;
use futures::join;
use shared::{parse_address, Result, ResultsSummary, VotingView, WalletView};
use tracing::{debug, warn};

use crate::provider::{WalletEvent, WalletProvider};
use crate::voting::VotingSession;
use crate::wallet::{EventOutcome, WalletSession};

/// One user's session: the wallet connection plus the voting data read
/// through it. This is the surface the UI layer drives.
pub struct VotingApp<P: WalletProvider> {
    provider: Rc<P>,
    wallet: WalletSession<P>,
    voting: VotingSession<P>,
}

impl<P: WalletProvider> VotingApp<P> {
    pub fn new(provider: Rc<P>, contract_address: impl Into<String>) -> Self {
        Self {
            wallet: WalletSession::new(provider.clone(), contract_address),
            voting: VotingSession::new(),
            provider,
        }
    }

    pub fn wallet(&self) -> &WalletSession<P> {
        &self.wallet
    }

    pub fn voting(&self) -> &VotingSession<P> {
        &self.voting
    }

    pub fn wallet_view(&self) -> WalletView {
        self.wallet.view()
    }

    pub fn voting_view(&self) -> VotingView {
        self.voting.view()
    }

    pub fn results(&self) -> ResultsSummary {
        self.voting.results()
    }

    fn rebind(&self) {
        self.voting.bind(self.wallet.gateway());
    }

    pub async fn connect(&self) -> Result<()> {
        let connected = self.wallet.connect().await;
        self.rebind();
        connected?;
        self.voting.refresh().await;
        Ok(())
    }

    /// Connects without prompting when the wallet already exposes an account
    /// to this page. Returns whether a connection was attempted.
    pub async fn resume(&self) -> Result<bool> {
        if !self.wallet.has_valid_contract() {
            debug!("not resuming: contract address is invalid");
            return Ok(false);
        }
        match self.provider.current_address().await {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(false),
            Err(err) => {
                debug!("no wallet to resume: {err}");
                return Ok(false);
            }
        }
        self.connect().await?;
        Ok(true)
    }

    /// Re-reads everything the UI shows, both halves concurrently.
    pub async fn refresh_all(&self) {
        let (_, eligibility) = join!(self.voting.refresh(), self.wallet.refresh_eligibility());
        if let Err(err) = eligibility {
            debug!("eligibility left stale: {err}");
        }
    }

    pub async fn add_candidate(&self, name: &str) -> Result<TxHash> {
        self.voting.add_candidate(name).await
    }

    pub async fn allow_voter(&self, voter: &str) -> Result<TxHash> {
        let hash = self.voting.allow_voter(voter).await?;
        let own = match (parse_address(voter), self.wallet.address()) {
            (Ok(voter), Some(own)) => voter == own,
            _ => false,
        };
        if own {
            self.refresh_eligibility().await;
        }
        Ok(hash)
    }

    pub async fn vote(&self, index: u64) -> Result<TxHash> {
        let hash = self.voting.vote(index).await?;
        self.refresh_eligibility().await;
        Ok(hash)
    }

    async fn refresh_eligibility(&self) {
        // The write itself succeeded; a failed re-read is already recorded
        // on the wallet side.
        if let Err(err) = self.wallet.refresh_eligibility().await {
            warn!("eligibility refresh after write failed: {err}");
        }
    }

    pub async fn next_event(&self) -> Option<WalletEvent> {
        self.wallet.next_event().await
    }

    /// Applies a wallet notification and keeps the voting side in step.
    pub async fn handle_event(&self, event: WalletEvent) -> Result<EventOutcome> {
        let outcome = self.wallet.handle_event(event).await;
        match outcome {
            Ok(EventOutcome::Ignored) => {}
            Ok(EventOutcome::Reconnected) => {
                self.rebind();
                self.voting.refresh().await;
            }
            Ok(EventOutcome::ReloadRequired) => {
                self.rebind();
                self.provider.reload();
            }
            Ok(EventOutcome::Disconnected) | Err(_) => self.rebind(),
        }
        outcome
    }

    /// Handles wallet notifications until the session stops listening or the
    /// host has to reload.
    pub async fn run_events(&self, mut on_change: impl FnMut()) {
        while let Some(event) = self.next_event().await {
            let outcome = self.handle_event(event).await;
            on_change();
            if matches!(outcome, Ok(EventOutcome::ReloadRequired)) {
                break;
            }
        }
    }
}
