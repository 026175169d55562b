use std::cell::RefCell;
use std::rc::Rc;

use ethers_core::types::TxHash;
use futures::join;
use shared::{
    checksum, parse_address, validate_candidate_name, Candidate, Error, Result, ResultsSummary,
    VotingView, WinnerInfo,
};
use tracing::{debug, info, warn};

use crate::gateway::{ContractGateway, PendingTransaction};
use crate::provider::WalletProvider;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VotingState {
    pub candidates: Vec<Candidate>,
    pub winner: Option<WinnerInfo>,
    /// Shared by every operation; overlapping calls are not tracked apart.
    pub loading: bool,
    pub error: Option<String>,
}

impl VotingState {
    pub fn view(&self) -> VotingView {
        VotingView {
            candidates: self.candidates.clone(),
            winner: self.winner.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

/// Candidate list, winner and the write operations of a connected session.
pub struct VotingSession<P: WalletProvider> {
    gateway: RefCell<Option<Rc<ContractGateway<P>>>>,
    state: RefCell<VotingState>,
}

impl<P: WalletProvider> Default for VotingSession<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: WalletProvider> VotingSession<P> {
    pub fn new() -> Self {
        Self {
            gateway: RefCell::new(None),
            state: RefCell::new(VotingState::default()),
        }
    }

    /// Points the session at a new gateway (or none). Data read through the
    /// previous one is dropped.
    pub fn bind(&self, gateway: Option<Rc<ContractGateway<P>>>) {
        self.gateway.replace(gateway);
        self.state.replace(VotingState::default());
    }

    pub fn is_bound(&self) -> bool {
        self.gateway.borrow().is_some()
    }

    pub fn state(&self) -> VotingState {
        self.state.borrow().clone()
    }

    pub fn view(&self) -> VotingView {
        self.state.borrow().view()
    }

    pub fn results(&self) -> ResultsSummary {
        let state = self.state.borrow();
        ResultsSummary::new(&state.candidates, state.winner.as_ref())
    }

    fn gateway(&self) -> Option<Rc<ContractGateway<P>>> {
        self.gateway.borrow().clone()
    }

    fn update(&self, f: impl FnOnce(&mut VotingState)) {
        let mut next = self.state();
        f(&mut next);
        self.state.replace(next);
    }

    fn begin(&self) {
        self.update(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn fail(&self, operation: &str, err: Error) -> Error {
        warn!("{operation} failed: {err}");
        self.update(|s| {
            s.loading = false;
            s.error = Some(err.message.clone());
        });
        err
    }

    /// Like `fail`, but leaves the state alone once `gateway` has been
    /// replaced: that state belongs to another session now.
    fn fail_through(&self, operation: &str, gateway: &ContractGateway<P>, err: Error) -> Error {
        if !self.is_current(gateway) {
            warn!("{operation} failed after the session changed: {err}");
            return err;
        }
        self.fail(operation, err)
    }

    /// Results read through a gateway that has since been replaced are dropped.
    fn is_current(&self, gateway: &ContractGateway<P>) -> bool {
        self.gateway.borrow().as_deref().is_some_and(|g| std::ptr::eq(g, gateway))
    }

    async fn load_candidates(&self, gateway: &ContractGateway<P>) {
        self.begin();
        let result = gateway.candidates().await;
        if !self.is_current(gateway) {
            return;
        }
        match result {
            Ok(candidates) => self.update(|s| {
                s.candidates = candidates;
                s.loading = false;
            }),
            // Keep the previous list on screen.
            Err(err) => {
                self.fail("loading candidates", err);
            }
        }
    }

    async fn load_winner(&self, gateway: &ContractGateway<P>) {
        let result = gateway.winner().await;
        if !self.is_current(gateway) {
            return;
        }
        let winner = match result {
            Ok(winner) => winner,
            Err(err) if err.is_benign() => {
                debug!("no winner yet: {err}");
                None
            }
            Err(err) => {
                warn!("winner unavailable, showing none: {err}");
                None
            }
        };
        self.update(|s| s.winner = winner);
    }

    /// Reads candidates and winner concurrently. Candidate failures are
    /// recorded in `error`; winner failures only mean "no winner yet".
    pub async fn refresh(&self) {
        let Some(gateway) = self.gateway() else {
            return;
        };
        join!(self.load_candidates(&gateway), self.load_winner(&gateway));
    }

    async fn confirm(
        &self,
        operation: &str,
        gateway: &ContractGateway<P>,
        pending: Result<PendingTransaction<P>>,
    ) -> Result<TxHash> {
        let pending = pending.map_err(|e| self.fail_through(operation, gateway, e))?;
        let hash = pending.hash();
        pending.wait().await.map_err(|e| self.fail_through(operation, gateway, e))?;
        Ok(hash)
    }

    fn bound(&self, operation: &str) -> Result<Rc<ContractGateway<P>>> {
        self.gateway().ok_or_else(|| self.fail(operation, Error::not_connected()))
    }

    /// Adds a candidate and refreshes once the transaction is mined.
    pub async fn add_candidate(&self, name: &str) -> Result<TxHash> {
        let gateway = self.bound("addCandidate")?;
        let name = validate_candidate_name(name).map_err(|e| self.fail("addCandidate", e.into()))?;

        self.begin();
        let hash = self.confirm("addCandidate", &gateway, gateway.add_candidate(name).await).await?;
        info!(%name, "candidate added");
        self.refresh().await;
        Ok(hash)
    }

    /// Authorizes `voter`. Candidate data is unaffected, so no refresh; the
    /// caller re-reads eligibility when `voter` is its own account.
    pub async fn allow_voter(&self, voter: &str) -> Result<TxHash> {
        let gateway = self.bound("allowVoter")?;
        let voter = parse_address(voter).map_err(|e| self.fail("allowVoter", e.into()))?;

        self.begin();
        let hash = self.confirm("allowVoter", &gateway, gateway.allow_voter(voter).await).await?;
        info!(voter = %checksum(&voter), "voter authorized");
        if self.is_current(&gateway) {
            self.update(|s| s.loading = false);
        }
        Ok(hash)
    }

    /// Casts a vote and refreshes. The caller re-reads eligibility afterwards.
    pub async fn vote(&self, index: u64) -> Result<TxHash> {
        let gateway = self.bound("vote")?;

        self.begin();
        let hash = self.confirm("vote", &gateway, gateway.vote(index).await).await?;
        info!(index, "vote cast");
        self.refresh().await;
        Ok(hash)
    }
}
