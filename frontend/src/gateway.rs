use std::rc::Rc;

use ethers_core::types::{Address, Bytes, TransactionReceipt, TxHash, U64};
use shared::{checksum, Candidate, Error, ErrorCode, Result, VoterStatus, WinnerInfo};
use tracing::{debug, info};

use crate::abi::{self, AbiError};
use crate::provider::{ProviderError, WalletProvider};

/// Typed access to one deployed voting contract through one wallet.
///
/// Every read is a fresh remote call; nothing is cached or retried.
pub struct ContractGateway<P: WalletProvider> {
    provider: Rc<P>,
    address: Address,
    signer: Address,
}

/// A submitted write. The effect is only durable once `wait` succeeds.
pub struct PendingTransaction<P: WalletProvider> {
    hash: TxHash,
    provider: Rc<P>,
}

fn remote_call_error(function: &str, err: impl std::fmt::Display) -> Error {
    Error::with_details(ErrorCode::RemoteCall, format!("Failed to read {function}"), err.to_string())
}

fn decode_error(function: &str, err: AbiError) -> Error {
    match err {
        AbiError::Empty => Error::with_details(
            ErrorCode::RemoteCall,
            format!("Failed to read {function}"),
            "no contract at this address on the current network",
        ),
        other => remote_call_error(function, other),
    }
}

fn transaction_error(function: &str, err: ProviderError) -> Error {
    match err {
        // Surface the contract's own message verbatim.
        ProviderError::Reverted { reason: Some(reason) } => Error::with_details(
            ErrorCode::Transaction,
            reason,
            format!("{function} reverted"),
        ),
        other => Error::with_details(ErrorCode::Transaction, other.to_string(), format!("{function} failed")),
    }
}

impl<P: WalletProvider> ContractGateway<P> {
    pub fn new(provider: Rc<P>, address: Address, signer: Address) -> Self {
        Self { provider, address, signer }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The account that signs writes made through this gateway.
    pub fn signer(&self) -> Address {
        self.signer
    }

    async fn read(&self, function: &str, data: Bytes) -> Result<Bytes> {
        self.provider
            .call(self.address, data)
            .await
            .map_err(|e| remote_call_error(function, e))
    }

    async fn submit(&self, function: &str, data: Bytes) -> Result<PendingTransaction<P>> {
        let hash = self.provider
            .send_transaction(self.signer, self.address, data)
            .await
            .map_err(|e| transaction_error(function, e))?;
        debug!(%function, ?hash, "transaction submitted");
        Ok(PendingTransaction { hash, provider: self.provider.clone() })
    }

    pub async fn admin(&self) -> Result<Address> {
        let raw = self.read(abi::ADMIN, abi::admin_call()).await?;
        abi::decode_admin(&raw).map_err(|e| decode_error(abi::ADMIN, e))
    }

    /// All candidates in storage (append) order.
    pub async fn candidates(&self) -> Result<Vec<Candidate>> {
        let raw = self.read(abi::GET_CANDIDATES, abi::get_candidates_call()).await?;
        abi::decode_candidates(&raw).map_err(|e| decode_error(abi::GET_CANDIDATES, e))
    }

    pub async fn candidate(&self, index: u64) -> Result<Candidate> {
        let raw = self.read(abi::CANDIDATES, abi::candidate_call(index)).await?;
        abi::decode_candidate(&raw).map_err(|e| decode_error(abi::CANDIDATES, e))
    }

    pub async fn voter_status(&self, voter: Address) -> Result<VoterStatus> {
        let raw = self.read(abi::VOTERS, abi::voters_call(voter)).await?;
        abi::decode_voter(&raw).map_err(|e| decode_error(abi::VOTERS, e))
    }

    /// `Ok(None)` when the contract reports zero votes. A reverted call maps
    /// to `WinnerUnavailable`, which callers treat the same way.
    pub async fn winner(&self) -> Result<Option<WinnerInfo>> {
        let raw = match self.provider.call(self.address, abi::get_winner_call()).await {
            Ok(raw) => raw,
            Err(ProviderError::Reverted { reason }) => {
                return Err(Error::with_details(
                    ErrorCode::WinnerUnavailable,
                    "No winner yet",
                    reason.unwrap_or_else(|| "getWinner() reverted".into()),
                ));
            }
            Err(e) => return Err(remote_call_error(abi::GET_WINNER, e)),
        };
        abi::decode_winner(&raw).map_err(|e| decode_error(abi::GET_WINNER, e))
    }

    pub async fn add_candidate(&self, name: &str) -> Result<PendingTransaction<P>> {
        self.submit(abi::ADD_CANDIDATE, abi::add_candidate_call(name)).await
    }

    pub async fn allow_voter(&self, voter: Address) -> Result<PendingTransaction<P>> {
        self.submit(abi::ALLOW_VOTER, abi::allow_voter_call(voter)).await
    }

    /// Eligibility, double votes and index range are enforced by the contract.
    pub async fn vote(&self, index: u64) -> Result<PendingTransaction<P>> {
        self.submit(abi::VOTE, abi::vote_call(index)).await
    }
}

impl<P: WalletProvider> PendingTransaction<P> {
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub async fn wait(self) -> Result<TransactionReceipt> {
        let receipt = self.provider
            .wait_for_receipt(self.hash)
            .await
            .map_err(|e| transaction_error("receipt", e))?;

        if receipt.status == Some(U64::zero()) {
            return Err(Error::with_details(
                ErrorCode::Transaction,
                "Transaction reverted",
                format!("{:?}", self.hash),
            ));
        }
        info!(hash = ?self.hash, block = ?receipt.block_number, "transaction confirmed");
        Ok(receipt)
    }
}

impl<P: WalletProvider> std::fmt::Debug for ContractGateway<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractGateway")
            .field("address", &checksum(&self.address))
            .field("signer", &checksum(&self.signer))
            .finish()
    }
}
