//! Browser client for the on-chain voting contract: wallet session, contract
//! access and the voting state shown by the UI.

pub mod abi;
pub mod app;
pub mod config;
pub mod gateway;
pub mod provider;
pub mod telemetry;
pub mod voting;
pub mod wallet;

#[cfg(target_arch = "wasm32")]
pub mod bindings;
#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use app::VotingApp;
pub use gateway::{ContractGateway, PendingTransaction};
pub use provider::{ProviderError, WalletEvent, WalletProvider, WalletSubscription};
pub use voting::{VotingSession, VotingState};
pub use wallet::{transition, EventOutcome, SessionEvent, SessionState, WalletSession};

#[cfg(test)]
mod tests;
