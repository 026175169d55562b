use serde::{Serialize, Deserialize};

/// A ballot entry as stored by the contract. Its position in the
/// contract's list is the only identifier the client has.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub name: String,
    pub vote_count: u64,
}

/// Per-address record kept by the contract. Addresses that were never
/// authorized read back as the default value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoterStatus {
    pub is_allowed: bool,
    pub has_voted: bool,
    /// Only meaningful when `has_voted` is set.
    pub vote_index: u64,
}

impl VoterStatus {
    pub fn can_vote(&self) -> bool {
        self.is_allowed && !self.has_voted
    }

    pub fn voted_for(&self, index: u64) -> bool {
        self.has_voted && self.vote_index == index
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WinnerInfo {
    pub name: String,
    pub votes: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// What the UI sees of the wallet session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub phase: SessionPhase,
    pub connected: bool,
    pub address: Option<String>,
    pub short_address: Option<String>,
    pub is_admin: bool,
    pub eligibility: VoterStatus,
    pub error: Option<String>,
}

/// What the UI sees of the candidate list and winner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VotingView {
    pub candidates: Vec<Candidate>,
    pub winner: Option<WinnerInfo>,
    pub loading: bool,
    pub error: Option<String>,
}
