use serde::{Serialize, Deserialize};

use crate::models::{Candidate, WinnerInfo};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    /// Position in the contract's candidate list.
    pub index: u64,
    pub name: String,
    pub votes: u64,
    pub percentage: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    /// Summed wide so that any set of decoded counts fits.
    pub total_votes: u128,
    /// Highest count first; equal counts keep contract order.
    pub standings: Vec<Standing>,
    pub winner: Option<WinnerInfo>,
}

impl ResultsSummary {
    pub fn new(candidates: &[Candidate], winner: Option<&WinnerInfo>) -> Self {
        let total_votes = candidates.iter().map(|c| u128::from(c.vote_count)).sum();

        let mut standings: Vec<_> = candidates.iter()
            .enumerate()
            .map(|(index, c)| Standing {
                index: index as u64,
                name: c.name.clone(),
                votes: c.vote_count,
                percentage: percentage(c.vote_count, total_votes),
            })
            .collect();
        standings.sort_by(|a, b| b.votes.cmp(&a.votes));

        Self {
            total_votes,
            standings,
            winner: winner.filter(|w| w.votes > 0).cloned(),
        }
    }

    /// First candidate holding the highest non-zero count.
    pub fn leader(&self) -> Option<WinnerInfo> {
        self.standings.first()
            .filter(|s| s.votes > 0)
            .map(|s| WinnerInfo { name: s.name.clone(), votes: s.votes })
    }

    pub fn percentage_of(&self, index: u64) -> Option<u8> {
        self.standings.iter().find(|s| s.index == index).map(|s| s.percentage)
    }
}

/// Share of `total` in whole percent, ties on .5 rounded to even so that a
/// two-way split like 37.5 / 62.5 still adds up to 100.
pub fn percentage(votes: u64, total: u128) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = u128::from(votes) * 100;
    let (quotient, remainder) = (scaled / total, scaled % total);
    let rounded = match (remainder * 2).cmp(&total) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + (quotient % 2),
    };
    rounded.min(100) as u8
}
