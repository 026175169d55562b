//! Call-data encoding and return-data decoding for the deployed voting
//! contract. Signatures are fixed by the deployed bytecode and must not drift.

use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::{Address, Bytes, U256};
use ethers_core::utils::id;
use shared::{Candidate, VoterStatus, WinnerInfo};

pub const ADMIN: &str = "admin()";
pub const CANDIDATES: &str = "candidates(uint256)";
pub const VOTERS: &str = "voters(address)";
pub const ADD_CANDIDATE: &str = "addCandidate(string)";
pub const ALLOW_VOTER: &str = "allowVoter(address)";
pub const VOTE: &str = "vote(uint256)";
pub const GET_CANDIDATES: &str = "getCandidates()";
pub const GET_WINNER: &str = "getWinner()";

/// Selector of the `Error(string)` revert payload emitted by `require`.
pub const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AbiError {
    #[error("contract returned no data")]
    Empty,
    #[error("cannot decode {function} output: {reason}")]
    Decode { function: &'static str, reason: String },
    #[error("{field} does not fit in 64 bits: {value}")]
    Overflow { field: &'static str, value: U256 },
}

pub fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(args));
    data.into()
}

pub fn admin_call() -> Bytes {
    encode_call(ADMIN, &[])
}

pub fn candidate_call(index: u64) -> Bytes {
    encode_call(CANDIDATES, &[Token::Uint(index.into())])
}

pub fn voters_call(voter: Address) -> Bytes {
    encode_call(VOTERS, &[Token::Address(voter)])
}

pub fn get_candidates_call() -> Bytes {
    encode_call(GET_CANDIDATES, &[])
}

pub fn get_winner_call() -> Bytes {
    encode_call(GET_WINNER, &[])
}

pub fn add_candidate_call(name: &str) -> Bytes {
    encode_call(ADD_CANDIDATE, &[Token::String(name.to_string())])
}

pub fn allow_voter_call(voter: Address) -> Bytes {
    encode_call(ALLOW_VOTER, &[Token::Address(voter)])
}

pub fn vote_call(index: u64) -> Bytes {
    encode_call(VOTE, &[Token::Uint(index.into())])
}

fn decode(function: &'static str, types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    if data.is_empty() {
        return Err(AbiError::Empty);
    }
    abi::decode(types, data).map_err(|e| AbiError::Decode { function, reason: e.to_string() })
}

fn malformed(function: &'static str) -> AbiError {
    AbiError::Decode { function, reason: "unexpected token layout".into() }
}

fn to_u64(field: &'static str, value: U256) -> Result<u64, AbiError> {
    if value > U256::from(u64::MAX) {
        return Err(AbiError::Overflow { field, value });
    }
    Ok(value.as_u64())
}

fn candidate_tokens(function: &'static str, tokens: Vec<Token>) -> Result<Candidate, AbiError> {
    match <[Token; 2]>::try_from(tokens) {
        Ok([Token::String(name), Token::Uint(count)]) => Ok(Candidate {
            name,
            vote_count: to_u64("voteCount", count)?,
        }),
        _ => Err(malformed(function)),
    }
}

pub fn decode_admin(data: &[u8]) -> Result<Address, AbiError> {
    decode(ADMIN, &[ParamType::Address], data)?
        .pop()
        .and_then(Token::into_address)
        .ok_or_else(|| malformed(ADMIN))
}

pub fn decode_candidate(data: &[u8]) -> Result<Candidate, AbiError> {
    let tokens = decode(CANDIDATES, &[ParamType::String, ParamType::Uint(256)], data)?;
    candidate_tokens(CANDIDATES, tokens)
}

/// `getCandidates()` returns `(string name, uint voteCount)[]` in storage order.
pub fn decode_candidates(data: &[u8]) -> Result<Vec<Candidate>, AbiError> {
    let entry = ParamType::Tuple(vec![ParamType::String, ParamType::Uint(256)]);
    let list = decode(GET_CANDIDATES, &[ParamType::Array(Box::new(entry))], data)?
        .pop()
        .and_then(Token::into_array)
        .ok_or_else(|| malformed(GET_CANDIDATES))?;

    list.into_iter()
        .map(|item| {
            let fields = item.into_tuple().ok_or_else(|| malformed(GET_CANDIDATES))?;
            candidate_tokens(GET_CANDIDATES, fields)
        })
        .collect()
}

pub fn decode_voter(data: &[u8]) -> Result<VoterStatus, AbiError> {
    let tokens = decode(VOTERS, &[ParamType::Bool, ParamType::Bool, ParamType::Uint(256)], data)?;
    match <[Token; 3]>::try_from(tokens) {
        Ok([Token::Bool(is_allowed), Token::Bool(has_voted), Token::Uint(index)]) => Ok(VoterStatus {
            is_allowed,
            has_voted,
            vote_index: to_u64("voteIndex", index)?,
        }),
        _ => Err(malformed(VOTERS)),
    }
}

/// Zero votes decodes to `None`: the contract has nothing to report yet.
pub fn decode_winner(data: &[u8]) -> Result<Option<WinnerInfo>, AbiError> {
    let tokens = decode(GET_WINNER, &[ParamType::String, ParamType::Uint(256)], data)?;
    match <[Token; 2]>::try_from(tokens) {
        Ok([Token::String(name), Token::Uint(votes)]) => {
            let votes = to_u64("winnerVotes", votes)?;
            Ok((votes > 0).then_some(WinnerInfo { name, votes }))
        }
        _ => Err(malformed(GET_WINNER)),
    }
}

/// Extracts the message of an `Error(string)` revert payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&REVERT_SELECTOR[..])?;
    abi::decode(&[ParamType::String], payload).ok()?
        .pop()
        .and_then(Token::into_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_match_deployed_contract() {
        assert_eq!(hex::encode(id(ADMIN)), "f851a440");
        assert_eq!(hex::encode(id(CANDIDATES)), "3477ee2e");
        assert_eq!(hex::encode(id(VOTERS)), "a3ec138d");
        assert_eq!(hex::encode(id(ADD_CANDIDATE)), "462e91ec");
        assert_eq!(hex::encode(id(ALLOW_VOTER)), "171b11c8");
        assert_eq!(hex::encode(id(VOTE)), "0121b93f");
        assert_eq!(hex::encode(id(GET_CANDIDATES)), "06a49fce");
        assert_eq!(hex::encode(id(GET_WINNER)), "8e7ea5b2");
        assert_eq!(id("Error(string)"), REVERT_SELECTOR);
    }

    #[test]
    fn vote_call_layout() {
        let data = vote_call(2);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &id(VOTE)[..]);
        assert_eq!(data[35], 2);
    }

    #[test]
    fn decodes_candidate_list() {
        let encoded = abi::encode(&[Token::Array(vec![
            Token::Tuple(vec![Token::String("Alice".into()), Token::Uint(3.into())]),
            Token::Tuple(vec![Token::String("Bob".into()), Token::Uint(5.into())]),
        ])]);
        let candidates = decode_candidates(&encoded).unwrap();
        assert_eq!(candidates, vec![
            Candidate { name: "Alice".into(), vote_count: 3 },
            Candidate { name: "Bob".into(), vote_count: 5 },
        ]);

        let empty = abi::encode(&[Token::Array(vec![])]);
        assert!(decode_candidates(&empty).unwrap().is_empty());
    }

    #[test]
    fn oversized_counts_fail_loudly() {
        let huge = U256::from(u64::MAX) + 1;
        let encoded = abi::encode(&[Token::Array(vec![
            Token::Tuple(vec![Token::String("Alice".into()), Token::Uint(huge)]),
        ])]);
        assert!(matches!(
            decode_candidates(&encoded),
            Err(AbiError::Overflow { field: "voteCount", .. })
        ));

        let encoded = abi::encode(&[Token::String("Bob".into()), Token::Uint(u64::MAX.into())]);
        assert_eq!(decode_winner(&encoded).unwrap().unwrap().votes, u64::MAX);
    }

    #[test]
    fn empty_return_data_is_an_error() {
        assert_eq!(decode_admin(&[]), Err(AbiError::Empty));
        assert!(matches!(decode_voter(&[0u8; 5]), Err(AbiError::Decode { .. })));
    }

    #[test]
    fn zero_vote_winner_is_none() {
        let encoded = abi::encode(&[Token::String(String::new()), Token::Uint(0.into())]);
        assert_eq!(decode_winner(&encoded), Ok(None));
    }

    #[test]
    fn revert_reason_round_trip() {
        let mut payload = REVERT_SELECTOR.to_vec();
        payload.extend(abi::encode(&[Token::String("You have already voted".into())]));
        assert_eq!(decode_revert_reason(&payload).as_deref(), Some("You have already voted"));
        assert_eq!(decode_revert_reason(&[1, 2, 3, 4]), None);
    }
}
