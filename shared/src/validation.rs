use crate::address::parse_address;

pub const ADDRESS_HEX_LENGTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Address is empty")]
    EmptyAddress,
    #[error("Address must be {ADDRESS_HEX_LENGTH} hex digits, got {0:?}")]
    MalformedAddress(String),
    #[error("Address checksum mismatch: {0}")]
    BadChecksum(String),
    #[error("Candidate name is empty")]
    EmptyName,
}

/// Returns the trimmed name the contract should store.
pub fn validate_candidate_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() { return Err(ValidationError::EmptyName); }
    Ok(name)
}

/// Case-insensitive address equality. Both sides must be well-formed.
pub fn same_address(a: &str, b: &str) -> Result<bool, ValidationError> {
    Ok(parse_address(a)? == parse_address(b)?)
}
