use ethers_core::types::Address;
use ethers_core::utils::to_checksum;

use crate::validation::{ValidationError, ADDRESS_HEX_LENGTH};

/// Parses a hex account or contract address.
///
/// The `0x` prefix is optional. Inputs in a single letter case are taken
/// as-is; mixed-case inputs carry an EIP-55 checksum that has to match.
pub fn parse_address(raw: &str) -> Result<Address, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::EmptyAddress);
    }

    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.len() != ADDRESS_HEX_LENGTH || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::MalformedAddress(raw.to_string()));
    }

    let bytes = hex::decode(digits).map_err(|_| ValidationError::MalformedAddress(raw.to_string()))?;
    let address = Address::from_slice(&bytes);

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && checksum(&address)[2..] != *digits {
        return Err(ValidationError::BadChecksum(raw.to_string()));
    }

    Ok(address)
}

/// EIP-55 mixed-case rendering, `0x`-prefixed.
pub fn checksum(address: &Address) -> String {
    to_checksum(address, None)
}

/// `0x1234...abcd` form used in compact displays.
pub fn shorten_address(address: &Address) -> String {
    let full = checksum(address);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
