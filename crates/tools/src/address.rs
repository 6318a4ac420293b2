//! Account address validation.
//!
//! Addresses are accepted only in their canonical textual form: a `0x`
//! prefix followed by exactly 40 hexadecimal digits. Mixed case is allowed
//! but the EIP-55 checksum is not enforced.

use alloy_primitives::Address;

use crate::error::DeployError;

const ADDRESS_PREFIX: &str = "0x";
const ADDRESS_HEX_LEN: usize = 40;

/// Parse a textual address, failing with `MalformedAddress` on anything
/// other than `0x` + 40 hex digits, and on the zero address.
pub fn parse_address(raw: &str) -> Result<Address, DeployError> {
    let malformed = || DeployError::MalformedAddress(raw.to_string());

    let digits = raw.strip_prefix(ADDRESS_PREFIX).ok_or_else(malformed)?;
    if digits.len() != ADDRESS_HEX_LEN || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }

    let address: Address = digits.parse().map_err(|_| malformed())?;
    if address.is_zero() {
        return Err(malformed());
    }
    Ok(address)
}
