//! ERC20 call encoding for `eth_call`.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};

use crate::error::FetchError;

sol! {
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }
}

/// `0x`-prefixed calldata for `call`.
pub fn encode<C: SolCall>(call: &C) -> String {
    format!("0x{}", hex::encode(call.abi_encode()))
}

pub fn encode_balance_of(holder: Address) -> String {
    encode(&IERC20::balanceOfCall { account: holder })
}

pub fn decode_hex(data: &str) -> Result<Vec<u8>, FetchError> {
    let trimmed = data.trim().trim_start_matches("0x");
    hex::decode(trimmed).map_err(|e| FetchError::InvalidResponse(format!("bad hex: {}", e)))
}

fn decode_returns<C: SolCall>(data: &[u8]) -> Result<C::Return, FetchError> {
    C::abi_decode_returns(data, true).map_err(|e| {
        FetchError::InvalidResponse(format!("bad {} return: {}", C::SIGNATURE, e))
    })
}

/// Hex quantity such as `"0x1bc16d674ec80000"`.
pub fn decode_quantity(data: &str) -> Result<U256, FetchError> {
    let trimmed = data.trim().trim_start_matches("0x");
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(trimmed, 16)
        .map_err(|e| FetchError::InvalidResponse(format!("bad quantity '{}': {}", data, e)))
}

/// A single `uint256` return, as from `totalSupply()` or `balanceOf(address)`.
pub fn decode_uint(data: &str) -> Result<U256, FetchError> {
    let bytes = decode_hex(data)?;
    Ok(decode_returns::<IERC20::totalSupplyCall>(&bytes)?._0)
}

pub fn decode_u8(data: &str) -> Result<u8, FetchError> {
    let bytes = decode_hex(data)?;
    Ok(decode_returns::<IERC20::decimalsCall>(&bytes)?._0)
}

/// Dynamic ABI string, or a legacy right-padded `bytes32` string.
pub fn decode_string(data: &str) -> Result<String, FetchError> {
    let bytes = decode_hex(data)?;

    // A dynamic string is at least offset + length words, so one word is bytes32.
    if bytes.len() == 32 {
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(32);
        return Ok(String::from_utf8_lossy(&bytes[..end]).into_owned());
    }

    let decoded = decode_returns::<IERC20::nameCall>(&bytes)?._0;
    Ok(decoded.trim_end_matches('\0').to_string())
}
