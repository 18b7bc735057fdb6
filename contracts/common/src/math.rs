//! Mathematical Utilities for xPeg Protocol
//!
//! Checked arithmetic for share conversion and fee calculation, plus
//! deterministic identity derivation.

use sha2::{Digest, Sha256};

use crate::constants::fees::BPS_DENOMINATOR;
use crate::errors::{XPegError, XPegResult};
use crate::types::Address;

/// Compute `floor(amount * numerator / denominator)` without intermediate overflow.
///
/// Rounds down, which in share conversion always favors the pool.
pub fn mul_div_floor(amount: u64, numerator: u64, denominator: u64) -> XPegResult<u64> {
    if denominator == 0 {
        return Err(XPegError::DivisionByZero);
    }

    let result = (amount as u128)
        .checked_mul(numerator as u128)
        .ok_or(XPegError::Overflow)?
        / denominator as u128;

    u64::try_from(result).map_err(|_| XPegError::Overflow)
}

/// Fee owed on `amount` at `fee_bps` basis points (floor)
pub fn calculate_bps_fee(amount: u64, fee_bps: u64) -> XPegResult<u64> {
    mul_div_floor(amount, fee_bps, BPS_DENOMINATOR)
}

/// Checked addition that reports overflow as a typed error
pub fn checked_add(a: u64, b: u64) -> XPegResult<u64> {
    a.checked_add(b).ok_or(XPegError::Overflow)
}

/// Derive a deterministic identity from a domain tag, a seed account, and a nonce
pub fn derive_address(domain: &[u8], seed: &Address, nonce: u64) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(seed);
    hasher.update(nonce.to_le_bytes());
    let result = hasher.finalize();
    let mut id = [0u8; 32];
    id.copy_from_slice(&result);
    id
}
