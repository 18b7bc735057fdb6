//! Validation Helpers for xPeg Protocol
//!
//! Precondition checks run at the top of every operation, before any state
//! is touched. Each helper returns a typed failure so entry points can chain
//! them with `?`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xpeg_common::validation::{check, require_positive, require_valid_address};
//!
//! require_positive(amount)?;
//! require_valid_address(&receiver, "receiver is the null identity")?;
//! check!(fee_bps <= MAX_INSTANT_FEE_BPS, XPegError::InvalidArgument { .. });
//! ```

use crate::constants::fees::MAX_INSTANT_FEE_BPS;
use crate::errors::{XPegError, XPegResult};
use crate::types::{is_zero_address, Address};

// ============ Validation Macro ============

/// Check a condition and return an error if it fails.
///
/// ```rust,ignore
/// check!(amount > 0, XPegError::ZeroAmount);
/// ```
#[macro_export]
macro_rules! check {
    ($condition:expr, $error:expr) => {
        if !($condition) {
            return Err($error);
        }
    };
}

pub use check;

// ============ Amount Helpers ============

/// Require a strictly positive amount.
pub fn require_positive(amount: u64) -> XPegResult<()> {
    check!(amount > 0, XPegError::ZeroAmount);
    Ok(())
}

/// Require `available >= requested`.
pub fn require_sufficient_balance(available: u64, requested: u64) -> XPegResult<()> {
    check!(
        available >= requested,
        XPegError::InsufficientBalance { available, requested }
    );
    Ok(())
}

// ============ Identity Helpers ============

/// Require address to not be the null identity.
pub fn require_valid_address(address: &Address, reason: &'static str) -> XPegResult<()> {
    check!(!is_zero_address(address), XPegError::InvalidAddress { reason });
    Ok(())
}

/// Require the caller to be one specific account.
pub fn require_caller(expected: &Address, caller: &Address) -> XPegResult<()> {
    check!(
        expected == caller,
        XPegError::Unauthorized { expected: Some(*expected), actual: *caller }
    );
    Ok(())
}

// ============ Parameter Helpers ============

/// Require a usable epoch length.
pub fn require_epoch_length(length: u64) -> XPegResult<()> {
    check!(
        length > 0,
        XPegError::InvalidArgument { param: "epoch_length", reason: "must be non-zero" }
    );
    Ok(())
}

/// Require a usable mint ceiling.
pub fn require_mint_limit(limit: u64) -> XPegResult<()> {
    check!(
        limit > 0,
        XPegError::InvalidArgument { param: "max_mint_limit", reason: "must be non-zero" }
    );
    Ok(())
}

/// Require a loan fee within `[0, MAX_INSTANT_FEE_BPS]`.
pub fn require_fee_bps(fee_bps: u64) -> XPegResult<()> {
    check!(
        fee_bps <= MAX_INSTANT_FEE_BPS,
        XPegError::InvalidArgument { param: "instant_fee_bps", reason: "above 10000 bps" }
    );
    Ok(())
}
