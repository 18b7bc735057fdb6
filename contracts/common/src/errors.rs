//! Error Types for xPeg Protocol
//!
//! Typed failures shared by the Issuance Ledger and the Instant Pool.
//! Every failure aborts the whole operation; nothing is retried internally.

use core::fmt;

use crate::types::{Address, Role};

/// Result type alias for xPeg operations
pub type XPegResult<T> = Result<T, XPegError>;

/// Main error enum for all xPeg protocol errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPegError {
    // ============ Authorization Errors ============
    /// Caller failed an ownership, role, or router check
    Unauthorized { expected: Option<Address>, actual: Address },

    /// Adding a role member twice or removing an absent one
    RoleStateConflict { role: Role, account: Address },

    // ============ Argument Errors ============
    /// Zero amount not allowed
    ZeroAmount,

    /// Null identity or otherwise unusable address
    InvalidAddress { reason: &'static str },

    /// Invalid input parameter
    InvalidArgument { param: &'static str, reason: &'static str },

    // ============ Limiter Errors ============
    /// Request exceeds the absolute per-epoch mint ceiling
    AmountExceedsCeiling { amount: u64, ceiling: u64 },

    /// Request exceeds the headroom left in the current epoch
    EpochBudgetExhausted { requested: u64, remaining: u64, epoch: u64 },

    // ============ Balance Errors ============
    /// Balance mutation would go negative
    InsufficientBalance { available: u64, requested: u64 },

    /// Share balance mutation would go negative
    InsufficientShares { available: u64, requested: u64 },

    /// Spender has not been approved for the amount
    InsufficientAllowance { available: u64, requested: u64 },

    /// Ledger balances no longer sum to the recorded supply
    SupplyMismatch { recorded: u64, summed: u128 },

    // ============ Pool Errors ============
    /// Withdraw against a pool with zero share supply
    PoolEmpty,

    // ============ Execution Errors ============
    /// Guarded operation re-entered while already executing
    ReentrancyRejected,

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    Overflow,

    /// Division by zero
    DivisionByZero,
}

impl XPegError {
    /// Returns a human-readable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "E020_UNAUTHORIZED",
            Self::RoleStateConflict { .. } => "E021_ROLE_CONFLICT",
            Self::ZeroAmount => "E010_ZERO_AMOUNT",
            Self::InvalidAddress { .. } => "E011_INVALID_ADDRESS",
            Self::InvalidArgument { .. } => "E012_INVALID_ARGUMENT",
            Self::AmountExceedsCeiling { .. } => "E030_EXCEEDS_CEILING",
            Self::EpochBudgetExhausted { .. } => "E031_EPOCH_EXHAUSTED",
            Self::InsufficientBalance { .. } => "E040_INSUFFICIENT_BALANCE",
            Self::InsufficientShares { .. } => "E041_INSUFFICIENT_SHARES",
            Self::InsufficientAllowance { .. } => "E042_INSUFFICIENT_ALLOWANCE",
            Self::SupplyMismatch { .. } => "E043_SUPPLY_MISMATCH",
            Self::PoolEmpty => "E050_POOL_EMPTY",
            Self::ReentrancyRejected => "E060_REENTRANCY",
            Self::Overflow => "E080_OVERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
        }
    }

    /// Returns true if this error is recoverable (caller can fix it)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::EpochBudgetExhausted { .. } => true, // Wait for next epoch
            Self::InsufficientBalance { .. } => true,  // Get more funds
            Self::InsufficientShares { .. } => true,   // Redeem less
            Self::InsufficientAllowance { .. } => true, // Approve more
            Self::ReentrancyRejected => true,          // Resubmit after outer call
            _ => false,
        }
    }
}

impl fmt::Display for XPegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { expected: Some(_), .. } => {
                write!(f, "{}: caller is not the authorized account", self.code())
            }
            Self::Unauthorized { expected: None, .. } => {
                write!(f, "{}: caller lacks the required role", self.code())
            }
            Self::RoleStateConflict { role, .. } => {
                write!(f, "{}: {:?} membership already in requested state", self.code(), role)
            }
            Self::InvalidAddress { reason } => write!(f, "{}: {}", self.code(), reason),
            Self::InvalidArgument { param, reason } => {
                write!(f, "{}: {} {}", self.code(), param, reason)
            }
            Self::AmountExceedsCeiling { amount, ceiling } => {
                write!(f, "{}: {} above ceiling {}", self.code(), amount, ceiling)
            }
            Self::EpochBudgetExhausted { requested, remaining, epoch } => write!(
                f,
                "{}: requested {} with {} left in epoch {}",
                self.code(),
                requested,
                remaining,
                epoch
            ),
            Self::InsufficientBalance { available, requested }
            | Self::InsufficientShares { available, requested }
            | Self::InsufficientAllowance { available, requested } => write!(
                f,
                "{}: requested {} but only {} available",
                self.code(),
                requested,
                available
            ),
            Self::SupplyMismatch { recorded, summed } => {
                write!(f, "{}: supply {} vs balances {}", self.code(), recorded, summed)
            }
            _ => f.write_str(self.code()),
        }
    }
}

impl std::error::Error for XPegError {}
