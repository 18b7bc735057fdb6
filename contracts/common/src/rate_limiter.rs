//! Mint-Rate Limiter Module
//!
//! Bounds how much new supply can be issued per epoch, so a compromised
//! minter can only inflate by `max_mint_limit` per window.
//!
//! ## Epochs
//!
//! An epoch is `block_height / epoch_length`. The limiter only tracks the
//! epoch of the last successful mint:
//!
//! - **Same epoch**: the request draws down `last_mint_limit`
//! - **Later epoch** (including jumps over several epochs): the budget
//!   resets to `max_mint_limit` minus the request. Unused budget from
//!   skipped epochs is not carried forward.
//!
//! Parameter changes apply to the next evaluation and never rewrite the
//! stored headroom at set time. A lowered ceiling still caps the headroom a
//! same-epoch request can draw, so `last_mint_limit <= max_mint_limit` holds
//! after every `try_consume`.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::limiter::{GENESIS_EPOCH, INITIAL_EPOCH_LENGTH, INITIAL_MAX_MINT_LIMIT};
use crate::errors::{XPegError, XPegResult};
use crate::validation::{require_epoch_length, require_mint_limit, require_positive};

// ============================================================================
// Types
// ============================================================================

/// Limiter state owned by the Issuance Ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MintRateLimiter {
    /// Mint ceiling per epoch
    max_mint_limit: u64,
    /// Headroom left in the tracked epoch
    last_mint_limit: u64,
    /// Blocks per epoch
    epoch_length: u64,
    /// Epoch of the last successful mint
    last_epoch: u64,
}

impl Default for MintRateLimiter {
    fn default() -> Self {
        Self {
            max_mint_limit: INITIAL_MAX_MINT_LIMIT,
            last_mint_limit: INITIAL_MAX_MINT_LIMIT,
            epoch_length: INITIAL_EPOCH_LENGTH,
            last_epoch: GENESIS_EPOCH,
        }
    }
}

/// Outcome of a successful `try_consume`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    /// Epoch the amount was charged to
    pub epoch: u64,
    /// Headroom left in that epoch
    pub remaining: u64,
    /// Whether this call opened a new epoch
    pub epoch_reset: bool,
}

/// Read-only view of the limiter at a given height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintLimitStatus {
    /// Mint ceiling per epoch
    pub max_mint_limit: u64,
    /// Headroom a mint at this height would see
    pub remaining_in_epoch: u64,
    /// Epoch index at this height
    pub current_epoch: u64,
    /// First block of the next epoch
    pub epoch_resets_at: u64,
}

impl MintRateLimiter {
    /// Create a limiter with a fresh budget for the genesis epoch
    pub fn new(max_mint_limit: u64, epoch_length: u64) -> XPegResult<Self> {
        require_mint_limit(max_mint_limit)?;
        require_epoch_length(epoch_length)?;

        Ok(Self {
            max_mint_limit,
            last_mint_limit: max_mint_limit,
            epoch_length,
            last_epoch: GENESIS_EPOCH,
        })
    }

    pub fn max_mint_limit(&self) -> u64 {
        self.max_mint_limit
    }

    pub fn last_mint_limit(&self) -> u64 {
        self.last_mint_limit
    }

    pub fn epoch_length(&self) -> u64 {
        self.epoch_length
    }

    pub fn last_epoch(&self) -> u64 {
        self.last_epoch
    }

    /// Check fields of a limiter that did not come from `new`
    pub fn validate(&self) -> XPegResult<()> {
        require_mint_limit(self.max_mint_limit)?;
        require_epoch_length(self.epoch_length)?;
        Ok(())
    }

    /// Epoch index for a block height
    pub fn epoch_at(&self, block_height: u64) -> u64 {
        // `new`, `set_epoch_length` and `validate` all reject zero
        block_height / self.epoch_length
    }

    /// Headroom left in the tracked epoch, capped by the current ceiling
    fn epoch_headroom(&self) -> u64 {
        self.last_mint_limit.min(self.max_mint_limit)
    }

    /// Reject amounts above the absolute per-epoch ceiling.
    ///
    /// Runs before `try_consume` so an oversized request never reaches the
    /// epoch bookkeeping.
    pub fn check_ceiling(&self, amount: u64) -> XPegResult<()> {
        if amount > self.max_mint_limit {
            return Err(XPegError::AmountExceedsCeiling {
                amount,
                ceiling: self.max_mint_limit,
            });
        }
        Ok(())
    }

    /// Charge `amount` against the epoch containing `block_height`.
    ///
    /// Fails without mutating anything when the current epoch's headroom
    /// is too small.
    pub fn try_consume(&mut self, amount: u64, block_height: u64) -> XPegResult<ConsumeOutcome> {
        require_positive(amount)?;
        self.check_ceiling(amount)?;

        let current_epoch = self.epoch_at(block_height);

        if current_epoch == self.last_epoch {
            let headroom = self.epoch_headroom();
            if amount > headroom {
                return Err(XPegError::EpochBudgetExhausted {
                    requested: amount,
                    remaining: headroom,
                    epoch: current_epoch,
                });
            }
            self.last_mint_limit = headroom - amount;

            return Ok(ConsumeOutcome {
                epoch: current_epoch,
                remaining: self.last_mint_limit,
                epoch_reset: false,
            });
        }

        // check_ceiling guarantees amount <= max_mint_limit
        self.last_epoch = current_epoch;
        self.last_mint_limit = self.max_mint_limit - amount;

        Ok(ConsumeOutcome {
            epoch: current_epoch,
            remaining: self.last_mint_limit,
            epoch_reset: true,
        })
    }

    /// Replace the per-epoch ceiling; returns the old value
    pub fn set_max_mint_limit(&mut self, new_limit: u64) -> XPegResult<u64> {
        require_mint_limit(new_limit)?;
        let old = self.max_mint_limit;
        self.max_mint_limit = new_limit;
        Ok(old)
    }

    /// Replace the epoch length; returns the old value
    pub fn set_epoch_length(&mut self, new_length: u64) -> XPegResult<u64> {
        require_epoch_length(new_length)?;
        let old = self.epoch_length;
        self.epoch_length = new_length;
        Ok(old)
    }

    /// Headroom a mint at `block_height` would see
    pub fn remaining_at(&self, block_height: u64) -> u64 {
        if self.epoch_at(block_height) == self.last_epoch {
            self.epoch_headroom()
        } else {
            self.max_mint_limit
        }
    }

    /// Limiter status at `block_height`
    pub fn status(&self, block_height: u64) -> MintLimitStatus {
        let current_epoch = self.epoch_at(block_height);
        MintLimitStatus {
            max_mint_limit: self.max_mint_limit,
            remaining_in_epoch: self.remaining_at(block_height),
            current_epoch,
            epoch_resets_at: current_epoch
                .saturating_add(1)
                .saturating_mul(self.epoch_length),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
