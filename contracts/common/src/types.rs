//! Core Types for xPeg Protocol
//!
//! Identities, call contexts, and the serializable action enums that a host
//! decodes and hands to the contracts.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Type alias for account identities (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for asset identifiers
pub type AssetId = [u8; 32];

/// The null identity; never a valid caller, receiver, or role member
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Returns true for the null identity
pub fn is_zero_address(address: &Address) -> bool {
    *address == ZERO_ADDRESS
}

// ============ Call Context ============

/// Who is calling, and when.
///
/// `block_height` is the monotonically increasing time counter the
/// mint-rate limiter divides into epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CallContext {
    /// Account invoking the operation
    pub sender: Address,
    /// Current block height
    pub block_height: u64,
}

impl CallContext {
    pub fn new(sender: Address, block_height: u64) -> Self {
        Self { sender, block_height }
    }
}

// ============ Roles ============

/// Privileged roles on the Issuance Ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Role {
    /// May mint, subject to the rate limiter
    Minter,
    /// May burn its own balance
    Burner,
}

// ============ Token Actions ============

/// Operations accepted by the Issuance Ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum TokenAction {
    /// Mint new supply to `receiver`
    Mint { receiver: Address, amount: u64 },
    /// Burn from the caller's own balance
    Burn { amount: u64 },
    /// Move the caller's balance to `to`
    Transfer { to: Address, amount: u64 },
    /// Set the allowance of `spender` over the caller's balance
    Approve { spender: Address, amount: u64 },
    /// Grant a role (owner only)
    AddRole { role: Role, account: Address },
    /// Revoke a role (owner only)
    RemoveRole { role: Role, account: Address },
    /// Change the per-epoch mint ceiling (owner only)
    SetMaxMintLimit { limit: u64 },
    /// Change the epoch length in blocks (owner only)
    SetEpochLength { length: u64 },
    /// Hand ownership to another account (owner only)
    TransferOwnership { new_owner: Address },
}

// ============ Pool Actions ============

/// Operations accepted by the Instant Pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum PoolAction {
    /// Deposit underlying and mint shares to `depositor`
    AddLiquidity { depositor: Address, amount: u64 },
    /// Deposit underlying without minting shares
    AddLiquidityWithoutMint { amount: u64 },
    /// Burn the caller's shares and pay `redeemer`
    RemoveLiquidity { redeemer: Address, share_amount: u64 },
    /// Disburse a loan to `borrower` (router only)
    GetLoan { borrower: Address, amount: u64 },
    /// Replace the loan router (owner only)
    SetInstantRouter { router: Address },
    /// Replace the loan fee in basis points (owner only)
    SetInstantPercentageFee { fee_bps: u64 },
    /// Hand ownership to another account (owner only)
    TransferOwnership { new_owner: Address },
}
