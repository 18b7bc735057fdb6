//! Underlying Asset Interface
//!
//! The capability the Instant Pool needs from the asset it holds: read a
//! balance, push funds out of its own custody, and pull approved funds in.
//! Transfers are all-or-nothing; an `Err` means no balance moved.

use crate::errors::XPegResult;
use crate::types::{Address, AssetId, CallContext};

/// Fungible asset ledger consumed by the pool
pub trait UnderlyingAsset: Send + Sync {
    /// Stable identifier of this asset instance
    fn asset_id(&self) -> AssetId;

    /// Balance held by `account`
    fn balance_of(&self, account: &Address) -> u64;

    /// Move `amount` from `ctx.sender` to `to`
    fn transfer(&self, ctx: &CallContext, to: &Address, amount: u64) -> XPegResult<()>;

    /// Move `amount` from `owner` to `recipient`, spending the allowance
    /// `owner` granted to `ctx.sender`
    fn transfer_from(
        &self,
        ctx: &CallContext,
        owner: &Address,
        recipient: &Address,
        amount: u64,
    ) -> XPegResult<()>;
}
