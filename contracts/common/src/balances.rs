//! Balance Ledger Module
//!
//! Account balances plus an exact total-supply counter. Both the pegged
//! token and the pool shares are kept in one of these.
//!
//! ## Invariants
//!
//! - `sum(balances) == total_supply` after every mutation
//! - Every mutation checks overflow/underflow before touching state, so a
//!   failed call leaves the ledger exactly as it was
//! - Zero balances are pruned, so `holder_count` counts non-empty accounts

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{XPegError, XPegResult};
use crate::types::Address;

/// What a ledger denominates; selects the shortfall error it reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum LedgerKind {
    /// Pegged asset balances
    Asset,
    /// Pool-share balances
    Shares,
}

/// Account to balance map with its total supply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct BalanceLedger {
    kind: LedgerKind,
    balances: BTreeMap<Address, u64>,
    total_supply: u64,
}

impl BalanceLedger {
    /// Create an empty ledger
    pub fn new(kind: LedgerKind) -> Self {
        Self {
            kind,
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    pub fn kind(&self) -> LedgerKind {
        self.kind
    }

    /// Balance of `account` (zero if unknown)
    pub fn balance_of(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Number of accounts with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Iterate non-zero balances in account order
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &u64)> {
        self.balances.iter()
    }

    fn shortfall(&self, available: u64, requested: u64) -> XPegError {
        match self.kind {
            LedgerKind::Asset => XPegError::InsufficientBalance { available, requested },
            LedgerKind::Shares => XPegError::InsufficientShares { available, requested },
        }
    }

    /// Fail unless `credit(account, amount)` would succeed
    pub fn ensure_can_credit(&self, account: &Address, amount: u64) -> XPegResult<()> {
        self.total_supply.checked_add(amount).ok_or(XPegError::Overflow)?;
        self.balance_of(account).checked_add(amount).ok_or(XPegError::Overflow)?;
        Ok(())
    }

    /// Fail unless `debit(account, amount)` would succeed
    pub fn ensure_can_debit(&self, account: &Address, amount: u64) -> XPegResult<()> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(self.shortfall(available, amount));
        }
        Ok(())
    }

    /// Increase `account` and the total supply by `amount`
    pub fn credit(&mut self, account: &Address, amount: u64) -> XPegResult<()> {
        let new_supply = self.total_supply.checked_add(amount).ok_or(XPegError::Overflow)?;
        let new_balance = self.balance_of(account).checked_add(amount).ok_or(XPegError::Overflow)?;

        if new_balance > 0 {
            self.balances.insert(*account, new_balance);
        }
        self.total_supply = new_supply;
        Ok(())
    }

    /// Decrease `account` and the total supply by `amount`
    pub fn debit(&mut self, account: &Address, amount: u64) -> XPegResult<()> {
        self.ensure_can_debit(account, amount)?;

        let new_balance = self.balance_of(account) - amount;
        if new_balance == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(*account, new_balance);
        }
        // Each balance is bounded by the supply
        self.total_supply -= amount;
        Ok(())
    }

    /// Move `amount` from `from` to `to`; total supply is unchanged
    pub fn move_balance(&mut self, from: &Address, to: &Address, amount: u64) -> XPegResult<()> {
        self.ensure_can_debit(from, amount)?;
        if from == to {
            return Ok(());
        }

        let new_to = self.balance_of(to).checked_add(amount).ok_or(XPegError::Overflow)?;
        let new_from = self.balance_of(from) - amount;

        if new_from == 0 {
            self.balances.remove(from);
        } else {
            self.balances.insert(*from, new_from);
        }
        if new_to > 0 {
            self.balances.insert(*to, new_to);
        }
        Ok(())
    }

    /// Check that balances sum to the recorded supply
    pub fn verify_supply(&self) -> XPegResult<()> {
        let summed: u128 = self.balances.values().map(|b| *b as u128).sum();
        if summed != self.total_supply as u128 {
            return Err(XPegError::SupplyMismatch {
                recorded: self.total_supply,
                summed,
            });
        }
        Ok(())
    }
}
