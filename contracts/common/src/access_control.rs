//! Access Control Module
//!
//! Ownership and the minter/burner role registry for the Issuance Ledger.
//!
//! ## Key Features
//!
//! - **Ownership**: A single owner gates administrative operations
//! - **Role Registry**: Two independent sets, minters and burners
//! - **Strict Idempotency**: Re-adding a member or removing an absent one fails
//! - **Capability Interface**: Ledgers query roles through `MintAuthority`

use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{XPegError, XPegResult};
use crate::types::{Address, Role};
use crate::validation::{require_caller, require_valid_address};

// ============================================================================
// Capability Interface
// ============================================================================

/// Role queries consumed by the Issuance Ledger.
///
/// Both queries reject the null identity with `InvalidAddress`.
pub trait MintAuthority {
    /// Whether `account` may mint
    fn is_minter(&self, account: &Address) -> XPegResult<bool>;

    /// Whether `account` may burn its own balance
    fn is_burner(&self, account: &Address) -> XPegResult<bool>;
}

// ============================================================================
// Ownership
// ============================================================================

/// Single-owner administrative gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Ownership {
    owner: Address,
}

impl Ownership {
    /// Create ownership for a non-null owner
    pub fn new(owner: Address) -> XPegResult<Self> {
        require_valid_address(&owner, "owner is the null identity")?;
        Ok(Self { owner })
    }

    /// Current owner
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Fail unless `caller` is the owner
    pub fn only_owner(&self, caller: &Address) -> XPegResult<()> {
        require_caller(&self.owner, caller)
    }

    /// Hand ownership to `new_owner`; returns the previous owner
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> XPegResult<Address> {
        self.only_owner(caller)?;
        require_valid_address(&new_owner, "new owner is the null identity")?;
        let previous = self.owner;
        self.owner = new_owner;
        Ok(previous)
    }
}

// ============================================================================
// Role Registry
// ============================================================================

/// Minter and burner sets keyed by account identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RoleRegistry {
    minters: BTreeSet<Address>,
    burners: BTreeSet<Address>,
}

impl RoleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn members(&self, role: Role) -> &BTreeSet<Address> {
        match role {
            Role::Minter => &self.minters,
            Role::Burner => &self.burners,
        }
    }

    fn members_mut(&mut self, role: Role) -> &mut BTreeSet<Address> {
        match role {
            Role::Minter => &mut self.minters,
            Role::Burner => &mut self.burners,
        }
    }

    /// Check membership; the null identity is rejected
    pub fn has_role(&self, role: Role, account: &Address) -> XPegResult<bool> {
        require_valid_address(account, "role query for the null identity")?;
        Ok(self.members(role).contains(account))
    }

    /// Add `account` to `role`; fails if already a member
    pub fn grant(&mut self, role: Role, account: Address) -> XPegResult<()> {
        require_valid_address(&account, "role grant to the null identity")?;
        if !self.members_mut(role).insert(account) {
            return Err(XPegError::RoleStateConflict { role, account });
        }
        Ok(())
    }

    /// Remove `account` from `role`; fails if not a member
    pub fn revoke(&mut self, role: Role, account: Address) -> XPegResult<()> {
        require_valid_address(&account, "role revoke of the null identity")?;
        if !self.members_mut(role).remove(&account) {
            return Err(XPegError::RoleStateConflict { role, account });
        }
        Ok(())
    }

    /// Number of members holding `role`
    pub fn count(&self, role: Role) -> usize {
        self.members(role).len()
    }
}

impl MintAuthority for RoleRegistry {
    fn is_minter(&self, account: &Address) -> XPegResult<bool> {
        self.has_role(Role::Minter, account)
    }

    fn is_burner(&self, account: &Address) -> XPegResult<bool> {
        self.has_role(Role::Burner, account)
    }
}

/// Fail with `Unauthorized` unless `caller` holds the minter role
pub fn require_minter<A: MintAuthority + ?Sized>(authority: &A, caller: &Address) -> XPegResult<()> {
    if !authority.is_minter(caller)? {
        return Err(XPegError::Unauthorized { expected: None, actual: *caller });
    }
    Ok(())
}

/// Fail with `Unauthorized` unless `caller` holds the burner role
pub fn require_burner<A: MintAuthority + ?Sized>(authority: &A, caller: &Address) -> XPegResult<()> {
    if !authority.is_burner(caller)? {
        return Err(XPegError::Unauthorized { expected: None, actual: *caller });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
