//! xPeg Token Contract
//!
//! Issuance ledger for the cross-chain pegged asset. Minting is restricted
//! to the minter role and throttled by the per-epoch mint-rate limiter;
//! burning is restricted to the burner role and only touches the caller's
//! own balance.
//!
//! ## Serialization
//!
//! `mint` and `burn` run inside the token's `CallLock`: concurrent callers
//! are ordered, and a nested call from inside a running mint or burn fails
//! with `ReentrancyRejected`. Every other mutation is serialized by the
//! state mutex alone.
//!
//! ## Atomicity
//!
//! Checks run first and state is written last. The limiter is charged on a
//! scratch copy that is only committed once the balance credit succeeds.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use xpeg_common::{
    access_control::{require_burner, require_minter, MintAuthority, Ownership, RoleRegistry},
    asset::UnderlyingAsset,
    balances::{BalanceLedger, LedgerKind},
    constants::{domains, limiter, token},
    errors::{XPegError, XPegResult},
    events::{EventLog, XPegEvent},
    guard::CallLock,
    math::derive_address,
    rate_limiter::{MintLimitStatus, MintRateLimiter},
    types::{Address, AssetId, CallContext, Role, TokenAction},
    validation::{require_positive, require_valid_address},
};

// ============ Token Config ============

/// Instantiation parameters for a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TokenConfig {
    /// Administrative owner
    pub owner: Address,
    /// Mint ceiling per epoch
    pub max_mint_limit: u64,
    /// Blocks per epoch
    pub epoch_length: u64,
}

impl TokenConfig {
    /// Config with the protocol's initial limiter constants
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            max_mint_limit: limiter::INITIAL_MAX_MINT_LIMIT,
            epoch_length: limiter::INITIAL_EPOCH_LENGTH,
        }
    }

    pub fn with_limits(mut self, max_mint_limit: u64, epoch_length: u64) -> Self {
        self.max_mint_limit = max_mint_limit;
        self.epoch_length = epoch_length;
        self
    }

    /// Check every field without building anything
    pub fn validate(&self) -> XPegResult<()> {
        require_valid_address(&self.owner, "owner is the null identity")?;
        MintRateLimiter::new(self.max_mint_limit, self.epoch_length)?;
        Ok(())
    }
}

// ============ Results ============

/// Outcome of a successful mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintResult {
    /// Amount minted
    pub amount: u64,
    /// New total supply
    pub new_supply: u64,
    /// Epoch the mint was charged to
    pub epoch: u64,
    /// Headroom left in that epoch
    pub remaining_epoch_limit: u64,
}

/// Outcome of a successful burn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnResult {
    /// Amount burned
    pub amount: u64,
    /// Burner balance after the burn
    pub remaining_balance: u64,
    /// New total supply
    pub new_supply: u64,
}

// ============ Persisted State ============

/// Durable layout of a token: limiter fields, balances, supply, roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TokenSnapshot {
    pub asset_id: AssetId,
    pub ownership: Ownership,
    pub roles: RoleRegistry,
    pub limiter: MintRateLimiter,
    pub ledger: BalanceLedger,
    pub allowances: Vec<(Address, Address, u64)>,
}

#[derive(Debug)]
struct TokenState {
    ownership: Ownership,
    roles: RoleRegistry,
    limiter: MintRateLimiter,
    ledger: BalanceLedger,
    allowances: BTreeMap<(Address, Address), u64>,
    events: EventLog,
}

impl TokenState {
    fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: u64) {
        if amount == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
    }
}

// ============ Token ============

/// The pegged asset's issuance ledger
#[derive(Debug)]
pub struct PegToken {
    asset_id: AssetId,
    lock: CallLock,
    state: Mutex<TokenState>,
}

impl PegToken {
    /// Instantiate a token with zero supply and an empty role registry
    pub fn new(config: TokenConfig) -> XPegResult<Self> {
        config.validate()?;

        let ownership = Ownership::new(config.owner)?;
        let limiter = MintRateLimiter::new(config.max_mint_limit, config.epoch_length)?;

        Ok(Self {
            asset_id: derive_address(domains::TOKEN_ASSET, &config.owner, 0),
            lock: CallLock::new(),
            state: Mutex::new(TokenState {
                ownership,
                roles: RoleRegistry::new(),
                limiter,
                ledger: BalanceLedger::new(LedgerKind::Asset),
                allowances: BTreeMap::new(),
                events: EventLog::new(),
            }),
        })
    }

    /// Restore a token from a persisted snapshot.
    ///
    /// The snapshot is checked the way `new` checks a config, so a restored
    /// token never holds parameters `new` would have refused.
    pub fn from_snapshot(snapshot: TokenSnapshot) -> XPegResult<Self> {
        require_valid_address(&snapshot.ownership.owner(), "owner is the null identity")?;
        snapshot.limiter.validate()?;
        snapshot.ledger.verify_supply()?;

        let allowances = snapshot
            .allowances
            .into_iter()
            .filter(|(_, _, amount)| *amount > 0)
            .map(|(owner, spender, amount)| ((owner, spender), amount))
            .collect();

        Ok(Self {
            asset_id: snapshot.asset_id,
            lock: CallLock::new(),
            state: Mutex::new(TokenState {
                ownership: snapshot.ownership,
                roles: snapshot.roles,
                limiter: snapshot.limiter,
                ledger: snapshot.ledger,
                allowances,
                events: EventLog::new(),
            }),
        })
    }

    // ============ Metadata ============

    pub fn name() -> &'static str {
        token::NAME
    }

    pub fn symbol() -> &'static str {
        token::SYMBOL
    }

    pub fn decimals() -> u8 {
        token::DECIMALS
    }

    // ============ Issuance ============

    /// Mint `amount` to `receiver`.
    ///
    /// Caller must hold the minter role; `amount` must fit under the
    /// per-epoch ceiling and the headroom left in the current epoch.
    pub fn mint(&self, ctx: &CallContext, receiver: &Address, amount: u64) -> XPegResult<MintResult> {
        let _guard = self.lock.enter()?;
        let mut state = self.state.lock();

        require_minter(&state.roles, &ctx.sender)?;
        require_positive(amount)?;
        require_valid_address(receiver, "mint receiver is the null identity")?;
        state.limiter.check_ceiling(amount)?;
        state.ledger.ensure_can_credit(receiver, amount)?;

        let mut limiter = state.limiter.clone();
        let outcome = limiter.try_consume(amount, ctx.block_height)?;

        state.ledger.credit(receiver, amount)?;
        state.limiter = limiter;

        let new_supply = state.ledger.total_supply();
        state.events.emit(XPegEvent::TokenMint {
            minter: ctx.sender,
            to: *receiver,
            amount,
            new_total_supply: new_supply,
            remaining_epoch_limit: outcome.remaining,
            block_height: ctx.block_height,
        });

        Ok(MintResult {
            amount,
            new_supply,
            epoch: outcome.epoch,
            remaining_epoch_limit: outcome.remaining,
        })
    }

    /// Burn `amount` from the caller's own balance (burner role only)
    pub fn burn(&self, ctx: &CallContext, amount: u64) -> XPegResult<BurnResult> {
        let _guard = self.lock.enter()?;
        let mut state = self.state.lock();

        require_burner(&state.roles, &ctx.sender)?;
        require_positive(amount)?;

        state.ledger.debit(&ctx.sender, amount)?;

        let new_supply = state.ledger.total_supply();
        state.events.emit(XPegEvent::TokenBurn {
            burner: ctx.sender,
            amount,
            new_total_supply: new_supply,
            block_height: ctx.block_height,
        });

        Ok(BurnResult {
            amount,
            remaining_balance: state.ledger.balance_of(&ctx.sender),
            new_supply,
        })
    }

    // ============ Ledger ============

    /// Move `amount` from the caller to `to`
    pub fn transfer(&self, ctx: &CallContext, to: &Address, amount: u64) -> XPegResult<()> {
        let mut state = self.state.lock();

        require_positive(amount)?;
        require_valid_address(to, "transfer recipient is the null identity")?;

        state.ledger.move_balance(&ctx.sender, to, amount)?;
        state.events.emit(XPegEvent::TokenTransfer {
            from: ctx.sender,
            to: *to,
            amount,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    /// Let `spender` move up to `amount` of the caller's balance
    pub fn approve(&self, ctx: &CallContext, spender: &Address, amount: u64) -> XPegResult<()> {
        let mut state = self.state.lock();

        require_valid_address(spender, "spender is the null identity")?;

        state.set_allowance(ctx.sender, *spender, amount);
        state.events.emit(XPegEvent::Approval {
            owner: ctx.sender,
            spender: *spender,
            amount,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    /// Move `amount` from `owner` to `recipient` on the caller's allowance
    pub fn transfer_from(
        &self,
        ctx: &CallContext,
        owner: &Address,
        recipient: &Address,
        amount: u64,
    ) -> XPegResult<()> {
        let mut state = self.state.lock();

        require_positive(amount)?;
        require_valid_address(recipient, "transfer recipient is the null identity")?;

        let allowance = state.allowance(owner, &ctx.sender);
        if allowance < amount {
            return Err(XPegError::InsufficientAllowance {
                available: allowance,
                requested: amount,
            });
        }

        state.ledger.move_balance(owner, recipient, amount)?;
        state.set_allowance(*owner, ctx.sender, allowance - amount);

        state.events.emit(XPegEvent::TokenTransfer {
            from: *owner,
            to: *recipient,
            amount,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    pub fn balance_of(&self, account: &Address) -> u64 {
        self.state.lock().ledger.balance_of(account)
    }

    pub fn total_supply(&self) -> u64 {
        self.state.lock().ledger.total_supply()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.state.lock().allowance(owner, spender)
    }

    // ============ Roles ============

    pub fn add_minter(&self, ctx: &CallContext, account: &Address) -> XPegResult<()> {
        self.grant_role(ctx, Role::Minter, *account)
    }

    pub fn remove_minter(&self, ctx: &CallContext, account: &Address) -> XPegResult<()> {
        self.revoke_role(ctx, Role::Minter, *account)
    }

    pub fn add_burner(&self, ctx: &CallContext, account: &Address) -> XPegResult<()> {
        self.grant_role(ctx, Role::Burner, *account)
    }

    pub fn remove_burner(&self, ctx: &CallContext, account: &Address) -> XPegResult<()> {
        self.revoke_role(ctx, Role::Burner, *account)
    }

    fn grant_role(&self, ctx: &CallContext, role: Role, account: Address) -> XPegResult<()> {
        let mut state = self.state.lock();
        state.ownership.only_owner(&ctx.sender)?;
        state.roles.grant(role, account)?;
        state.events.emit(XPegEvent::RoleGranted {
            role,
            account,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    fn revoke_role(&self, ctx: &CallContext, role: Role, account: Address) -> XPegResult<()> {
        let mut state = self.state.lock();
        state.ownership.only_owner(&ctx.sender)?;
        state.roles.revoke(role, account)?;
        state.events.emit(XPegEvent::RoleRevoked {
            role,
            account,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    pub fn is_minter(&self, account: &Address) -> XPegResult<bool> {
        self.state.lock().roles.is_minter(account)
    }

    pub fn is_burner(&self, account: &Address) -> XPegResult<bool> {
        self.state.lock().roles.is_burner(account)
    }

    // ============ Limiter Administration ============

    /// Replace the per-epoch mint ceiling (owner only)
    pub fn set_max_mint_limit(&self, ctx: &CallContext, new_limit: u64) -> XPegResult<()> {
        let mut state = self.state.lock();
        state.ownership.only_owner(&ctx.sender)?;

        let old_limit = state.limiter.set_max_mint_limit(new_limit)?;
        state.events.emit(XPegEvent::MaxMintLimitChanged {
            old_limit,
            new_limit,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    /// Replace the epoch length in blocks (owner only, non-zero)
    pub fn set_epoch_length(&self, ctx: &CallContext, new_length: u64) -> XPegResult<()> {
        let mut state = self.state.lock();
        state.ownership.only_owner(&ctx.sender)?;

        let old_length = state.limiter.set_epoch_length(new_length)?;
        state.events.emit(XPegEvent::EpochLengthChanged {
            old_length,
            new_length,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    pub fn mint_limit_status(&self, block_height: u64) -> MintLimitStatus {
        self.state.lock().limiter.status(block_height)
    }

    /// Copy of the limiter state
    pub fn limiter(&self) -> MintRateLimiter {
        self.state.lock().limiter.clone()
    }

    // ============ Ownership ============

    pub fn owner(&self) -> Address {
        self.state.lock().ownership.owner()
    }

    pub fn transfer_ownership(&self, ctx: &CallContext, new_owner: &Address) -> XPegResult<()> {
        let mut state = self.state.lock();
        let previous_owner = state.ownership.transfer_ownership(&ctx.sender, *new_owner)?;
        state.events.emit(XPegEvent::OwnershipTransferred {
            previous_owner,
            new_owner: *new_owner,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    // ============ Events & State ============

    /// Copy of the events emitted so far
    pub fn events(&self) -> Vec<XPegEvent> {
        self.state.lock().events.events().to_vec()
    }

    /// Take the events emitted so far
    pub fn drain_events(&self) -> Vec<XPegEvent> {
        self.state.lock().events.drain()
    }

    /// Check that balances sum to the total supply
    pub fn verify_supply(&self) -> XPegResult<()> {
        self.state.lock().ledger.verify_supply()
    }

    pub fn snapshot(&self) -> TokenSnapshot {
        let state = self.state.lock();
        TokenSnapshot {
            asset_id: self.asset_id,
            ownership: state.ownership.clone(),
            roles: state.roles.clone(),
            limiter: state.limiter.clone(),
            ledger: state.ledger.clone(),
            allowances: state
                .allowances
                .iter()
                .map(|((owner, spender), amount)| (*owner, *spender, *amount))
                .collect(),
        }
    }

    // ============ Dispatch ============

    /// Run a decoded action on behalf of `ctx.sender`
    pub fn execute(&self, ctx: &CallContext, action: &TokenAction) -> XPegResult<()> {
        match action {
            TokenAction::Mint { receiver, amount } => self.mint(ctx, receiver, *amount).map(|_| ()),
            TokenAction::Burn { amount } => self.burn(ctx, *amount).map(|_| ()),
            TokenAction::Transfer { to, amount } => self.transfer(ctx, to, *amount),
            TokenAction::Approve { spender, amount } => self.approve(ctx, spender, *amount),
            TokenAction::AddRole { role, account } => self.grant_role(ctx, *role, *account),
            TokenAction::RemoveRole { role, account } => self.revoke_role(ctx, *role, *account),
            TokenAction::SetMaxMintLimit { limit } => self.set_max_mint_limit(ctx, *limit),
            TokenAction::SetEpochLength { length } => self.set_epoch_length(ctx, *length),
            TokenAction::TransferOwnership { new_owner } => self.transfer_ownership(ctx, new_owner),
        }
    }
}

impl UnderlyingAsset for PegToken {
    fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    fn balance_of(&self, account: &Address) -> u64 {
        PegToken::balance_of(self, account)
    }

    fn transfer(&self, ctx: &CallContext, to: &Address, amount: u64) -> XPegResult<()> {
        PegToken::transfer(self, ctx, to, amount)
    }

    fn transfer_from(
        &self,
        ctx: &CallContext,
        owner: &Address,
        recipient: &Address,
        amount: u64,
    ) -> XPegResult<()> {
        PegToken::transfer_from(self, ctx, owner, recipient, amount)
    }
}

// ============ Helper Functions ============

/// Split an amount into whole units and base-unit remainder
pub fn format_amount(amount: u64) -> (u64, u64) {
    (amount / token::ONE, amount % token::ONE)
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;
    use xpeg_common::types::ZERO_ADDRESS;

    const OWNER: Address = [1u8; 32];
    const MINTER: Address = [2u8; 32];
    const BURNER: Address = [3u8; 32];
    const USER: Address = [4u8; 32];

    fn at(sender: Address, block_height: u64) -> CallContext {
        CallContext::new(sender, block_height)
    }

    /// Token with max 100 per 2000-block epoch and one minter, one burner
    fn create_test_token() -> PegToken {
        let token = PegToken::new(TokenConfig::new(OWNER).with_limits(100, 2000)).unwrap();
        token.add_minter(&at(OWNER, 0), &MINTER).unwrap();
        token.add_burner(&at(OWNER, 0), &BURNER).unwrap();
        token.drain_events();
        token
    }

    #[test]
    fn test_metadata() {
        assert_eq!(PegToken::name(), "xPegBTC");
        assert_eq!(PegToken::decimals(), 8);
        assert_eq!(format_amount(150_000_000), (1, 50_000_000));
    }

    #[test]
    fn test_config_validation() {
        assert!(TokenConfig::new(OWNER).validate().is_ok());
        assert!(PegToken::new(TokenConfig::new(ZERO_ADDRESS)).is_err());
        assert!(matches!(
            PegToken::new(TokenConfig::new(OWNER).with_limits(100, 0)),
            Err(XPegError::InvalidArgument { param: "epoch_length", .. })
        ));
    }

    #[test]
    fn test_mint_success() {
        let token = create_test_token();

        let result = token.mint(&at(MINTER, 500), &USER, 30).unwrap();

        assert_eq!(result.new_supply, 30);
        assert_eq!(result.remaining_epoch_limit, 70);
        assert_eq!(token.balance_of(&USER), 30);

        let limiter = token.limiter();
        assert_eq!(limiter.last_mint_limit(), 70);
        assert_eq!(limiter.last_epoch(), 0);

        let events = token.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], XPegEvent::TokenMint { amount: 30, .. }));
    }

    #[test]
    fn test_mint_epoch_reset() {
        let token = create_test_token();
        token.mint(&at(MINTER, 500), &USER, 30).unwrap();

        token.mint(&at(MINTER, 2500), &USER, 10).unwrap();

        let limiter = token.limiter();
        assert_eq!(limiter.last_epoch(), 1);
        assert_eq!(limiter.last_mint_limit(), 90);
        assert_eq!(token.total_supply(), 40);
    }

    #[test]
    fn test_mint_unauthorized() {
        let token = create_test_token();

        let result = token.mint(&at(USER, 500), &USER, 10);

        assert!(matches!(result, Err(XPegError::Unauthorized { .. })));
        assert_eq!(token.total_supply(), 0);
        assert_eq!(token.limiter().last_mint_limit(), 100);
        assert!(token.events().is_empty());
    }

    #[test]
    fn test_role_checked_before_arguments() {
        let token = create_test_token();

        assert!(matches!(
            token.mint(&at(USER, 1), &ZERO_ADDRESS, 0),
            Err(XPegError::Unauthorized { .. })
        ));
        assert!(matches!(token.burn(&at(USER, 1), 0), Err(XPegError::Unauthorized { .. })));
        assert!(matches!(token.mint(&at(MINTER, 1), &USER, 0), Err(XPegError::ZeroAmount)));
    }

    #[test]
    fn test_mint_exceeds_ceiling() {
        let token = create_test_token();

        let result = token.mint(&at(MINTER, 500), &USER, 101);

        assert!(matches!(result, Err(XPegError::AmountExceedsCeiling { .. })));
        assert_eq!(token.total_supply(), 0);
    }

    #[test]
    fn test_mint_budget_exhausted() {
        let token = create_test_token();
        token.mint(&at(MINTER, 100), &USER, 80).unwrap();

        let result = token.mint(&at(MINTER, 200), &USER, 25);

        assert!(matches!(result, Err(XPegError::EpochBudgetExhausted { remaining: 20, .. })));
        assert_eq!(token.limiter().last_mint_limit(), 20);
        assert_eq!(token.total_supply(), 80);
    }

    #[test]
    fn test_mint_overflow_does_not_charge_limiter() {
        let token = PegToken::new(TokenConfig::new(OWNER).with_limits(u64::MAX, 10)).unwrap();
        token.add_minter(&at(OWNER, 0), &MINTER).unwrap();
        token.mint(&at(MINTER, 0), &USER, u64::MAX - 5).unwrap();

        let result = token.mint(&at(MINTER, 20), &USER, 10);

        assert!(matches!(result, Err(XPegError::Overflow)));
        // Limiter still shows the epoch of the first mint
        assert_eq!(token.limiter().last_epoch(), 0);
        assert_eq!(token.limiter().last_mint_limit(), 5);
    }

    #[test]
    fn test_mint_to_null_identity_rejected() {
        let token = create_test_token();
        let result = token.mint(&at(MINTER, 1), &ZERO_ADDRESS, 10);
        assert!(matches!(result, Err(XPegError::InvalidAddress { .. })));
    }

    #[test]
    fn test_burn_success() {
        let token = create_test_token();
        token.mint(&at(MINTER, 1), &BURNER, 60).unwrap();

        let result = token.burn(&at(BURNER, 2), 25).unwrap();

        assert_eq!(result.remaining_balance, 35);
        assert_eq!(result.new_supply, 35);
        assert!(token.verify_supply().is_ok());
    }

    #[test]
    fn test_burn_requires_role() {
        let token = create_test_token();
        token.mint(&at(MINTER, 1), &USER, 60).unwrap();

        let result = token.burn(&at(USER, 2), 10);

        assert!(matches!(result, Err(XPegError::Unauthorized { .. })));
        assert_eq!(token.balance_of(&USER), 60);
    }

    #[test]
    fn test_burn_insufficient_balance() {
        let token = create_test_token();
        token.mint(&at(MINTER, 1), &BURNER, 10).unwrap();

        let result = token.burn(&at(BURNER, 2), 11);

        assert!(matches!(
            result,
            Err(XPegError::InsufficientBalance { available: 10, requested: 11 })
        ));
        assert_eq!(token.total_supply(), 10);
    }

    #[test]
    fn test_role_admin_is_owner_only() {
        let token = create_test_token();

        let result = token.add_minter(&at(USER, 1), &USER);
        assert!(matches!(result, Err(XPegError::Unauthorized { .. })));
        assert!(!token.is_minter(&USER).unwrap());
    }

    #[test]
    fn test_role_idempotency_conflicts() {
        let token = create_test_token();

        assert!(matches!(
            token.add_minter(&at(OWNER, 1), &MINTER),
            Err(XPegError::RoleStateConflict { role: Role::Minter, .. })
        ));
        assert!(matches!(
            token.remove_burner(&at(OWNER, 1), &USER),
            Err(XPegError::RoleStateConflict { role: Role::Burner, .. })
        ));

        token.remove_minter(&at(OWNER, 2), &MINTER).unwrap();
        assert!(!token.is_minter(&MINTER).unwrap());
        assert!(token.mint(&at(MINTER, 3), &USER, 1).is_err());
    }

    #[test]
    fn test_limiter_admin() {
        let token = create_test_token();

        assert!(matches!(
            token.set_epoch_length(&at(USER, 1), 10),
            Err(XPegError::Unauthorized { .. })
        ));
        assert!(matches!(
            token.set_epoch_length(&at(OWNER, 1), 0),
            Err(XPegError::InvalidArgument { .. })
        ));

        token.set_max_mint_limit(&at(OWNER, 1), 1_000).unwrap();
        token.set_epoch_length(&at(OWNER, 1), 10).unwrap();

        let status = token.mint_limit_status(25);
        assert_eq!(status.max_mint_limit, 1_000);
        assert_eq!(status.current_epoch, 2);
        assert_eq!(status.remaining_in_epoch, 1_000);
    }

    #[test]
    fn test_transfer_and_allowance() {
        let token = create_test_token();
        token.mint(&at(MINTER, 1), &USER, 100).unwrap();

        token.transfer(&at(USER, 2), &BURNER, 40).unwrap();
        assert_eq!(token.balance_of(&BURNER), 40);

        token.approve(&at(USER, 3), &OWNER, 50).unwrap();
        assert!(matches!(
            token.transfer_from(&at(OWNER, 4), &USER, &OWNER, 51),
            Err(XPegError::InsufficientAllowance { .. })
        ));

        token.transfer_from(&at(OWNER, 4), &USER, &OWNER, 50).unwrap();
        assert_eq!(token.balance_of(&OWNER), 50);
        assert_eq!(token.balance_of(&USER), 10);
        assert_eq!(token.allowance(&USER, &OWNER), 0);
        assert!(token.verify_supply().is_ok());
    }

    #[test]
    fn test_transfer_from_insufficient_balance_keeps_allowance() {
        let token = create_test_token();
        token.mint(&at(MINTER, 1), &USER, 10).unwrap();
        token.approve(&at(USER, 2), &OWNER, 50).unwrap();

        let result = token.transfer_from(&at(OWNER, 3), &USER, &OWNER, 20);

        assert!(matches!(result, Err(XPegError::InsufficientBalance { .. })));
        assert_eq!(token.allowance(&USER, &OWNER), 50);
    }

    #[test]
    fn test_transfer_ownership() {
        let token = create_test_token();
        token.transfer_ownership(&at(OWNER, 1), &USER).unwrap();

        assert_eq!(token.owner(), USER);
        assert!(token.set_max_mint_limit(&at(OWNER, 2), 5).is_err());
        assert!(token.set_max_mint_limit(&at(USER, 2), 5).is_ok());
    }

    #[test]
    fn test_execute_dispatch() {
        let token = create_test_token();

        token
            .execute(&at(MINTER, 1), &TokenAction::Mint { receiver: USER, amount: 7 })
            .unwrap();
        token
            .execute(&at(OWNER, 2), &TokenAction::AddRole { role: Role::Burner, account: USER })
            .unwrap();
        token.execute(&at(USER, 3), &TokenAction::Burn { amount: 7 }).unwrap();

        assert_eq!(token.total_supply(), 0);
        assert_eq!(token.drain_events().len(), 3);
    }

    #[test]
    fn test_snapshot_roundtrip_cbor() {
        let token = create_test_token();
        token.mint(&at(MINTER, 10), &USER, 42).unwrap();
        token.approve(&at(USER, 11), &OWNER, 5).unwrap();

        let snapshot = token.snapshot();
        let mut bytes = Vec::new();
        ciborium::into_writer(&snapshot, &mut bytes).unwrap();
        let decoded: TokenSnapshot = ciborium::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(decoded, snapshot);

        let restored = PegToken::from_snapshot(decoded).unwrap();
        assert_eq!(restored.balance_of(&USER), 42);
        assert_eq!(restored.allowance(&USER, &OWNER), 5);
        assert_eq!(restored.limiter().last_mint_limit(), 58);
        assert_eq!(UnderlyingAsset::asset_id(&restored), UnderlyingAsset::asset_id(&token));
    }

    #[test]
    fn test_restore_rejects_zero_epoch_length() {
        let token = create_test_token();
        token.mint(&at(MINTER, 10), &USER, 5).unwrap();

        let mut bytes = Vec::new();
        ciborium::into_writer(&token.snapshot(), &mut bytes).unwrap();
        let mut value: ciborium::Value = ciborium::from_reader(bytes.as_slice()).unwrap();
        set_cbor_field(&mut value, &["limiter", "epoch_length"], 0);
        let tampered: TokenSnapshot = value.deserialized().unwrap();
        assert_eq!(tampered.limiter.epoch_length(), 0);

        assert!(matches!(
            PegToken::from_snapshot(tampered),
            Err(XPegError::InvalidArgument { param: "epoch_length", .. })
        ));
    }

    #[test]
    fn test_restore_rejects_zero_ceiling_and_null_owner() {
        let token = create_test_token();

        let mut value = ciborium::Value::serialized(&token.snapshot()).unwrap();
        set_cbor_field(&mut value, &["limiter", "max_mint_limit"], 0);
        let tampered: TokenSnapshot = value.deserialized().unwrap();
        assert!(matches!(
            PegToken::from_snapshot(tampered),
            Err(XPegError::InvalidArgument { param: "max_mint_limit", .. })
        ));

        let mut snapshot = token.snapshot();
        snapshot.ownership = ciborium::Value::serialized(&snapshot.ownership)
            .and_then(|mut v| {
                set_cbor_bytes(&mut v, &["owner"], &ZERO_ADDRESS);
                v.deserialized()
            })
            .unwrap();
        assert!(matches!(
            PegToken::from_snapshot(snapshot),
            Err(XPegError::InvalidAddress { .. })
        ));
    }

    /// Walk CBOR maps by key and overwrite an integer leaf
    fn set_cbor_field(value: &mut ciborium::Value, path: &[&str], new: u64) {
        *cbor_field(value, path) = ciborium::Value::Integer(new.into());
    }

    /// Walk CBOR maps by key and overwrite a 32-byte array leaf
    fn set_cbor_bytes(value: &mut ciborium::Value, path: &[&str], new: &Address) {
        *cbor_field(value, path) = ciborium::Value::Array(
            new.iter().map(|b| ciborium::Value::Integer((*b).into())).collect(),
        );
    }

    fn cbor_field<'a>(value: &'a mut ciborium::Value, path: &[&str]) -> &'a mut ciborium::Value {
        let mut node = value;
        for key in path {
            let entries = node.as_map_mut().unwrap();
            let (_, child) = entries
                .iter_mut()
                .find(|(k, _)| k.as_text() == Some(*key))
                .unwrap();
            node = child;
        }
        node
    }

    #[test]
    fn test_concurrent_mints_stay_within_budget() {
        use std::sync::Arc;
        use std::thread;

        let token = Arc::new(create_test_token());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let token = Arc::clone(&token);
                thread::spawn(move || token.mint(&at(MINTER, 50), &USER, 15).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        // 6 * 15 = 90 fits in the budget of 100, a seventh would not
        assert_eq!(successes, 6);
        assert_eq!(token.total_supply(), 90);
        assert_eq!(token.limiter().last_mint_limit(), 10);
    }
}
