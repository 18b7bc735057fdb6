//! Instant Liquidity Pool
//!
//! Depositors supply the pegged asset and receive pool shares at the
//! current `total_added_underlying / share_supply` rate; shares redeem for a
//! proportional slice of the attributed underlying. A single router account
//! may draw the actual custody down as instant loans.
//!
//! ## Attributed vs. Actual Underlying
//!
//! `total_added_underlying` is bookkeeping. Loans move custody without
//! touching it, so custody can fall below the attributed total until the
//! loan is settled elsewhere. `total_unpaid_loan` reports that gap and
//! `audit_reserve` raises a `ReserveShortfall` event for it.
//!
//! ## Execution Order
//!
//! Every liquidity and loan operation holds the pool's `CallLock` for its
//! whole body and runs in three steps:
//!
//! 1. Read the inputs and compute the result under the state mutex
//! 2. Release the mutex and perform the single external asset transfer
//! 3. Re-take the mutex and commit the precomputed deltas
//!
//! A transfer hook that calls back into a guarded operation gets
//! `ReentrancyRejected`; a hook that only reads pool state proceeds.

use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use xpeg_common::{
    access_control::Ownership,
    asset::UnderlyingAsset,
    balances::{BalanceLedger, LedgerKind},
    constants::{domains, fees, shares},
    errors::{XPegError, XPegResult},
    events::{EventLog, XPegEvent},
    guard::CallLock,
    math::{calculate_bps_fee, checked_add, derive_address, mul_div_floor},
    types::{Address, AssetId, CallContext, PoolAction},
    validation::{
        require_caller, require_fee_bps, require_positive, require_sufficient_balance,
        require_valid_address,
    },
};

// ============ Pool Config ============

/// Instantiation parameters for a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PoolConfig {
    /// Administrative owner
    pub owner: Address,
    /// Sole account allowed to draw loans
    pub instant_router: Address,
    /// Loan fee in basis points
    pub instant_fee_bps: u64,
}

impl PoolConfig {
    /// Config with the default loan fee
    pub fn new(owner: Address, instant_router: Address) -> Self {
        Self {
            owner,
            instant_router,
            instant_fee_bps: fees::DEFAULT_INSTANT_FEE_BPS,
        }
    }

    pub fn with_fee_bps(mut self, instant_fee_bps: u64) -> Self {
        self.instant_fee_bps = instant_fee_bps;
        self
    }

    pub fn validate(&self) -> XPegResult<()> {
        require_valid_address(&self.owner, "owner is the null identity")?;
        require_valid_address(&self.instant_router, "router is the null identity")?;
        require_fee_bps(self.instant_fee_bps)?;
        Ok(())
    }
}

// ============ Results ============

/// Record of a disbursed loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LoanReceipt {
    pub borrower: Address,
    /// Principal sent to the borrower
    pub amount: u64,
    /// Origination fee owed on settlement
    pub fee: u64,
}

/// Reconciliation of attributed underlying against custody
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveAudit {
    /// `total_added_underlying`
    pub attributed: u64,
    /// Underlying actually held at the pool address
    pub available: u64,
    /// `max(attributed - available, 0)`
    pub unpaid_loan: u64,
    /// `max(available - attributed, 0)`
    pub surplus: u64,
}

impl ReserveAudit {
    pub fn is_short(&self) -> bool {
        self.unpaid_loan > 0
    }
}

// ============ Persisted State ============

/// Durable layout of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PoolSnapshot {
    pub address: Address,
    pub ownership: Ownership,
    pub reserve_asset: AssetId,
    pub instant_router: Address,
    pub instant_fee_bps: u64,
    pub total_added_underlying: u64,
    pub shares: BalanceLedger,
}

struct PoolState {
    ownership: Ownership,
    reserve: Arc<dyn UnderlyingAsset>,
    instant_router: Address,
    instant_fee_bps: u64,
    total_added_underlying: u64,
    shares: BalanceLedger,
    events: EventLog,
}

/// Inputs captured at the start of a guarded operation
struct Prepared {
    reserve: Arc<dyn UnderlyingAsset>,
    total_added_underlying: u64,
}

// ============ Pool ============

pub struct InstantPool {
    address: Address,
    lock: CallLock,
    state: Mutex<PoolState>,
}

impl InstantPool {
    /// Instantiate an empty pool over `reserve`
    pub fn new(config: PoolConfig, reserve: Arc<dyn UnderlyingAsset>) -> XPegResult<Self> {
        config.validate()?;

        let address = derive_address(domains::POOL_CUSTODY, &config.owner, 0);

        Ok(Self {
            address,
            lock: CallLock::new(),
            state: Mutex::new(PoolState {
                ownership: Ownership::new(config.owner)?,
                reserve,
                instant_router: config.instant_router,
                instant_fee_bps: config.instant_fee_bps,
                total_added_underlying: 0,
                shares: BalanceLedger::new(LedgerKind::Shares),
                events: EventLog::new(),
            }),
        })
    }

    /// Restore a pool from a persisted snapshot; `reserve` must match it
    pub fn from_snapshot(snapshot: PoolSnapshot, reserve: Arc<dyn UnderlyingAsset>) -> XPegResult<Self> {
        if reserve.asset_id() != snapshot.reserve_asset {
            return Err(XPegError::InvalidArgument {
                param: "reserve",
                reason: "asset does not match snapshot",
            });
        }
        PoolConfig {
            owner: snapshot.ownership.owner(),
            instant_router: snapshot.instant_router,
            instant_fee_bps: snapshot.instant_fee_bps,
        }
        .validate()?;
        require_valid_address(&snapshot.address, "pool address is the null identity")?;
        snapshot.shares.verify_supply()?;

        Ok(Self {
            address: snapshot.address,
            lock: CallLock::new(),
            state: Mutex::new(PoolState {
                ownership: snapshot.ownership,
                reserve,
                instant_router: snapshot.instant_router,
                instant_fee_bps: snapshot.instant_fee_bps,
                total_added_underlying: snapshot.total_added_underlying,
                shares: snapshot.shares,
                events: EventLog::new(),
            }),
        })
    }

    pub fn share_name() -> &'static str {
        shares::NAME
    }

    pub fn share_symbol() -> &'static str {
        shares::SYMBOL
    }

    pub fn share_decimals() -> u8 {
        shares::DECIMALS
    }

    /// Context the pool acts under when moving its own custody
    fn pool_ctx(&self, block_height: u64) -> CallContext {
        CallContext::new(self.address, block_height)
    }

    // ============ Liquidity ============

    /// Pull `amount` of underlying from the caller and mint shares to
    /// `depositor`; returns the shares minted.
    ///
    /// Shares are `floor(amount * share_supply / total_added_underlying)`,
    /// or 1:1 while either side is zero. A deposit whose floor comes out at
    /// zero shares is refused with `InvalidArgument` and nothing is pulled,
    /// rather than accepting the funds without minting anything.
    pub fn add_liquidity(&self, ctx: &CallContext, depositor: &Address, amount: u64) -> XPegResult<u64> {
        let _guard = self.lock.enter()?;

        require_positive(amount)?;
        require_valid_address(depositor, "depositor is the null identity")?;

        let (prepared, minted, new_total) = {
            let state = self.state.lock();
            let supply = state.shares.total_supply();

            let minted = if state.total_added_underlying == 0 || supply == 0 {
                amount
            } else {
                mul_div_floor(amount, supply, state.total_added_underlying)?
            };
            if minted == 0 {
                return Err(XPegError::InvalidArgument {
                    param: "amount",
                    reason: "deposit too small to mint a share",
                });
            }

            state.shares.ensure_can_credit(depositor, minted)?;
            let new_total = checked_add(state.total_added_underlying, amount)?;
            (prepare(&state), minted, new_total)
        };

        prepared
            .reserve
            .transfer_from(&self.pool_ctx(ctx.block_height), &ctx.sender, &self.address, amount)?;

        let mut state = self.state.lock();
        state.shares.credit(depositor, minted)?;
        state.total_added_underlying = new_total;
        state.events.emit(XPegEvent::LiquidityAdded {
            payer: ctx.sender,
            depositor: *depositor,
            amount,
            shares_minted: minted,
            total_added_underlying: new_total,
            block_height: ctx.block_height,
        });

        Ok(minted)
    }

    /// Pull `amount` from the caller into custody without minting shares.
    ///
    /// Donated underlying raises the value of every existing share and is
    /// not reclaimable by the donor.
    pub fn add_liquidity_without_mint(&self, ctx: &CallContext, amount: u64) -> XPegResult<()> {
        let _guard = self.lock.enter()?;

        require_positive(amount)?;

        let (prepared, new_total) = {
            let state = self.state.lock();
            let new_total = checked_add(state.total_added_underlying, amount)?;
            (prepare(&state), new_total)
        };

        prepared
            .reserve
            .transfer_from(&self.pool_ctx(ctx.block_height), &ctx.sender, &self.address, amount)?;

        let mut state = self.state.lock();
        state.total_added_underlying = new_total;
        state.events.emit(XPegEvent::LiquidityDonated {
            donor: ctx.sender,
            amount,
            total_added_underlying: new_total,
            block_height: ctx.block_height,
        });

        Ok(())
    }

    /// Burn `share_amount` of the caller's shares and pay the proportional
    /// underlying to `redeemer`; returns the underlying paid.
    pub fn remove_liquidity(&self, ctx: &CallContext, redeemer: &Address, share_amount: u64) -> XPegResult<u64> {
        let _guard = self.lock.enter()?;

        require_positive(share_amount)?;
        require_valid_address(redeemer, "redeemer is the null identity")?;

        let (prepared, underlying_out) = {
            let state = self.state.lock();
            let supply = state.shares.total_supply();
            if supply == 0 {
                return Err(XPegError::PoolEmpty);
            }
            state.shares.ensure_can_debit(&ctx.sender, share_amount)?;

            let underlying_out = mul_div_floor(share_amount, state.total_added_underlying, supply)?;
            (prepare(&state), underlying_out)
        };
        // share_amount <= supply, so underlying_out <= total_added_underlying
        let new_total = prepared.total_added_underlying - underlying_out;

        if underlying_out > 0 {
            prepared
                .reserve
                .transfer(&self.pool_ctx(ctx.block_height), redeemer, underlying_out)?;
        }

        let mut state = self.state.lock();
        state.shares.debit(&ctx.sender, share_amount)?;
        state.total_added_underlying = new_total;
        state.events.emit(XPegEvent::LiquidityRemoved {
            owner: ctx.sender,
            redeemer: *redeemer,
            shares_burned: share_amount,
            underlying_out,
            total_added_underlying: new_total,
            block_height: ctx.block_height,
        });

        Ok(underlying_out)
    }

    // ============ Loans ============

    /// Send `amount` of custody to `borrower` (router only).
    ///
    /// `total_added_underlying` is left as is; the principal shows up in
    /// `total_unpaid_loan` until it is settled.
    pub fn get_loan(&self, ctx: &CallContext, borrower: &Address, amount: u64) -> XPegResult<LoanReceipt> {
        let _guard = self.lock.enter()?;

        let (reserve, fee) = {
            let state = self.state.lock();
            require_caller(&state.instant_router, &ctx.sender)?;
            require_positive(amount)?;
            require_valid_address(borrower, "borrower is the null identity")?;
            let fee = calculate_bps_fee(amount, state.instant_fee_bps)?;
            (Arc::clone(&state.reserve), fee)
        };

        require_sufficient_balance(reserve.balance_of(&self.address), amount)?;

        reserve.transfer(&self.pool_ctx(ctx.block_height), borrower, amount)?;

        self.state.lock().events.emit(XPegEvent::InstantLoan {
            borrower: *borrower,
            amount,
            fee,
            block_height: ctx.block_height,
        });

        Ok(LoanReceipt {
            borrower: *borrower,
            amount,
            fee,
        })
    }

    /// Fee a loan of `amount` would carry at the current rate
    pub fn instant_fee(&self, amount: u64) -> XPegResult<u64> {
        let fee_bps = self.state.lock().instant_fee_bps;
        calculate_bps_fee(amount, fee_bps)
    }

    // ============ Administration ============

    pub fn set_instant_router(&self, ctx: &CallContext, router: &Address) -> XPegResult<()> {
        let mut state = self.state.lock();
        state.ownership.only_owner(&ctx.sender)?;
        require_valid_address(router, "router is the null identity")?;

        let old_router = state.instant_router;
        state.instant_router = *router;
        state.events.emit(XPegEvent::InstantRouterChanged {
            old_router,
            new_router: *router,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    /// Replace the loan fee; `fee_bps` must be within `[0, 10_000]`
    pub fn set_instant_percentage_fee(&self, ctx: &CallContext, fee_bps: u64) -> XPegResult<()> {
        let mut state = self.state.lock();
        state.ownership.only_owner(&ctx.sender)?;
        require_fee_bps(fee_bps)?;

        let old_fee_bps = state.instant_fee_bps;
        state.instant_fee_bps = fee_bps;
        state.events.emit(XPegEvent::InstantFeeChanged {
            old_fee_bps,
            new_fee_bps: fee_bps,
            block_height: ctx.block_height,
        });
        Ok(())
    }

    /// Point the pool at a different underlying asset (owner only).
    ///
    /// Bookkeeping is kept as is; the owner is responsible for migrating
    /// custody to the new asset.
    pub fn set_reserve_asset(&self, ctx: &CallContext, reserve: Arc<dyn UnderlyingAsset>) -> XPegResult<()> {
        let mut state = self.state.lock();
        state.ownership.only_owner(&ctx.sender)?;

        let old_asset = state.reserve.asset_id();
        let new_asset = reserve.asset_id();
        state.reserve = reserve;
        state.events.emit(XPegEvent::ReserveAssetChanged {
            old_asset,
            new_asset,
            block_height: ctx.block_height,
        });
        Ok(())
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

    // ============ Reads ============

    /// Custody address the pool holds underlying at
    pub fn pool_address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.state.lock().ownership.owner()
    }

    pub fn reserve_asset(&self) -> AssetId {
        self.state.lock().reserve.asset_id()
    }

    pub fn instant_router(&self) -> Address {
        self.state.lock().instant_router
    }

    pub fn instant_fee_bps(&self) -> u64 {
        self.state.lock().instant_fee_bps
    }

    pub fn total_added_underlying(&self) -> u64 {
        self.state.lock().total_added_underlying
    }

    pub fn share_balance_of(&self, account: &Address) -> u64 {
        self.state.lock().shares.balance_of(account)
    }

    pub fn share_total_supply(&self) -> u64 {
        self.state.lock().shares.total_supply()
    }

    /// Underlying actually held at the pool address
    pub fn available_underlying(&self) -> u64 {
        let reserve = Arc::clone(&self.state.lock().reserve);
        reserve.balance_of(&self.address)
    }

    /// `max(total_added_underlying - available_underlying, 0)`
    pub fn total_unpaid_loan(&self) -> u64 {
        let (reserve, attributed) = {
            let state = self.state.lock();
            (Arc::clone(&state.reserve), state.total_added_underlying)
        };
        attributed.saturating_sub(reserve.balance_of(&self.address))
    }

    /// Compare attributed underlying with custody, emitting
    /// `ReserveShortfall` when custody is short
    pub fn audit_reserve(&self, block_height: u64) -> ReserveAudit {
        let (reserve, attributed) = {
            let state = self.state.lock();
            (Arc::clone(&state.reserve), state.total_added_underlying)
        };
        let available = reserve.balance_of(&self.address);

        let audit = ReserveAudit {
            attributed,
            available,
            unpaid_loan: attributed.saturating_sub(available),
            surplus: available.saturating_sub(attributed),
        };

        if audit.is_short() {
            self.state.lock().events.emit(XPegEvent::ReserveShortfall {
                attributed,
                available,
                shortfall: audit.unpaid_loan,
                block_height,
            });
        }

        audit
    }

    // ============ Events & State ============

    pub fn events(&self) -> Vec<XPegEvent> {
        self.state.lock().events.events().to_vec()
    }

    pub fn drain_events(&self) -> Vec<XPegEvent> {
        self.state.lock().events.drain()
    }

    /// Check that share balances sum to the share supply
    pub fn verify_supply(&self) -> XPegResult<()> {
        self.state.lock().shares.verify_supply()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock();
        PoolSnapshot {
            address: self.address,
            ownership: state.ownership.clone(),
            reserve_asset: state.reserve.asset_id(),
            instant_router: state.instant_router,
            instant_fee_bps: state.instant_fee_bps,
            total_added_underlying: state.total_added_underlying,
            shares: state.shares.clone(),
        }
    }

    // ============ Dispatch ============

    /// Run a decoded action on behalf of `ctx.sender`
    pub fn execute(&self, ctx: &CallContext, action: &PoolAction) -> XPegResult<()> {
        match action {
            PoolAction::AddLiquidity { depositor, amount } => {
                self.add_liquidity(ctx, depositor, *amount).map(|_| ())
            }
            PoolAction::AddLiquidityWithoutMint { amount } => self.add_liquidity_without_mint(ctx, *amount),
            PoolAction::RemoveLiquidity { redeemer, share_amount } => {
                self.remove_liquidity(ctx, redeemer, *share_amount).map(|_| ())
            }
            PoolAction::GetLoan { borrower, amount } => self.get_loan(ctx, borrower, *amount).map(|_| ()),
            PoolAction::SetInstantRouter { router } => self.set_instant_router(ctx, router),
            PoolAction::SetInstantPercentageFee { fee_bps } => self.set_instant_percentage_fee(ctx, *fee_bps),
            PoolAction::TransferOwnership { new_owner } => self.transfer_ownership(ctx, new_owner),
        }
    }
}

fn prepare(state: &PoolState) -> Prepared {
    Prepared {
        reserve: Arc::clone(&state.reserve),
        total_added_underlying: state.total_added_underlying,
    }
}

// ============ Tests ============
