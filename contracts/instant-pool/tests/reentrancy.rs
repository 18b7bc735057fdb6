//! A reserve asset whose transfer hook calls back into the pool

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::Mutex;

use xpeg_common::{Address, AssetId, CallContext, PoolAction, UnderlyingAsset, XPegError, XPegResult};
use xpeg_instant_pool::{InstantPool, PoolConfig};

const OWNER: Address = [1u8; 32];
const ROUTER: Address = [2u8; 32];
const ALICE: Address = [3u8; 32];
const MALLORY: Address = [4u8; 32];

/// Balance map that fires a pool action from inside every transfer
#[derive(Default)]
struct HookedAsset {
    balances: Mutex<BTreeMap<Address, u64>>,
    pool: Mutex<Option<Weak<InstantPool>>>,
    hook: Mutex<Option<PoolAction>>,
    /// Outcome of each nested call plus the attributed total the hook saw
    observed: Mutex<Vec<(XPegResult<()>, u64)>>,
}

impl HookedAsset {
    fn fund(&self, account: Address, amount: u64) {
        *self.balances.lock().entry(account).or_insert(0) += amount;
    }

    fn arm(&self, action: PoolAction) {
        *self.hook.lock() = Some(action);
    }

    fn fire_hook(&self, block_height: u64) {
        let Some(action) = self.hook.lock().clone() else {
            return;
        };
        let Some(pool) = self.pool.lock().as_ref().and_then(Weak::upgrade) else {
            return;
        };

        let result = pool.execute(&CallContext::new(MALLORY, block_height), &action);
        // Reads stay available while a guarded call is in flight
        let seen_total = pool.total_added_underlying();
        self.observed.lock().push((result, seen_total));
    }

    fn move_funds(&self, from: &Address, to: &Address, amount: u64) -> XPegResult<()> {
        let mut balances = self.balances.lock();
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(XPegError::InsufficientBalance { available, requested: amount });
        }
        balances.insert(*from, available - amount);
        *balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }
}

impl UnderlyingAsset for HookedAsset {
    fn asset_id(&self) -> AssetId {
        [0xCC; 32]
    }

    fn balance_of(&self, account: &Address) -> u64 {
        self.balances.lock().get(account).copied().unwrap_or(0)
    }

    fn transfer(&self, ctx: &CallContext, to: &Address, amount: u64) -> XPegResult<()> {
        self.move_funds(&ctx.sender, to, amount)?;
        self.fire_hook(ctx.block_height);
        Ok(())
    }

    fn transfer_from(&self, ctx: &CallContext, owner: &Address, recipient: &Address, amount: u64) -> XPegResult<()> {
        self.move_funds(owner, recipient, amount)?;
        self.fire_hook(ctx.block_height);
        Ok(())
    }
}

fn setup() -> (Arc<InstantPool>, Arc<HookedAsset>) {
    let asset = Arc::new(HookedAsset::default());
    asset.fund(ALICE, 10_000);
    asset.fund(MALLORY, 10_000);

    let pool = Arc::new(InstantPool::new(PoolConfig::new(OWNER, ROUTER), asset.clone()).unwrap());
    *asset.pool.lock() = Some(Arc::downgrade(&pool));

    // Seed before arming so the setup deposit runs clean
    pool.add_liquidity(&CallContext::new(ALICE, 1), &ALICE, 1_000).unwrap();
    pool.add_liquidity(&CallContext::new(MALLORY, 1), &MALLORY, 500).unwrap();
    (pool, asset)
}

fn assert_rejected_once(asset: &HookedAsset, expected_total: u64) {
    let observed = asset.observed.lock();
    assert_eq!(observed.len(), 1);
    assert!(matches!(observed[0].0, Err(XPegError::ReentrancyRejected)));
    assert_eq!(observed[0].1, expected_total);
}

#[test]
fn test_reenter_add_liquidity_from_deposit() {
    let (pool, asset) = setup();
    asset.arm(PoolAction::AddLiquidity { depositor: MALLORY, amount: 100 });

    let minted = pool.add_liquidity(&CallContext::new(ALICE, 2), &ALICE, 300).unwrap();

    assert_eq!(minted, 300);
    // Hook ran before the outer deposit committed
    assert_rejected_once(&asset, 1_500);
    assert_eq!(pool.total_added_underlying(), 1_800);
    assert_eq!(pool.share_balance_of(&MALLORY), 500);
}

#[test]
fn test_reenter_remove_liquidity_from_withdrawal() {
    let (pool, asset) = setup();
    asset.arm(PoolAction::RemoveLiquidity { redeemer: MALLORY, share_amount: 500 });

    let out = pool.remove_liquidity(&CallContext::new(MALLORY, 2), &MALLORY, 500).unwrap();

    assert_eq!(out, 500);
    assert_rejected_once(&asset, 1_500);
    assert_eq!(pool.share_balance_of(&MALLORY), 0);
    assert_eq!(pool.available_underlying(), 1_000);
    assert!(pool.verify_supply().is_ok());
}

#[test]
fn test_reenter_donation_from_deposit() {
    let (pool, asset) = setup();
    asset.arm(PoolAction::AddLiquidityWithoutMint { amount: 50 });

    pool.add_liquidity_without_mint(&CallContext::new(ALICE, 2), 10).unwrap();

    assert_rejected_once(&asset, 1_500);
    assert_eq!(pool.total_added_underlying(), 1_510);
}

#[test]
fn test_reenter_loan_from_loan() {
    let (pool, asset) = setup();
    asset.arm(PoolAction::GetLoan { borrower: MALLORY, amount: 200 });

    let receipt = pool.get_loan(&CallContext::new(ROUTER, 2), &MALLORY, 200).unwrap();

    assert_eq!(receipt.amount, 200);
    assert_rejected_once(&asset, 1_500);
    assert_eq!(pool.available_underlying(), 1_300);
}

#[test]
fn test_unguarded_admin_call_from_hook_is_checked_normally() {
    let (pool, asset) = setup();
    asset.arm(PoolAction::SetInstantPercentageFee { fee_bps: 0 });

    pool.add_liquidity(&CallContext::new(ALICE, 2), &ALICE, 10).unwrap();

    let observed = asset.observed.lock();
    assert!(matches!(observed[0].0, Err(XPegError::Unauthorized { .. })));
}

#[test]
fn test_concurrent_depositors_are_serialized() {
    let (pool, asset) = setup();
    let depositors: Vec<Address> = (10u8..18).map(|i| [i; 32]).collect();
    for depositor in &depositors {
        asset.fund(*depositor, 1_000);
    }

    let handles: Vec<_> = depositors
        .iter()
        .map(|depositor| {
            let pool = Arc::clone(&pool);
            let depositor = *depositor;
            thread::spawn(move || {
                for block in 0..10 {
                    pool.add_liquidity(&CallContext::new(depositor, block), &depositor, 10).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Concurrent callers wait their turn instead of being rejected
    assert_eq!(pool.total_added_underlying(), 1_500 + 8 * 100);
    assert_eq!(pool.share_total_supply(), 1_500 + 8 * 100);
    assert_eq!(pool.available_underlying(), 2_300);
    assert!(asset.observed.lock().is_empty());
}
