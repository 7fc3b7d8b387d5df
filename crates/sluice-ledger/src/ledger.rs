//! Thread-safe ledger facade.
//!
//! Wraps [`LedgerState`] in a single `parking_lot::Mutex`. Each operation:
//! locks, reads the height once from the injected [`HeightSource`], runs
//! on a working copy of the state and swaps the copy in only on success.
//! A failed operation therefore leaves no trace, however far it got.

use parking_lot::Mutex;
use sluice_core::error::{AuthorizationError, LedgerError, NotFoundError};
use sluice_core::fees::{DepositFee, FeeTier};
use sluice_core::traits::{HeightSource, StakeView, TokenView};
use sluice_core::types::{AccountId, Amount, AssetId, Height, PoolId};
use tracing::{debug, info};

use crate::auth::{AdminCap, OwnerCap};
use crate::config::LedgerConfig;
use crate::payout::{Fund, PayoutSplit};
use crate::pool::Pool;
use crate::referral::ReferralTotals;
use crate::stake::{DepositReceipt, RewardPayout, StakePosition, WithdrawReceipt};
use crate::state::{LedgerSnapshot, LedgerState};

pub struct Ledger<H> {
    state: Mutex<LedgerState>,
    height: H,
}

impl<H: HeightSource> Ledger<H> {
    pub fn new(config: &LedgerConfig, height: H) -> Result<Self, LedgerError> {
        let state = LedgerState::from_config(config)?;
        info!(
            owner = %config.owner,
            pools = config.pools.len(),
            start_height = config.start_height,
            "ledger: initialized"
        );
        Ok(Self { state: Mutex::new(state), height })
    }

    pub fn height_source(&self) -> &H {
        &self.height
    }

    /// Run `op` atomically at the current height.
    fn apply<T>(
        &self,
        name: &'static str,
        op: impl FnOnce(&mut LedgerState, Height) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut guard = self.state.lock();
        let height = self.height.current_height();
        let mut working = guard.clone();
        match op(&mut working, height) {
            Ok(value) => {
                *guard = working;
                Ok(value)
            }
            Err(e) => {
                debug!(op = name, height, "ledger: rejected: {e}");
                Err(e)
            }
        }
    }

    fn read<T>(&self, f: impl FnOnce(&LedgerState, Height) -> T) -> T {
        let guard = self.state.lock();
        f(&guard, self.height.current_height())
    }

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    pub fn admin_cap(&self, caller: AccountId) -> Result<AdminCap, AuthorizationError> {
        self.read(|s, _| s.roles().issue_admin(caller))
    }

    pub fn owner_cap(&self, caller: AccountId) -> Result<OwnerCap, AuthorizationError> {
        self.read(|s, _| s.roles().issue_owner(caller))
    }

    pub fn owner(&self) -> AccountId {
        self.read(|s, _| s.roles().owner())
    }

    pub fn is_authorized(&self, account: &AccountId) -> bool {
        self.read(|s, _| s.roles().is_authorized(account))
    }

    pub fn add_authorized(&self, cap: &OwnerCap, account: AccountId) -> Result<(), LedgerError> {
        self.apply("add_authorized", |s, _| s.add_authorized(cap, account))?;
        info!(%account, "ledger: operator authorized");
        Ok(())
    }

    pub fn remove_authorized(&self, cap: &OwnerCap, account: AccountId) -> Result<(), LedgerError> {
        self.apply("remove_authorized", |s, _| s.remove_authorized(cap, account))?;
        info!(%account, "ledger: operator removed");
        Ok(())
    }

    pub fn transfer_ownership(&self, cap: &OwnerCap, new_owner: AccountId) -> Result<(), LedgerError> {
        self.apply("transfer_ownership", |s, _| s.transfer_ownership(cap, new_owner))?;
        info!(%new_owner, "ledger: ownership transferred");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stake operations
    // ------------------------------------------------------------------

    pub fn deposit(
        &self,
        pool: PoolId,
        account: AccountId,
        amount: Amount,
        referrer: Option<AccountId>,
    ) -> Result<DepositReceipt, LedgerError> {
        let receipt = self.apply("deposit", |s, h| s.deposit(pool, account, amount, referrer, h))?;
        info!(%pool, %account, amount, net = receipt.net_staked, reward = receipt.reward.paid, "ledger: deposit applied");
        Ok(receipt)
    }

    pub fn withdraw(
        &self,
        pool: PoolId,
        account: AccountId,
        amount: Amount,
        referrer: Option<AccountId>,
    ) -> Result<WithdrawReceipt, LedgerError> {
        let receipt = self.apply("withdraw", |s, h| s.withdraw(pool, account, amount, referrer, h))?;
        info!(
            %pool, %account, amount,
            returned = receipt.returned,
            fee = receipt.fee_redistributed + receipt.fee_retained,
            elapsed = receipt.elapsed,
            "ledger: withdrawal applied"
        );
        Ok(receipt)
    }

    pub fn emergency_withdraw(&self, pool: PoolId, account: AccountId) -> Result<WithdrawReceipt, LedgerError> {
        let receipt = self.apply("emergency_withdraw", |s, h| s.emergency_withdraw(pool, account, h))?;
        info!(%pool, %account, returned = receipt.returned, "ledger: emergency withdrawal applied");
        Ok(receipt)
    }

    pub fn claim_reward(&self, pool: PoolId, account: AccountId) -> Result<RewardPayout, LedgerError> {
        let payout = self.apply("claim_reward", |s, h| s.claim_reward(pool, account, h))?;
        info!(%pool, %account, paid = payout.paid, locked = payout.locked, "ledger: reward claimed");
        Ok(payout)
    }

    pub fn claim_rewards(&self, pools: &[PoolId], account: AccountId) -> Result<Vec<(PoolId, RewardPayout)>, LedgerError> {
        let payouts = self.apply("claim_rewards", |s, h| s.claim_rewards(pools, account, h))?;
        let paid: Amount = payouts.iter().map(|(_, p)| p.paid).sum();
        info!(%account, pools = pools.len(), paid, "ledger: rewards claimed");
        Ok(payouts)
    }

    /// Bring one pool's accrual up to the current height.
    pub fn accrue(&self, pool: PoolId) -> Result<(), LedgerError> {
        self.apply("accrue", |s, h| s.accrue(pool, h))
    }

    pub fn mass_update(&self) -> Result<(), LedgerError> {
        self.apply("mass_update", |s, h| s.mass_update(h))
    }

    // ------------------------------------------------------------------
    // Token operations
    // ------------------------------------------------------------------

    pub fn unlock(&self, account: AccountId) -> Result<Amount, LedgerError> {
        let amount = self.apply("unlock", |s, h| s.unlock(account, h))?;
        info!(%account, amount, "ledger: tokens unlocked");
        Ok(amount)
    }

    pub fn transfer(&self, from: AccountId, to: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.apply("transfer", |s, _| s.transfer(from, to, amount))?;
        debug!(%from, %to, amount, "ledger: transfer applied");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Privileged operations
    // ------------------------------------------------------------------

    pub fn add_pool(&self, cap: &AdminCap, asset: AssetId, weight: u64) -> Result<PoolId, LedgerError> {
        let id = self.apply("add_pool", |s, h| s.add_pool(cap, asset, weight, h))?;
        info!(pool = %id, %asset, weight, "ledger: pool added");
        Ok(id)
    }

    pub fn set_allocation_weight(&self, cap: &AdminCap, pool: PoolId, weight: u64) -> Result<(), LedgerError> {
        self.apply("set_allocation_weight", |s, h| s.set_allocation_weight(cap, pool, weight, h))?;
        info!(%pool, weight, "ledger: allocation weight set");
        Ok(())
    }

    pub fn replace_halving_thresholds(&self, cap: &AdminCap, thresholds: Vec<Height>) -> Result<(), LedgerError> {
        let stages = thresholds.len();
        self.apply("replace_halving_thresholds", |s, h| s.replace_halving_thresholds(cap, thresholds, h))?;
        info!(stages, "ledger: halving thresholds replaced");
        Ok(())
    }

    pub fn replace_multipliers(&self, cap: &AdminCap, multipliers: Vec<u64>) -> Result<(), LedgerError> {
        let stages = multipliers.len();
        self.apply("replace_multipliers", |s, h| s.replace_multipliers(cap, multipliers, h))?;
        info!(stages, "ledger: multipliers replaced");
        Ok(())
    }

    pub fn replace_fee_tiers(&self, cap: &AdminCap, tiers: Vec<FeeTier>) -> Result<(), LedgerError> {
        let count = tiers.len();
        self.apply("replace_fee_tiers", |s, _| s.replace_fee_tiers(cap, tiers))?;
        info!(tiers = count, "ledger: fee tiers replaced");
        Ok(())
    }

    pub fn set_deposit_fee(&self, cap: &AdminCap, fee: DepositFee) -> Result<(), LedgerError> {
        self.apply("set_deposit_fee", |s, _| s.set_deposit_fee(cap, fee))?;
        info!(bps = fee.account_fee_bps, "ledger: deposit fee set");
        Ok(())
    }

    pub fn set_fund_address(&self, cap: &AdminCap, fund: Fund, account: AccountId) -> Result<(), LedgerError> {
        self.apply("set_fund_address", |s, h| s.set_fund_address(cap, fund, account, h))?;
        info!(%fund, %account, "ledger: fund address set");
        Ok(())
    }

    pub fn set_payout_split(&self, cap: &AdminCap, split: PayoutSplit) -> Result<(), LedgerError> {
        self.apply("set_payout_split", |s, h| s.set_payout_split(cap, split, h))?;
        info!("ledger: payout split replaced");
        Ok(())
    }

    pub fn set_lock_window(&self, cap: &AdminCap, from: Height, to: Height) -> Result<(), LedgerError> {
        self.apply("set_lock_window", |s, _| s.set_lock_window(cap, from, to))?;
        info!(from, to, "ledger: lock window set");
        Ok(())
    }

    pub fn set_cap(&self, cap: &AdminCap, new_cap: Amount) -> Result<(), LedgerError> {
        self.apply("set_cap", |s, _| s.set_cap(cap, new_cap))?;
        info!(cap = new_cap, "ledger: supply cap set");
        Ok(())
    }

    pub fn mint(&self, cap: &AdminCap, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.apply("mint", |s, _| s.mint(cap, account, amount))?;
        info!(%account, amount, "ledger: minted");
        Ok(())
    }

    pub fn lock(&self, cap: &AdminCap, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.apply("lock", |s, _| s.lock(cap, account, amount))?;
        info!(%account, amount, "ledger: minted into lock");
        Ok(())
    }

    pub fn lock_balance(&self, cap: &AdminCap, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.apply("lock_balance", |s, _| s.lock_balance(cap, account, amount))?;
        info!(%account, amount, "ledger: balance locked");
        Ok(())
    }

    pub fn manual_mint(&self, cap: &AdminCap, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.apply("manual_mint", |s, _| s.manual_mint(cap, account, amount))?;
        info!(%account, amount, "ledger: manual mint applied");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn current_height(&self) -> Height {
        self.height.current_height()
    }

    pub fn pool(&self, pool: PoolId) -> Result<Pool, NotFoundError> {
        self.read(|s, _| s.pools().get(pool).cloned())
    }

    pub fn pool_for_asset(&self, asset: &AssetId) -> Option<PoolId> {
        self.read(|s, _| s.pools().pool_for_asset(asset))
    }

    pub fn total_allocation_weight(&self) -> u64 {
        self.read(|s, _| s.pools().total_weight())
    }

    pub fn position(&self, pool: PoolId, account: &AccountId) -> Option<StakePosition> {
        self.read(|s, _| s.position(pool, account).cloned())
    }

    pub fn pending_reward(&self, pool: PoolId, account: &AccountId) -> Result<Amount, LedgerError> {
        self.read(|s, h| s.pending_reward(pool, account, h))
    }

    pub fn total_reward(&self, from: Height, to: Height) -> Result<Amount, LedgerError> {
        self.read(|s, _| s.schedule().total_reward(from, to).map_err(LedgerError::from))
    }

    pub fn multiplier(&self, from: Height, to: Height) -> u128 {
        self.read(|s, _| s.schedule().total_multiplier(from, to))
    }

    pub fn halving_threshold(&self, index: usize) -> Option<Height> {
        self.read(|s, _| s.schedule().threshold(index))
    }

    pub fn reward_multiplier(&self, index: usize) -> u64 {
        self.read(|s, _| s.schedule().multiplier(index))
    }

    pub fn final_reward_height(&self) -> Height {
        self.read(|s, _| s.schedule().final_reward_height())
    }

    pub fn fee_for(&self, elapsed: u64) -> Result<FeeTier, LedgerError> {
        self.read(|s, _| s.fee_tiers().fee_for(elapsed).map_err(LedgerError::from))
    }

    pub fn deposit_fee(&self) -> DepositFee {
        self.read(|s, _| s.deposit_fee())
    }

    pub fn payout_split(&self) -> PayoutSplit {
        self.read(|s, _| s.payout_split().clone())
    }

    pub fn can_unlock_amount(&self, account: &AccountId) -> Result<Amount, LedgerError> {
        self.read(|s, h| s.token().can_unlock_amount(account, h).map_err(LedgerError::from))
    }

    pub fn last_unlock_height(&self, account: &AccountId) -> Height {
        self.read(|s, _| s.token().last_unlock_height(account))
    }

    pub fn cap(&self) -> Amount {
        self.read(|s, _| s.token().cap())
    }

    pub fn manual_minted(&self) -> Amount {
        self.read(|s, _| s.token().manual_minted())
    }

    pub fn manual_mint_limit(&self) -> Amount {
        self.read(|s, _| s.token().manual_mint_limit())
    }

    pub fn lock_window(&self) -> (Height, Height) {
        self.read(|s, _| s.token().lock_window())
    }

    pub fn attributed_value(&self, referrer: &AccountId, referred: &AccountId) -> Amount {
        self.read(|s, _| s.referrals().attributed_value(referrer, referred))
    }

    pub fn referral_totals(&self, referrer: &AccountId) -> ReferralTotals {
        self.read(|s, _| s.referrals().totals(referrer))
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.read(|s, h| s.snapshot(h))
    }

    /// Invariant violations found in the committed state; empty when healthy.
    pub fn audit(&self) -> Vec<String> {
        self.read(|s, _| s.audit())
    }
}

impl<H: HeightSource> TokenView for Ledger<H> {
    fn balance_of(&self, account: &AccountId) -> Amount {
        self.read(|s, _| s.balance_of(account))
    }

    fn lock_of(&self, account: &AccountId) -> Amount {
        self.read(|s, _| s.lock_of(account))
    }

    fn total_supply(&self) -> Amount {
        self.read(|s, _| s.total_supply())
    }

    fn total_lock(&self) -> Amount {
        self.read(|s, _| s.total_lock())
    }
}

impl<H: HeightSource> StakeView for Ledger<H> {
    fn pool_count(&self) -> usize {
        self.read(|s, _| s.pool_count())
    }

    fn staked_of(&self, pool: PoolId, account: &AccountId) -> Result<Amount, NotFoundError> {
        self.read(|s, _| s.staked_of(pool, account))
    }

    fn pool_staked_total(&self, pool: PoolId) -> Result<Amount, NotFoundError> {
        self.read(|s, _| s.pool_staked_total(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sluice_core::constants::ONE_TOKEN;
    use sluice_core::error::{InvariantError, ValidationError};
    use sluice_core::traits::ManualHeight;

    use crate::config::PoolConfig;

    const LP: AssetId = AssetId([0x11; 20]);

    fn acct(seed: u8) -> AccountId {
        AccountId::from_seed(seed)
    }

    fn ledger() -> Ledger<Arc<ManualHeight>> {
        let config = LedgerConfig {
            start_height: 100,
            halving_interval: 1_000,
            base_reward_per_block: ONE_TOKEN,
            lock_from_height: 250,
            lock_to_height: 500,
            pools: vec![PoolConfig { stake_asset: LP, allocation_weight: 1 }],
            ..LedgerConfig::default()
        };
        Ledger::new(&config, Arc::new(ManualHeight::new(90))).unwrap()
    }

    #[test]
    fn failed_operation_leaves_no_trace() {
        let ledger = ledger();
        ledger.deposit(PoolId(0), acct(2), 100 * ONE_TOKEN, None).unwrap();
        let cap = ledger.admin_cap(ledger.owner()).unwrap();
        ledger.set_cap(&cap, 300 * ONE_TOKEN).unwrap();
        ledger.height_source().advance_to(101);
        let before = ledger.snapshot();
        // accrual would mint 307.2 tokens against a 300 cap
        let err = ledger.claim_reward(PoolId(0), acct(2)).unwrap_err();
        assert!(matches!(err, LedgerError::Invariant(InvariantError::CapExceeded { .. })));
        assert_eq!(ledger.snapshot(), before);
        // emergency withdrawal skips settlement and still works
        assert!(ledger.emergency_withdraw(PoolId(0), acct(2)).is_ok());
    }

    #[test]
    fn height_is_injected() {
        let ledger = ledger();
        ledger.deposit(PoolId(0), acct(2), ONE_TOKEN, None).unwrap();
        assert_eq!(ledger.pending_reward(PoolId(0), &acct(2)).unwrap(), 0);
        ledger.height_source().advance_to(102);
        assert!(ledger.pending_reward(PoolId(0), &acct(2)).unwrap() > 0);
    }

    #[test]
    fn revoked_operator_loses_access() {
        let ledger = ledger();
        let owner = ledger.owner_cap(ledger.owner()).unwrap();
        ledger.add_authorized(&owner, acct(7)).unwrap();
        let cap = ledger.admin_cap(acct(7)).unwrap();
        ledger.set_allocation_weight(&cap, PoolId(0), 5).unwrap();
        ledger.remove_authorized(&owner, acct(7)).unwrap();
        let err = ledger.set_allocation_weight(&cap, PoolId(0), 6).unwrap_err();
        assert_eq!(err, AuthorizationError::NotAuthorized(acct(7)).into());
        assert_eq!(ledger.total_allocation_weight(), 5);
    }

    #[test]
    fn views_agree_with_state() {
        let ledger = ledger();
        let cap = ledger.admin_cap(ledger.owner()).unwrap();
        ledger.mint(&cap, acct(3), 10).unwrap();
        ledger.lock(&cap, acct(3), 5).unwrap();
        assert_eq!(ledger.total_balance_of(&acct(3)), 15);
        assert_eq!(ledger.unlocked_supply() + ledger.total_lock(), ledger.circulating_supply());
        assert_eq!(ledger.pool_count(), 1);
        assert_eq!(ledger.staked_of(PoolId(2), &acct(3)).unwrap_err(), NotFoundError::PoolNotFound(PoolId(2)));
    }

    #[test]
    fn zero_transfer_is_rejected() {
        let ledger = ledger();
        assert_eq!(
            ledger.transfer(acct(1), acct(2), 0).unwrap_err(),
            ValidationError::ZeroAmount.into()
        );
    }

    #[test]
    fn ledger_is_shareable_across_threads() {
        let ledger = Arc::new(ledger());
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.deposit(PoolId(0), acct(10 + i), ONE_TOKEN, None))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(ledger.pool(PoolId(0)).unwrap().staked_total, 4 * ONE_TOKEN);
        assert!(ledger.audit().is_empty());
    }
}
