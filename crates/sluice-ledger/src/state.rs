//! Ledger state and its state transitions.
//!
//! Every transition takes the height explicitly and either succeeds or
//! returns an error; callers that need all-or-nothing semantics run it on a
//! copy and keep the copy only on success (see [`Ledger`](crate::Ledger)).
//!
//! Reward flow for one settlement:
//! 1. accrue the pool: mint the pool's emission to the reward reserve, mint
//!    each fund's share on top (cap-checked as one amount), raise
//!    `acc_reward_per_share`;
//! 2. pay the position's pending reward out of the reserve;
//! 3. while emission is running, lock the farmer fraction of the payout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sluice_core::emission::HalvingSchedule;
use sluice_core::error::{InvariantError, LedgerError, NotFoundError, ValidationError};
use sluice_core::fees::{DepositFee, FeeTier, FeeTierTable};
use sluice_core::math::{checked_add, checked_sub};
use sluice_core::traits::{StakeView, TokenView};
use sluice_core::types::{AccountId, Amount, AssetId, Height, PoolId, amount_serde};
use tracing::debug;

use crate::auth::{AdminCap, OwnerCap, Roles};
use crate::config::LedgerConfig;
use crate::payout::{Fund, PayoutSplit};
use crate::pool::{Pool, PoolRegistry};
use crate::referral::{ReferralTotals, ReferralTracker};
use crate::stake::{DepositReceipt, RewardPayout, StakePosition, WithdrawReceipt};
use crate::vesting::VestingLedger;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerState {
    roles: Roles,
    schedule: HalvingSchedule,
    fee_tiers: FeeTierTable,
    deposit_fee: DepositFee,
    split: PayoutSplit,
    token: VestingLedger,
    pools: PoolRegistry,
    positions: BTreeMap<(PoolId, AccountId), StakePosition>,
    referrals: ReferralTracker,
}

impl LedgerState {
    pub fn from_config(config: &LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let mut roles = Roles::new(config.owner);
        let owner = roles.issue_owner(config.owner)?;
        for account in &config.authorized {
            roles.add_authorized(&owner, *account)?;
        }
        let mut state = Self {
            roles,
            schedule: config.schedule()?,
            fee_tiers: config.fee_table()?,
            deposit_fee: config.deposit_fee,
            split: config.payout.clone(),
            token: VestingLedger::new(
                config.cap,
                config.manual_mint_limit,
                config.lock_from_height,
                config.lock_to_height,
            )?,
            pools: PoolRegistry::default(),
            positions: BTreeMap::new(),
            referrals: ReferralTracker::default(),
        };
        for pool in &config.pools {
            state.pools.add(pool.stake_asset, pool.allocation_weight, config.start_height)?;
        }
        Ok(state)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn schedule(&self) -> &HalvingSchedule {
        &self.schedule
    }

    pub fn fee_tiers(&self) -> &FeeTierTable {
        &self.fee_tiers
    }

    pub fn deposit_fee(&self) -> DepositFee {
        self.deposit_fee
    }

    pub fn payout_split(&self) -> &PayoutSplit {
        &self.split
    }

    pub fn token(&self) -> &VestingLedger {
        &self.token
    }

    pub fn pools(&self) -> &PoolRegistry {
        &self.pools
    }

    pub fn referrals(&self) -> &ReferralTracker {
        &self.referrals
    }

    pub fn position(&self, pool: PoolId, account: &AccountId) -> Option<&StakePosition> {
        self.positions.get(&(pool, *account))
    }

    /// Reward `account` would receive from `pool` if it claimed at `height`.
    pub fn pending_reward(&self, pool: PoolId, account: &AccountId, height: Height) -> Result<Amount, LedgerError> {
        let acc = self.pools.get(pool)?.projected_acc(&self.schedule, self.pools.total_weight(), height)?;
        match self.positions.get(&(pool, *account)) {
            Some(position) => Ok(position.pending(acc)?),
            None => Ok(0),
        }
    }

    /// Payouts lock their vesting fraction only while emission is running.
    fn locking(&self, height: Height) -> bool {
        height <= self.schedule.final_reward_height()
    }

    // ------------------------------------------------------------------
    // Accrual and settlement
    // ------------------------------------------------------------------

    /// Bring `pool` up to `height`, minting its emission and the fund shares.
    pub fn accrue(&mut self, pool_id: PoolId, height: Height) -> Result<(), LedgerError> {
        let pool = self.pools.get(pool_id)?;
        if height <= pool.last_accrual_height {
            return Ok(());
        }
        let reward = pool.pending_emission(&self.schedule, self.pools.total_weight(), height)?;
        let increment = pool.acc_increment(reward)?;
        if reward > 0 {
            let mints = self.split.fund_mints(reward, self.locking(height))?;
            let total = mints.iter().try_fold(reward, |sum, m| checked_add(sum, m.amount))?;
            self.token.ensure_cap(total)?;
            self.token.mint(AccountId::REWARD_RESERVE, reward)?;
            for mint in mints.iter().filter(|m| m.amount > 0) {
                self.token.mint(mint.account, mint.amount)?;
                if mint.locked > 0 {
                    self.token.lock_balance(mint.account, mint.locked)?;
                }
            }
            debug!(pool = %pool_id, height, reward, funds = total - reward, "ledger: pool accrued");
        }
        let pool = self.pools.get_mut(pool_id)?;
        pool.acc_reward_per_share = checked_add(pool.acc_reward_per_share, increment)?;
        pool.last_accrual_height = height;
        Ok(())
    }

    /// Accrue every pool; run before any change to weights, tables or split.
    pub fn mass_update(&mut self, height: Height) -> Result<(), LedgerError> {
        for pool in self.pools.ids() {
            self.accrue(pool, height)?;
        }
        Ok(())
    }

    fn pay_reward(&mut self, account: AccountId, pending: Amount, height: Height) -> Result<RewardPayout, LedgerError> {
        if pending == 0 {
            return Ok(RewardPayout::default());
        }
        let paid = pending.min(self.token.balance_of(&AccountId::REWARD_RESERVE));
        if paid > 0 {
            self.token.transfer(AccountId::REWARD_RESERVE, account, paid)?;
        }
        let locked = self.split.farmer_locked(paid, self.locking(height))?;
        if locked > 0 {
            self.token.lock_balance(account, locked)?;
        }
        Ok(RewardPayout { pending, paid, locked })
    }

    /// Accrue the pool, pay out the position's pending reward and checkpoint it.
    fn settle(&mut self, pool_id: PoolId, account: AccountId, height: Height) -> Result<RewardPayout, LedgerError> {
        self.accrue(pool_id, height)?;
        let acc = self.pools.get(pool_id)?.acc_reward_per_share;
        let pending = match self.positions.get(&(pool_id, account)) {
            Some(position) => position.pending(acc)?,
            None => 0,
        };
        let payout = self.pay_reward(account, pending, height)?;
        if let Some(position) = self.positions.get_mut(&(pool_id, account)) {
            position.checkpoint(acc)?;
        }
        if payout.pending > 0 {
            debug!(pool = %pool_id, %account, pending = payout.pending, paid = payout.paid, locked = payout.locked, "ledger: reward settled");
        }
        Ok(payout)
    }

    fn credit_stake(&mut self, pool_id: PoolId, account: AccountId, amount: Amount, height: Height) -> Result<(), LedgerError> {
        let pool = self.pools.get_mut(pool_id)?;
        pool.staked_total = checked_add(pool.staked_total, amount)?;
        let acc = pool.acc_reward_per_share;
        let position = self
            .positions
            .entry((pool_id, account))
            .or_insert_with(|| StakePosition::opened_at(height));
        position.staked_amount = checked_add(position.staked_amount, amount)?;
        position.checkpoint(acc)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stake operations
    // ------------------------------------------------------------------

    pub fn deposit(
        &mut self,
        pool_id: PoolId,
        account: AccountId,
        amount: Amount,
        referrer: Option<AccountId>,
        height: Height,
    ) -> Result<DepositReceipt, LedgerError> {
        ensure_user(account)?;
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        self.pools.get(pool_id)?;

        let reward = self.settle(pool_id, account, height)?;
        let fee = self.deposit_fee.apply(amount)?;
        let destination = self.split.fee_destination();
        if fee.redistributed > 0 && destination != account {
            self.settle(pool_id, destination, height)?;
        }

        self.credit_stake(pool_id, account, fee.net, height)?;
        if fee.redistributed > 0 {
            self.credit_stake(pool_id, destination, fee.redistributed, height)?;
        }
        let pool = self.pools.get_mut(pool_id)?;
        pool.fees_retained = checked_add(pool.fees_retained, fee.retained)?;

        if let Some(position) = self.positions.get_mut(&(pool_id, account)) {
            position.last_deposit_height = height;
            if let Some(referrer) = referrer.filter(|r| *r != account) {
                let attributed = *position.referrer.get_or_insert(referrer);
                self.referrals.record(attributed, account, amount)?;
            }
        }

        Ok(DepositReceipt {
            net_staked: fee.net,
            fee_redistributed: fee.redistributed,
            fee_retained: fee.retained,
            reward,
        })
    }

    pub fn withdraw(
        &mut self,
        pool_id: PoolId,
        account: AccountId,
        amount: Amount,
        referrer: Option<AccountId>,
        height: Height,
    ) -> Result<WithdrawReceipt, LedgerError> {
        ensure_user(account)?;
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        self.pools.get(pool_id)?;
        let available = self.staked(pool_id, &account);
        if amount > available {
            return Err(InvariantError::InsufficientStake { requested: amount, available }.into());
        }

        let reward = self.settle(pool_id, account, height)?;
        let (elapsed, recorded_referrer) = self.holding(pool_id, &account, height)?;
        let fee = self.fee_tiers.fee_for(elapsed)?.apply(amount)?;

        let pool = self.pools.get_mut(pool_id)?;
        pool.staked_total = checked_sub(pool.staked_total, amount)?;
        pool.fees_retained = checked_add(pool.fees_retained, fee.retained)?;
        let acc = pool.acc_reward_per_share;
        if let Some(position) = self.positions.get_mut(&(pool_id, account)) {
            position.staked_amount -= amount;
            position.checkpoint(acc)?;
            position.last_withdraw_height = Some(height);
        }

        if let Some(referrer) = recorded_referrer.or(referrer.filter(|r| *r != account)) {
            self.referrals.reduce(referrer, account, amount, available)?;
        }

        Ok(WithdrawReceipt {
            returned: fee.net,
            fee_redistributed: fee.redistributed,
            fee_retained: fee.retained,
            fee_destination: self.split.fee_destination(),
            elapsed,
            reward,
        })
    }

    /// Return the whole stake without settling; pending reward is forfeited,
    /// the withdrawal fee tier still applies.
    pub fn emergency_withdraw(&mut self, pool_id: PoolId, account: AccountId, height: Height) -> Result<WithdrawReceipt, LedgerError> {
        ensure_user(account)?;
        self.pools.get(pool_id)?;
        let amount = self.staked(pool_id, &account);
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        let (elapsed, recorded_referrer) = self.holding(pool_id, &account, height)?;
        let fee = self.fee_tiers.fee_for(elapsed)?.apply(amount)?;

        let pool = self.pools.get_mut(pool_id)?;
        pool.staked_total = checked_sub(pool.staked_total, amount)?;
        pool.fees_retained = checked_add(pool.fees_retained, fee.retained)?;
        if let Some(position) = self.positions.get_mut(&(pool_id, account)) {
            position.staked_amount = 0;
            position.reward_debt = 0;
            position.last_withdraw_height = Some(height);
        }
        if let Some(referrer) = recorded_referrer {
            self.referrals.clear(referrer, account);
        }

        Ok(WithdrawReceipt {
            returned: fee.net,
            fee_redistributed: fee.redistributed,
            fee_retained: fee.retained,
            fee_destination: self.split.fee_destination(),
            elapsed,
            reward: RewardPayout::default(),
        })
    }

    pub fn claim_reward(&mut self, pool_id: PoolId, account: AccountId, height: Height) -> Result<RewardPayout, LedgerError> {
        ensure_user(account)?;
        self.pools.get(pool_id)?;
        self.settle(pool_id, account, height)
    }

    /// Claim from several pools; every id is checked before anything settles.
    pub fn claim_rewards(
        &mut self,
        pool_ids: &[PoolId],
        account: AccountId,
        height: Height,
    ) -> Result<Vec<(PoolId, RewardPayout)>, LedgerError> {
        ensure_user(account)?;
        for &pool_id in pool_ids {
            self.pools.get(pool_id)?;
        }
        let mut payouts = Vec::with_capacity(pool_ids.len());
        for &pool_id in pool_ids {
            payouts.push((pool_id, self.settle(pool_id, account, height)?));
        }
        Ok(payouts)
    }

    fn staked(&self, pool_id: PoolId, account: &AccountId) -> Amount {
        self.positions.get(&(pool_id, *account)).map_or(0, |p| p.staked_amount)
    }

    /// Blocks since the last deposit, and the position's referrer.
    fn holding(&self, pool_id: PoolId, account: &AccountId, height: Height) -> Result<(u64, Option<AccountId>), LedgerError> {
        let position = self
            .positions
            .get(&(pool_id, *account))
            .ok_or(InvariantError::InsufficientStake { requested: 0, available: 0 })?;
        Ok((height.saturating_sub(position.last_deposit_height), position.referrer))
    }

    // ------------------------------------------------------------------
    // Token operations
    // ------------------------------------------------------------------

    pub fn unlock(&mut self, account: AccountId, height: Height) -> Result<Amount, LedgerError> {
        ensure_user(account)?;
        self.token.unlock(account, height)
    }

    pub fn transfer(&mut self, from: AccountId, to: AccountId, amount: Amount) -> Result<(), LedgerError> {
        ensure_user(from)?;
        ensure_user(to)?;
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        Ok(self.token.transfer(from, to, amount)?)
    }

    // ------------------------------------------------------------------
    // Privileged operations
    // ------------------------------------------------------------------

    pub fn add_pool(&mut self, cap: &AdminCap, asset: AssetId, weight: u64, height: Height) -> Result<PoolId, LedgerError> {
        self.roles.check_admin(cap)?;
        if self.pools.pool_for_asset(&asset).is_some() {
            return Err(ValidationError::DuplicatePool(asset).into());
        }
        self.mass_update(height)?;
        let start = height.max(self.schedule.start_height());
        self.pools.add(asset, weight, start)
    }

    pub fn set_allocation_weight(&mut self, cap: &AdminCap, pool_id: PoolId, weight: u64, height: Height) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        self.pools.get(pool_id)?;
        self.mass_update(height)?;
        self.pools.set_weight(pool_id, weight)
    }

    pub fn replace_halving_thresholds(&mut self, cap: &AdminCap, thresholds: Vec<Height>, height: Height) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        let mut schedule = self.schedule.clone();
        schedule.replace_thresholds(thresholds)?;
        self.mass_update(height)?;
        self.schedule = schedule;
        Ok(())
    }

    pub fn replace_multipliers(&mut self, cap: &AdminCap, multipliers: Vec<u64>, height: Height) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        let mut schedule = self.schedule.clone();
        schedule.replace_multipliers(multipliers)?;
        self.mass_update(height)?;
        self.schedule = schedule;
        Ok(())
    }

    pub fn replace_fee_tiers(&mut self, cap: &AdminCap, tiers: Vec<FeeTier>) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        Ok(self.fee_tiers.replace(tiers)?)
    }

    pub fn set_deposit_fee(&mut self, cap: &AdminCap, fee: DepositFee) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        fee.validate()?;
        self.deposit_fee = fee;
        Ok(())
    }

    pub fn set_fund_address(&mut self, cap: &AdminCap, fund: Fund, account: AccountId, height: Height) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        ensure_user(account)?;
        self.mass_update(height)?;
        self.split.fund_mut(fund).account = account;
        Ok(())
    }

    pub fn set_payout_split(&mut self, cap: &AdminCap, split: PayoutSplit, height: Height) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        split.validate()?;
        self.mass_update(height)?;
        self.split = split;
        Ok(())
    }

    pub fn set_lock_window(&mut self, cap: &AdminCap, from: Height, to: Height) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        Ok(self.token.set_lock_window(from, to)?)
    }

    pub fn set_cap(&mut self, cap: &AdminCap, new_cap: Amount) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        Ok(self.token.set_cap(new_cap)?)
    }

    pub fn mint(&mut self, cap: &AdminCap, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        ensure_user(account)?;
        ensure_nonzero(amount)?;
        Ok(self.token.mint(account, amount)?)
    }

    pub fn lock(&mut self, cap: &AdminCap, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        ensure_user(account)?;
        ensure_nonzero(amount)?;
        Ok(self.token.lock(account, amount)?)
    }

    pub fn lock_balance(&mut self, cap: &AdminCap, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        ensure_user(account)?;
        ensure_nonzero(amount)?;
        Ok(self.token.lock_balance(account, amount)?)
    }

    pub fn manual_mint(&mut self, cap: &AdminCap, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.roles.check_admin(cap)?;
        ensure_user(account)?;
        ensure_nonzero(amount)?;
        Ok(self.token.manual_mint(account, amount)?)
    }

    pub fn add_authorized(&mut self, cap: &OwnerCap, account: AccountId) -> Result<(), LedgerError> {
        Ok(self.roles.add_authorized(cap, account)?)
    }

    pub fn remove_authorized(&mut self, cap: &OwnerCap, account: AccountId) -> Result<(), LedgerError> {
        Ok(self.roles.remove_authorized(cap, account)?)
    }

    pub fn transfer_ownership(&mut self, cap: &OwnerCap, new_owner: AccountId) -> Result<(), LedgerError> {
        ensure_user(new_owner)?;
        Ok(self.roles.transfer_ownership(cap, new_owner)?)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn snapshot(&self, height: Height) -> LedgerSnapshot {
        let token = &self.token;
        LedgerSnapshot {
            height,
            owner: self.roles.owner(),
            schedule_version: self.schedule.version(),
            fee_table_version: self.fee_tiers.version(),
            total_supply: token.total_supply(),
            total_lock: token.total_locked(),
            cap: token.cap(),
            manual_minted: token.manual_minted(),
            reward_reserve: token.balance_of(&AccountId::REWARD_RESERVE),
            pools: self.pools.iter().map(|(id, pool)| PoolSnapshot { id, pool: pool.clone() }).collect(),
            accounts: token
                .accounts()
                .filter(|a| **a != AccountId::REWARD_RESERVE)
                .map(|a| AccountSnapshot {
                    account: *a,
                    balance: token.balance_of(a),
                    locked: token.lock_of(a),
                    last_unlock_height: token.last_unlock_height(a),
                })
                .collect(),
            positions: self
                .positions
                .iter()
                .map(|(&(pool, account), position)| PositionSnapshot { pool, account, position: position.clone() })
                .collect(),
            referrals: self.referrals.all_totals().copied().collect(),
        }
    }

    /// Cross-check the aggregate counters against the per-entry data.
    /// Returns one message per violated invariant.
    pub fn audit(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let token = &self.token;
        if token.total_supply() > token.cap() {
            problems.push(format!("supply {} above cap {}", token.total_supply(), token.cap()));
        }
        if token.manual_minted() > token.manual_mint_limit() {
            problems.push(format!("manual mints {} above limit {}", token.manual_minted(), token.manual_mint_limit()));
        }
        let locked: Amount = token.accounts().map(|a| token.lock_of(a)).sum();
        if locked != token.total_locked() {
            problems.push(format!("locked sum {locked} != total lock {}", token.total_locked()));
        }
        let held: Amount = token.accounts().map(|a| token.balance_of(a) + token.lock_of(a)).sum();
        if held != token.total_supply() {
            problems.push(format!("held sum {held} != total supply {}", token.total_supply()));
        }
        for (id, pool) in self.pools.iter() {
            let staked: Amount = self
                .positions
                .range((id, AccountId::ZERO)..=(id, AccountId([0xff; 20])))
                .map(|(_, p)| p.staked_amount)
                .sum();
            if staked != pool.staked_total {
                problems.push(format!("pool {id}: staked sum {staked} != total {}", pool.staked_total));
            }
        }
        for totals in self.referrals.all_totals() {
            let sum: Amount = self
                .referrals
                .edges_of(&totals.referrer)
                .iter()
                .map(|e| e.attributed_value)
                .sum();
            if sum != totals.total_attributed_value {
                problems.push(format!("referrer {}: edge sum {sum} != total {}", totals.referrer, totals.total_attributed_value));
            }
        }
        problems
    }
}

impl TokenView for LedgerState {
    fn balance_of(&self, account: &AccountId) -> Amount {
        self.token.balance_of(account)
    }

    fn lock_of(&self, account: &AccountId) -> Amount {
        self.token.lock_of(account)
    }

    fn total_supply(&self) -> Amount {
        self.token.total_supply()
    }

    fn total_lock(&self) -> Amount {
        self.token.total_locked()
    }
}

impl StakeView for LedgerState {
    fn pool_count(&self) -> usize {
        self.pools.len()
    }

    fn staked_of(&self, pool: PoolId, account: &AccountId) -> Result<Amount, NotFoundError> {
        self.pools.get(pool)?;
        Ok(self.staked(pool, account))
    }

    fn pool_staked_total(&self, pool: PoolId) -> Result<Amount, NotFoundError> {
        Ok(self.pools.get(pool)?.staked_total)
    }
}

fn ensure_user(account: AccountId) -> Result<(), ValidationError> {
    if account == AccountId::REWARD_RESERVE {
        return Err(ValidationError::ReservedAccount(account));
    }
    Ok(())
}

fn ensure_nonzero(amount: Amount) -> Result<(), ValidationError> {
    if amount == 0 {
        return Err(ValidationError::ZeroAmount);
    }
    Ok(())
}

/// Serializable view of the whole ledger at one height.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub height: Height,
    pub owner: AccountId,
    pub schedule_version: u32,
    pub fee_table_version: u32,
    #[serde(with = "amount_serde")]
    pub total_supply: Amount,
    #[serde(with = "amount_serde")]
    pub total_lock: Amount,
    #[serde(with = "amount_serde")]
    pub cap: Amount,
    #[serde(with = "amount_serde")]
    pub manual_minted: Amount,
    /// Minted farmer rewards not yet paid out.
    #[serde(with = "amount_serde")]
    pub reward_reserve: Amount,
    pub pools: Vec<PoolSnapshot>,
    pub accounts: Vec<AccountSnapshot>,
    pub positions: Vec<PositionSnapshot>,
    pub referrals: Vec<ReferralTotals>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub id: PoolId,
    pub pool: Pool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub account: AccountId,
    #[serde(with = "amount_serde")]
    pub balance: Amount,
    #[serde(with = "amount_serde")]
    pub locked: Amount,
    pub last_unlock_height: Height,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub pool: PoolId,
    pub account: AccountId,
    pub position: StakePosition,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::constants::ONE_TOKEN;
    use sluice_core::fees::default_tiers;

    use crate::config::PoolConfig;

    const LP: AssetId = AssetId([0x11; 20]);

    fn acct(seed: u8) -> AccountId {
        AccountId::from_seed(seed)
    }

    fn state() -> LedgerState {
        let config = LedgerConfig {
            start_height: 100,
            halving_interval: 1_000,
            base_reward_per_block: ONE_TOKEN,
            lock_from_height: 250,
            lock_to_height: 500,
            deposit_fee: DepositFee::NONE,
            fee_tiers: default_tiers(),
            pools: vec![PoolConfig { stake_asset: LP, allocation_weight: 1 }],
            ..LedgerConfig::default()
        };
        LedgerState::from_config(&config).unwrap()
    }

    fn admin(state: &LedgerState) -> AdminCap {
        state.roles().issue_admin(state.roles().owner()).unwrap()
    }

    // ------------------------------------------------------------------
    // Accrual
    // ------------------------------------------------------------------

    #[test]
    fn accrual_without_stake_only_advances() {
        let mut s = state();
        s.accrue(PoolId(0), 150).unwrap();
        let pool = s.pools().get(PoolId(0)).unwrap();
        assert_eq!(pool.last_accrual_height, 150);
        assert_eq!(pool.acc_reward_per_share, 0);
        assert_eq!(s.token().total_supply(), 0);
    }

    #[test]
    fn accrual_never_moves_back() {
        let mut s = state();
        s.accrue(PoolId(0), 150).unwrap();
        s.accrue(PoolId(0), 120).unwrap();
        assert_eq!(s.pools().get(PoolId(0)).unwrap().last_accrual_height, 150);
    }

    #[test]
    fn accrual_mints_pool_reward_and_fund_shares() {
        let mut s = state();
        s.deposit(PoolId(0), acct(2), 100 * ONE_TOKEN, None, 90).unwrap();
        s.accrue(PoolId(0), 101).unwrap();
        // 256 for farmers + 20% on top for the funds
        assert_eq!(s.token().balance_of(&AccountId::REWARD_RESERVE), 256 * ONE_TOKEN);
        assert_eq!(s.token().total_supply(), 307_200_000_000_000_000_000);
        assert!(s.audit().is_empty());
    }

    #[test]
    fn accrual_fails_whole_when_cap_would_break() {
        let mut s = state();
        s.deposit(PoolId(0), acct(2), ONE_TOKEN, None, 90).unwrap();
        let cap = admin(&s);
        s.set_cap(&cap, 300 * ONE_TOKEN).unwrap();
        let err = s.accrue(PoolId(0), 101).unwrap_err();
        assert!(matches!(err, LedgerError::Invariant(InvariantError::CapExceeded { .. })));
    }

    // ------------------------------------------------------------------
    // Stake flow
    // ------------------------------------------------------------------

    #[test]
    fn zero_deposit_is_rejected() {
        let mut s = state();
        assert_eq!(s.deposit(PoolId(0), acct(2), 0, None, 100).unwrap_err(), ValidationError::ZeroAmount.into());
    }

    #[test]
    fn deposit_into_missing_pool() {
        let mut s = state();
        assert_eq!(
            s.deposit(PoolId(3), acct(2), 1, None, 100).unwrap_err(),
            NotFoundError::PoolNotFound(PoolId(3)).into()
        );
    }

    #[test]
    fn withdraw_more_than_staked() {
        let mut s = state();
        s.deposit(PoolId(0), acct(2), 10, None, 100).unwrap();
        assert_eq!(
            s.withdraw(PoolId(0), acct(2), 11, None, 101).unwrap_err(),
            InvariantError::InsufficientStake { requested: 11, available: 10 }.into()
        );
    }

    #[test]
    fn same_block_withdraw_pays_top_tier() {
        let mut s = state();
        s.deposit(PoolId(0), acct(2), 1_000, None, 100).unwrap();
        let receipt = s.withdraw(PoolId(0), acct(2), 1_000, None, 100).unwrap();
        assert_eq!(receipt.elapsed, 0);
        assert_eq!(receipt.returned, 750);
        assert_eq!(receipt.fee_redistributed, 250);
        assert_eq!(receipt.fee_destination, s.payout_split().fee_destination());
    }

    #[test]
    fn claim_twice_same_height_pays_zero() {
        let mut s = state();
        s.deposit(PoolId(0), acct(2), ONE_TOKEN, None, 100).unwrap();
        let first = s.claim_reward(PoolId(0), acct(2), 110).unwrap();
        let second = s.claim_reward(PoolId(0), acct(2), 110).unwrap();
        assert!(first.paid > 0);
        assert_eq!(second, RewardPayout::default());
    }

    #[test]
    fn pending_matches_claim() {
        let mut s = state();
        s.deposit(PoolId(0), acct(2), 3 * ONE_TOKEN, None, 100).unwrap();
        let projected = s.pending_reward(PoolId(0), &acct(2), 140).unwrap();
        let claimed = s.claim_reward(PoolId(0), acct(2), 140).unwrap();
        assert_eq!(projected, claimed.pending);
    }

    #[test]
    fn batch_claim_checks_all_ids_first() {
        let mut s = state();
        s.deposit(PoolId(0), acct(2), ONE_TOKEN, None, 100).unwrap();
        let before = s.clone();
        let err = s.claim_rewards(&[PoolId(0), PoolId(7)], acct(2), 120).unwrap_err();
        assert_eq!(err, NotFoundError::PoolNotFound(PoolId(7)).into());
        assert_eq!(s, before);
    }

    #[test]
    fn reserve_cannot_act() {
        let mut s = state();
        assert_eq!(
            s.deposit(PoolId(0), AccountId::REWARD_RESERVE, 1, None, 100).unwrap_err(),
            ValidationError::ReservedAccount(AccountId::REWARD_RESERVE).into()
        );
    }

    // ------------------------------------------------------------------
    // Privileged
    // ------------------------------------------------------------------

    #[test]
    fn stranger_cannot_add_pool() {
        let s = state();
        assert!(s.roles().issue_admin(acct(9)).is_err());
    }

    #[test]
    fn add_pool_rejects_duplicate() {
        let mut s = state();
        let cap = admin(&s);
        assert_eq!(s.add_pool(&cap, LP, 1, 100).unwrap_err(), ValidationError::DuplicatePool(LP).into());
        assert_eq!(s.add_pool(&cap, AssetId::from_seed(0x22), 3, 100).unwrap(), PoolId(1));
        assert_eq!(s.pools().total_weight(), 4);
    }

    #[test]
    fn manual_mint_goes_through_cap_check() {
        let mut s = state();
        let cap = admin(&s);
        s.manual_mint(&cap, acct(3), 50_000 * ONE_TOKEN).unwrap();
        assert!(matches!(
            s.manual_mint(&cap, acct(3), 1).unwrap_err(),
            LedgerError::Invariant(InvariantError::ManualMintLimitExceeded { .. })
        ));
    }

    #[test]
    fn snapshot_lists_positions() {
        let mut s = state();
        s.deposit(PoolId(0), acct(2), 5, Some(acct(4)), 100).unwrap();
        let snap = s.snapshot(100);
        assert_eq!(snap.positions.len(), 1);
        assert_eq!(snap.referrals[0].referrer, acct(4));
        let json = serde_json::to_string(&snap).unwrap();
        let back: LedgerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
