//! Pool registry and per-pool accrual math.
//!
//! `acc_reward_per_share` is scaled by [`ACC_PRECISION`]: a position's
//! accrued reward is `staked * acc_reward_per_share / ACC_PRECISION` minus
//! its reward debt.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sluice_core::constants::ACC_PRECISION;
use sluice_core::emission::HalvingSchedule;
use sluice_core::error::{InvariantError, LedgerError, NotFoundError, ValidationError};
use sluice_core::math::{checked_add, mul_div};
use sluice_core::types::{Amount, AssetId, Height, PoolId, amount_serde};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Pool {
    pub stake_asset: AssetId,
    pub allocation_weight: u64,
    pub last_accrual_height: Height,
    #[serde(with = "amount_serde")]
    pub acc_reward_per_share: u128,
    #[serde(with = "amount_serde")]
    pub staked_total: Amount,
    /// Fees withheld but not redistributed, in stake-asset units.
    #[serde(with = "amount_serde")]
    pub fees_retained: Amount,
}

impl Pool {
    fn new(stake_asset: AssetId, allocation_weight: u64, last_accrual_height: Height) -> Self {
        Self {
            stake_asset,
            allocation_weight,
            last_accrual_height,
            acc_reward_per_share: 0,
            staked_total: 0,
            fees_retained: 0,
        }
    }

    /// This pool's share of the emission over `[last_accrual_height, height)`.
    ///
    /// Zero when nothing is staked, nothing is weighted, or no blocks passed.
    pub fn pending_emission(
        &self,
        schedule: &HalvingSchedule,
        total_weight: u64,
        height: Height,
    ) -> Result<Amount, InvariantError> {
        if height <= self.last_accrual_height || self.staked_total == 0 || total_weight == 0 {
            return Ok(0);
        }
        let reward = schedule.total_reward(self.last_accrual_height, height)?;
        mul_div(reward, self.allocation_weight as u128, total_weight as u128)
    }

    /// Per-share increment for distributing `farmer_reward` over the current stake.
    pub fn acc_increment(&self, farmer_reward: Amount) -> Result<u128, InvariantError> {
        if self.staked_total == 0 {
            return Ok(0);
        }
        mul_div(farmer_reward, ACC_PRECISION, self.staked_total)
    }

    /// `acc_reward_per_share` as it would read after accruing to `height`.
    pub fn projected_acc(
        &self,
        schedule: &HalvingSchedule,
        total_weight: u64,
        height: Height,
    ) -> Result<u128, InvariantError> {
        let reward = self.pending_emission(schedule, total_weight, height)?;
        checked_add(self.acc_reward_per_share, self.acc_increment(reward)?)
    }
}

/// Accrued reward for `staked` at a given per-share value.
pub fn accumulated(staked: Amount, acc_reward_per_share: u128) -> Result<Amount, InvariantError> {
    mul_div(staked, acc_reward_per_share, ACC_PRECISION)
}

/// Pools in insertion order, indexed by stake asset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolRegistry {
    pools: Vec<Pool>,
    by_asset: HashMap<AssetId, PoolId>,
    total_weight: u64,
}

impl PoolRegistry {
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn ids(&self) -> impl Iterator<Item = PoolId> + use<> {
        (0..self.pools.len() as u32).map(PoolId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolId, &Pool)> {
        self.pools.iter().enumerate().map(|(i, p)| (PoolId(i as u32), p))
    }

    pub fn get(&self, id: PoolId) -> Result<&Pool, NotFoundError> {
        self.pools.get(id.index()).ok_or(NotFoundError::PoolNotFound(id))
    }

    pub fn get_mut(&mut self, id: PoolId) -> Result<&mut Pool, NotFoundError> {
        self.pools.get_mut(id.index()).ok_or(NotFoundError::PoolNotFound(id))
    }

    pub fn pool_for_asset(&self, asset: &AssetId) -> Option<PoolId> {
        self.by_asset.get(asset).copied()
    }

    /// Register a pool whose accrual starts at `start_height`.
    pub fn add(
        &mut self,
        stake_asset: AssetId,
        allocation_weight: u64,
        start_height: Height,
    ) -> Result<PoolId, LedgerError> {
        if self.by_asset.contains_key(&stake_asset) {
            return Err(ValidationError::DuplicatePool(stake_asset).into());
        }
        let total_weight = self
            .total_weight
            .checked_add(allocation_weight)
            .ok_or(InvariantError::ArithmeticOverflow)?;
        let id = PoolId(self.pools.len() as u32);
        self.pools.push(Pool::new(stake_asset, allocation_weight, start_height));
        self.by_asset.insert(stake_asset, id);
        self.total_weight = total_weight;
        Ok(id)
    }

    /// Change a pool's weight; the caller settles accrual first.
    pub fn set_weight(&mut self, id: PoolId, allocation_weight: u64) -> Result<(), LedgerError> {
        let pool = self.pools.get_mut(id.index()).ok_or(NotFoundError::PoolNotFound(id))?;
        self.total_weight = (self.total_weight - pool.allocation_weight)
            .checked_add(allocation_weight)
            .ok_or(InvariantError::ArithmeticOverflow)?;
        pool.allocation_weight = allocation_weight;
        Ok(())
    }
}
