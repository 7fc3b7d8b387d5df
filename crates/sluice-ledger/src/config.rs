//! Deployment parameters for a ledger instance.
//!
//! Provides [`LedgerConfig`] with the default tables (104-stage multiplier
//! curve, eight withdrawal fee tiers, 75 bps deposit fee, default payout
//! split). Every field can be overridden; amounts accept decimal strings or
//! integers in base units.

use serde::{Deserialize, Serialize};
use sluice_core::constants::{
    DEFAULT_BASE_REWARD_PER_BLOCK, DEFAULT_CAP, DEFAULT_HALVING_INTERVAL, DEFAULT_MANUAL_MINT_LIMIT,
    DEFAULT_MULTIPLIERS,
};
use sluice_core::emission::HalvingSchedule;
use sluice_core::error::ValidationError;
use sluice_core::fees::{DepositFee, FeeTier, FeeTierTable, default_tiers};
use sluice_core::types::{AccountId, Amount, AssetId, Height, amount_serde};

use crate::payout::PayoutSplit;

/// A pool registered when the ledger is built.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub stake_asset: AssetId,
    pub allocation_weight: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    pub owner: AccountId,
    /// Operators allowed to run privileged configuration calls.
    pub authorized: Vec<AccountId>,
    #[serde(with = "amount_serde")]
    pub base_reward_per_block: Amount,
    pub start_height: Height,
    pub halving_interval: u64,
    pub multipliers: Vec<u64>,
    /// Explicit stage ends; derived from `halving_interval` when absent.
    pub halving_thresholds: Option<Vec<Height>>,
    #[serde(with = "amount_serde")]
    pub cap: Amount,
    #[serde(with = "amount_serde")]
    pub manual_mint_limit: Amount,
    pub lock_from_height: Height,
    pub lock_to_height: Height,
    pub deposit_fee: DepositFee,
    pub fee_tiers: Vec<FeeTier>,
    pub payout: PayoutSplit,
    pub pools: Vec<PoolConfig>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let emission_end = DEFAULT_HALVING_INTERVAL * DEFAULT_MULTIPLIERS.len() as u64;
        Self {
            owner: AccountId::from_seed(0x01),
            authorized: Vec::new(),
            base_reward_per_block: DEFAULT_BASE_REWARD_PER_BLOCK,
            start_height: 0,
            halving_interval: DEFAULT_HALVING_INTERVAL,
            multipliers: DEFAULT_MULTIPLIERS.to_vec(),
            halving_thresholds: None,
            cap: DEFAULT_CAP,
            manual_mint_limit: DEFAULT_MANUAL_MINT_LIMIT,
            lock_from_height: emission_end,
            lock_to_height: emission_end + DEFAULT_HALVING_INTERVAL * 52,
            deposit_fee: DepositFee::default(),
            fee_tiers: default_tiers(),
            payout: PayoutSplit::default(),
            pools: Vec::new(),
        }
    }
}

impl LedgerConfig {
    pub fn schedule(&self) -> Result<HalvingSchedule, ValidationError> {
        match &self.halving_thresholds {
            Some(thresholds) => HalvingSchedule::new(
                self.start_height,
                self.base_reward_per_block,
                thresholds.clone(),
                self.multipliers.clone(),
            ),
            None => HalvingSchedule::from_interval(
                self.start_height,
                self.halving_interval,
                self.base_reward_per_block,
                self.multipliers.clone(),
            ),
        }
    }

    pub fn fee_table(&self) -> Result<FeeTierTable, ValidationError> {
        FeeTierTable::new(self.fee_tiers.clone())
    }

    /// Check every table and limit without building a ledger.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.schedule()?;
        self.fee_table()?;
        self.deposit_fee.validate()?;
        self.payout.validate()?;
        if self.lock_from_height >= self.lock_to_height {
            return Err(ValidationError::InvalidLockWindow {
                from: self.lock_from_height,
                to: self.lock_to_height,
            });
        }
        if self.owner == AccountId::REWARD_RESERVE {
            return Err(ValidationError::ReservedAccount(self.owner));
        }
        let mut assets: Vec<&AssetId> = self.pools.iter().map(|p| &p.stake_asset).collect();
        assets.sort_unstable();
        if let Some(pair) = assets.windows(2).find(|w| w[0] == w[1]) {
            return Err(ValidationError::DuplicatePool(*pair[0]));
        }
        Ok(())
    }
}
