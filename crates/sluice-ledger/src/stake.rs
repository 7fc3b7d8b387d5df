//! Stake positions and the receipts returned by stake operations.

use serde::{Deserialize, Serialize};
use sluice_core::error::InvariantError;
use sluice_core::math::checked_sub;
use sluice_core::types::{AccountId, Amount, Height, amount_serde};

use crate::pool::accumulated;

/// One account's stake in one pool.
///
/// Created by the first deposit and never removed; a zero stake is a valid
/// resting state.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct StakePosition {
    #[serde(with = "amount_serde")]
    pub staked_amount: Amount,
    /// `staked_amount * acc_reward_per_share / ACC_PRECISION` at the last settlement.
    #[serde(with = "amount_serde")]
    pub reward_debt: Amount,
    pub last_deposit_height: Height,
    pub first_deposit_height: Height,
    pub last_withdraw_height: Option<Height>,
    /// Fixed by the first referred deposit.
    pub referrer: Option<AccountId>,
}

impl StakePosition {
    pub fn opened_at(height: Height) -> Self {
        Self { first_deposit_height: height, last_deposit_height: height, ..Self::default() }
    }

    /// Reward accrued since the last settlement at the given per-share value.
    pub fn pending(&self, acc_reward_per_share: u128) -> Result<Amount, InvariantError> {
        checked_sub(accumulated(self.staked_amount, acc_reward_per_share)?, self.reward_debt)
    }

    /// Re-checkpoint after the stake changed.
    pub fn checkpoint(&mut self, acc_reward_per_share: u128) -> Result<(), InvariantError> {
        self.reward_debt = accumulated(self.staked_amount, acc_reward_per_share)?;
        Ok(())
    }
}

/// Outcome of settling one position.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewardPayout {
    /// Reward accrued to the position.
    #[serde(with = "amount_serde")]
    pub pending: Amount,
    /// Transferred out of the reward reserve (bounded by its balance).
    #[serde(with = "amount_serde")]
    pub paid: Amount,
    /// Part of `paid` moved into the account's vesting lock.
    #[serde(with = "amount_serde")]
    pub locked: Amount,
}

impl RewardPayout {
    pub fn unlocked(&self) -> Amount {
        self.paid - self.locked
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepositReceipt {
    #[serde(with = "amount_serde")]
    pub net_staked: Amount,
    /// Staked on behalf of the fee destination.
    #[serde(with = "amount_serde")]
    pub fee_redistributed: Amount,
    #[serde(with = "amount_serde")]
    pub fee_retained: Amount,
    pub reward: RewardPayout,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WithdrawReceipt {
    /// Stake returned to the account.
    #[serde(with = "amount_serde")]
    pub returned: Amount,
    /// Stake sent to the fee destination.
    #[serde(with = "amount_serde")]
    pub fee_redistributed: Amount,
    #[serde(with = "amount_serde")]
    pub fee_retained: Amount,
    pub fee_destination: AccountId,
    /// Holding duration the fee tier was chosen by.
    pub elapsed: u64,
    /// Empty for emergency withdrawals.
    pub reward: RewardPayout,
}
