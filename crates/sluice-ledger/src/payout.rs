//! Reward payout split between farmers and the auxiliary funds.
//!
//! Each accrual mints the pool's reward `R` for farmers, plus, on top, each
//! fund's `share_bps` of `R`. During the bonus window a `locked_bps` fraction
//! of every payout (farmer or fund) goes into the vesting lock.

use serde::{Deserialize, Serialize};
use sluice_core::constants::{BPS_PRECISION, DEFAULT_FARMER_LOCKED_BPS};
use sluice_core::error::{InvariantError, ValidationError};
use sluice_core::math::apply_bps;
use sluice_core::types::{AccountId, Amount};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Fund {
    Development,
    Liquidity,
    Community,
    Founder,
}

impl Fund {
    pub const ALL: [Fund; 4] = [Fund::Development, Fund::Liquidity, Fund::Community, Fund::Founder];
}

impl std::fmt::Display for Fund {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Fund::Development => "development",
            Fund::Liquidity => "liquidity",
            Fund::Community => "community",
            Fund::Founder => "founder",
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FundShare {
    pub account: AccountId,
    /// Minted on top of the pool reward, in bps of it.
    pub share_bps: u32,
    /// Locked part of the fund's mint while the bonus window is open.
    pub locked_bps: u32,
}

/// One auxiliary mint produced by an accrual.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FundMint {
    pub fund: Fund,
    pub account: AccountId,
    pub amount: Amount,
    pub locked: Amount,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PayoutSplit {
    pub farmer_locked_bps: u32,
    pub development: FundShare,
    pub liquidity: FundShare,
    pub community: FundShare,
    pub founder: FundShare,
}

impl PayoutSplit {
    pub fn fund(&self, fund: Fund) -> &FundShare {
        match fund {
            Fund::Development => &self.development,
            Fund::Liquidity => &self.liquidity,
            Fund::Community => &self.community,
            Fund::Founder => &self.founder,
        }
    }

    pub fn fund_mut(&mut self, fund: Fund) -> &mut FundShare {
        match fund {
            Fund::Development => &mut self.development,
            Fund::Liquidity => &mut self.liquidity,
            Fund::Community => &mut self.community,
            Fund::Founder => &mut self.founder,
        }
    }

    /// Receives deposit and withdrawal fees.
    pub fn fee_destination(&self) -> AccountId {
        self.development.account
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_bps(self.farmer_locked_bps)?;
        let mut total_share = 0u32;
        for fund in Fund::ALL {
            let share = self.fund(fund);
            check_bps(share.share_bps)?;
            check_bps(share.locked_bps)?;
            if share.account == AccountId::REWARD_RESERVE {
                return Err(ValidationError::ReservedAccount(share.account));
            }
            total_share += share.share_bps;
        }
        if total_share > BPS_PRECISION {
            return Err(ValidationError::PayoutSplitTooLarge(total_share));
        }
        Ok(())
    }

    /// Fund mints for a pool reward. `locking` selects whether the locked parts apply.
    pub fn fund_mints(&self, pool_reward: Amount, locking: bool) -> Result<Vec<FundMint>, InvariantError> {
        Fund::ALL
            .iter()
            .map(|&fund| {
                let share = self.fund(fund);
                let amount = apply_bps(pool_reward, share.share_bps)?;
                let locked = if locking { apply_bps(amount, share.locked_bps)? } else { 0 };
                Ok(FundMint { fund, account: share.account, amount, locked })
            })
            .collect()
    }

    /// Locked part of a farmer payout.
    pub fn farmer_locked(&self, reward: Amount, locking: bool) -> Result<Amount, InvariantError> {
        if !locking {
            return Ok(0);
        }
        apply_bps(reward, self.farmer_locked_bps)
    }
}

impl Default for PayoutSplit {
    fn default() -> Self {
        let share = |seed: u8, share_bps, locked_bps| FundShare {
            account: AccountId::from_seed(seed),
            share_bps,
            locked_bps,
        };
        Self {
            farmer_locked_bps: DEFAULT_FARMER_LOCKED_BPS,
            development: share(0xd1, 600, 7_500),
            liquidity: share(0xd2, 400, 4_500),
            community: share(0xd3, 600, 8_500),
            founder: share(0xd4, 400, 9_500),
        }
    }
}

fn check_bps(bps: u32) -> Result<(), ValidationError> {
    if bps > BPS_PRECISION {
        return Err(ValidationError::BpsOutOfRange(bps));
    }
    Ok(())
}
