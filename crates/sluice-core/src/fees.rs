//! Holding-duration fee tiers.
//!
//! A withdrawal is charged by how many blocks passed since the position's
//! last deposit. The fee withheld from the withdrawer is split: up to
//! `redistribution_fee_bps` of the gross goes to the fee destination, any
//! remainder is retained by the registry.

use serde::{Deserialize, Serialize};

use crate::constants::{BPS_PRECISION, DEFAULT_DEPOSIT_FEE_BPS, DEFAULT_FEE_TIERS};
use crate::error::{InvariantError, ValidationError};
use crate::math::apply_bps;
use crate::types::{Amount, amount_serde};

/// One row of the tier table, covering `[min_elapsed, max_elapsed]`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeTier {
    pub min_elapsed: u64,
    /// `None` for the open-ended final tier.
    pub max_elapsed: Option<u64>,
    pub account_fee_bps: u32,
    pub redistribution_fee_bps: u32,
}

impl FeeTier {
    pub fn covers(&self, elapsed: u64) -> bool {
        elapsed >= self.min_elapsed && self.max_elapsed.is_none_or(|max| elapsed <= max)
    }

    pub fn apply(&self, gross: Amount) -> Result<FeeBreakdown, InvariantError> {
        split_fee(gross, self.account_fee_bps, self.redistribution_fee_bps)
    }
}

/// How a gross amount divides once a fee rate is applied.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeBreakdown {
    #[serde(with = "amount_serde")]
    pub gross: Amount,
    /// What the account keeps.
    #[serde(with = "amount_serde")]
    pub net: Amount,
    /// Sent to the fee destination.
    #[serde(with = "amount_serde")]
    pub redistributed: Amount,
    /// Withheld but not redistributed.
    #[serde(with = "amount_serde")]
    pub retained: Amount,
}

impl FeeBreakdown {
    pub fn fee(&self) -> Amount {
        self.redistributed + self.retained
    }
}

/// `net = gross - gross * account_bps / 10_000`; the withheld part is split
/// between redistribution (capped at `gross * redistribution_bps / 10_000`)
/// and retention.
pub fn split_fee(
    gross: Amount,
    account_bps: u32,
    redistribution_bps: u32,
) -> Result<FeeBreakdown, InvariantError> {
    let fee = apply_bps(gross, account_bps)?;
    let redistributed = apply_bps(gross, redistribution_bps)?.min(fee);
    Ok(FeeBreakdown { gross, net: gross - fee, redistributed, retained: fee - redistributed })
}

/// Ordered, gap-free tier table covering every elapsed duration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FeeTierTable {
    tiers: Vec<FeeTier>,
    version: u32,
}

impl FeeTierTable {
    pub fn new(tiers: Vec<FeeTier>) -> Result<Self, ValidationError> {
        validate_tiers(&tiers)?;
        Ok(Self { tiers, version: 0 })
    }

    pub fn tiers(&self) -> &[FeeTier] {
        &self.tiers
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Tier for a holding duration of `elapsed` blocks.
    ///
    /// A validated table always matches; `NoMatchingTier` only surfaces for a
    /// table that bypassed validation.
    pub fn fee_for(&self, elapsed: u64) -> Result<FeeTier, ValidationError> {
        let idx = self.tiers.partition_point(|t| t.min_elapsed <= elapsed);
        idx.checked_sub(1)
            .map(|i| self.tiers[i])
            .filter(|tier| tier.covers(elapsed))
            .ok_or(ValidationError::NoMatchingTier(elapsed))
    }

    /// Highest-fee tier, the one that covers same-block withdrawals.
    pub fn max_tier(&self) -> Option<&FeeTier> {
        self.tiers.first()
    }

    /// Lowest-fee tier, the open-ended one.
    pub fn min_tier(&self) -> Option<&FeeTier> {
        self.tiers.last()
    }

    /// Swap in a new table after validating it; the old one stays on error.
    pub fn replace(&mut self, tiers: Vec<FeeTier>) -> Result<(), ValidationError> {
        validate_tiers(&tiers)?;
        self.tiers = tiers;
        self.version += 1;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_tiers(&self.tiers)
    }
}

impl Default for FeeTierTable {
    fn default() -> Self {
        Self { tiers: default_tiers(), version: 0 }
    }
}

/// Tier table with the same rate withheld and redistributed at every step.
pub fn default_tiers() -> Vec<FeeTier> {
    DEFAULT_FEE_TIERS
        .iter()
        .map(|&(min_elapsed, max_elapsed, bps)| FeeTier {
            min_elapsed,
            max_elapsed,
            account_fee_bps: bps,
            redistribution_fee_bps: bps,
        })
        .collect()
}

fn validate_tiers(tiers: &[FeeTier]) -> Result<(), ValidationError> {
    let malformed = |msg: String| ValidationError::MalformedFeeTable(msg);
    let first = tiers.first().ok_or_else(|| malformed("empty table".into()))?;
    if first.min_elapsed != 0 {
        return Err(malformed(format!("first tier starts at {}", first.min_elapsed)));
    }
    for (i, tier) in tiers.iter().enumerate() {
        check_bps(tier.account_fee_bps)?;
        check_bps(tier.redistribution_fee_bps)?;
        if tier.redistribution_fee_bps > tier.account_fee_bps {
            return Err(malformed(format!("tier {i} redistributes more than it withholds")));
        }
        let is_last = i + 1 == tiers.len();
        match (tier.max_elapsed, is_last) {
            (None, true) => {}
            (None, false) => return Err(malformed(format!("tier {i} is open-ended but not last"))),
            (Some(_), true) => return Err(malformed("last tier must be open-ended".into())),
            (Some(max), false) => {
                if max < tier.min_elapsed {
                    return Err(malformed(format!("tier {i} is empty")));
                }
                let next = &tiers[i + 1];
                if Some(next.min_elapsed) != max.checked_add(1) {
                    return Err(malformed(format!("gap or overlap after tier {i}")));
                }
                if next.account_fee_bps > tier.account_fee_bps {
                    return Err(malformed(format!("fee rises at tier {}", i + 1)));
                }
            }
        }
    }
    Ok(())
}

fn check_bps(bps: u32) -> Result<(), ValidationError> {
    if bps > BPS_PRECISION {
        return Err(ValidationError::BpsOutOfRange(bps));
    }
    Ok(())
}

/// Fee charged on every deposit; the redistributed part is staked for the
/// fee destination in the same pool.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepositFee {
    pub account_fee_bps: u32,
    pub redistribution_fee_bps: u32,
}

impl DepositFee {
    pub const NONE: Self = Self { account_fee_bps: 0, redistribution_fee_bps: 0 };

    pub fn new(account_fee_bps: u32, redistribution_fee_bps: u32) -> Result<Self, ValidationError> {
        let fee = Self { account_fee_bps, redistribution_fee_bps };
        fee.validate()?;
        Ok(fee)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_bps(self.account_fee_bps)?;
        check_bps(self.redistribution_fee_bps)?;
        if self.redistribution_fee_bps > self.account_fee_bps {
            return Err(ValidationError::MalformedFeeTable(
                "deposit fee redistributes more than it withholds".into(),
            ));
        }
        Ok(())
    }

    pub fn apply(&self, gross: Amount) -> Result<FeeBreakdown, InvariantError> {
        split_fee(gross, self.account_fee_bps, self.redistribution_fee_bps)
    }
}

impl Default for DepositFee {
    fn default() -> Self {
        Self {
            account_fee_bps: DEFAULT_DEPOSIT_FEE_BPS,
            redistribution_fee_bps: DEFAULT_DEPOSIT_FEE_BPS,
        }
    }
}
