//! Emission schedule: piecewise multiplier curve over block heights.
//!
//! Stage `i` covers `[threshold(i-1), threshold(i))`, with stage 0 opening at
//! the start height. Every block in stage `i` emits
//! `multiplier(i) * base_reward_per_block`. Past the last threshold (or past
//! the last defined multiplier) the multiplier is 0, which ends emission.
//!
//! Thresholds and multipliers are replaceable as whole tables only; each
//! replacement is validated first and bumps [`HalvingSchedule::version`].

use serde::{Deserialize, Serialize};

use crate::error::{InvariantError, ValidationError};
use crate::types::{Amount, Height, amount_serde};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HalvingSchedule {
    start_height: Height,
    #[serde(with = "amount_serde")]
    base_reward_per_block: Amount,
    thresholds: Vec<Height>,
    multipliers: Vec<u64>,
    version: u32,
}

impl HalvingSchedule {
    /// Build a schedule from explicit tables.
    ///
    /// Thresholds must strictly increase, start above `start_height`, and
    /// number at least as many as the multipliers.
    pub fn new(
        start_height: Height,
        base_reward_per_block: Amount,
        thresholds: Vec<Height>,
        multipliers: Vec<u64>,
    ) -> Result<Self, ValidationError> {
        if multipliers.is_empty() {
            return Err(ValidationError::EmptyMultiplierTable);
        }
        validate_thresholds(start_height, &thresholds, multipliers.len())?;
        Ok(Self { start_height, base_reward_per_block, thresholds, multipliers, version: 0 })
    }

    /// One stage per multiplier, each `interval` blocks long.
    ///
    /// Stage `i` ends at `start + interval * (i + 1) + 1`.
    pub fn from_interval(
        start_height: Height,
        interval: u64,
        base_reward_per_block: Amount,
        multipliers: Vec<u64>,
    ) -> Result<Self, ValidationError> {
        if interval == 0 {
            return Err(ValidationError::NonIncreasingThresholds { index: 0 });
        }
        let thresholds = (0..multipliers.len() as u64)
            .map(|i| {
                interval
                    .checked_mul(i + 1)
                    .and_then(|span| start_height.checked_add(span))
                    .and_then(|h| h.checked_add(1))
                    .ok_or(ValidationError::NonIncreasingThresholds { index: i as usize })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(start_height, base_reward_per_block, thresholds, multipliers)
    }

    pub fn start_height(&self) -> Height {
        self.start_height
    }

    pub fn base_reward_per_block(&self) -> Amount {
        self.base_reward_per_block
    }

    pub fn thresholds(&self) -> &[Height] {
        &self.thresholds
    }

    pub fn multipliers(&self) -> &[u64] {
        &self.multipliers
    }

    /// Incremented by every successful table replacement.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn threshold(&self, index: usize) -> Option<Height> {
        self.thresholds.get(index).copied()
    }

    /// Multiplier of stage `index`; stages without a defined multiplier emit nothing.
    pub fn multiplier(&self, index: usize) -> u64 {
        self.multipliers.get(index).copied().unwrap_or(0)
    }

    /// Stage index containing `height`, or `None` before the start height.
    pub fn stage_at(&self, height: Height) -> Option<usize> {
        if height < self.start_height {
            return None;
        }
        Some(self.thresholds.partition_point(|&t| t <= height))
    }

    /// Multiplier in effect for the block at `height`.
    pub fn multiplier_at(&self, height: Height) -> u64 {
        self.stage_at(height).map_or(0, |stage| self.multiplier(stage))
    }

    /// Last height that still emits a reward.
    pub fn final_reward_height(&self) -> Height {
        let stages = self.multipliers.len().min(self.thresholds.len());
        match stages.checked_sub(1).and_then(|last| self.thresholds.get(last)) {
            Some(&end) => end - 1,
            None => self.start_height,
        }
    }

    /// Sum of per-block multipliers over `[from, to)`.
    ///
    /// `from` is clamped to the start height. Empty or inverted ranges yield 0.
    pub fn total_multiplier(&self, from: Height, to: Height) -> u128 {
        let mut cursor = from.max(self.start_height);
        if to <= cursor {
            return 0;
        }
        let mut total: u128 = 0;
        for (index, &end) in self.thresholds.iter().enumerate() {
            let multiplier = self.multiplier(index) as u128;
            if to <= end {
                return total + (to - cursor) as u128 * multiplier;
            }
            if cursor < end {
                total += (end - cursor) as u128 * multiplier;
                cursor = end;
            }
        }
        total
    }

    /// Reward emitted over `[from, to)` before any pool weighting.
    pub fn total_reward(&self, from: Height, to: Height) -> Result<Amount, InvariantError> {
        self.total_multiplier(from, to)
            .checked_mul(self.base_reward_per_block)
            .ok_or(InvariantError::ArithmeticOverflow)
    }

    /// Replace the threshold table atomically.
    ///
    /// Rejects tables shorter than the multiplier table so that no defined
    /// multiplier is silently dropped. Extra thresholds emit nothing.
    pub fn replace_thresholds(&mut self, thresholds: Vec<Height>) -> Result<(), ValidationError> {
        validate_thresholds(self.start_height, &thresholds, self.multipliers.len())?;
        self.thresholds = thresholds;
        self.version += 1;
        Ok(())
    }

    /// Replace the multiplier table atomically.
    pub fn replace_multipliers(&mut self, multipliers: Vec<u64>) -> Result<(), ValidationError> {
        if multipliers.is_empty() {
            return Err(ValidationError::EmptyMultiplierTable);
        }
        if multipliers.len() > self.thresholds.len() {
            return Err(ValidationError::MultiplierTableTooLong {
                got: multipliers.len(),
                max: self.thresholds.len(),
            });
        }
        self.multipliers = multipliers;
        self.version += 1;
        Ok(())
    }

    /// Re-check every table invariant, for schedules that arrive through serde.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.multipliers.is_empty() {
            return Err(ValidationError::EmptyMultiplierTable);
        }
        validate_thresholds(self.start_height, &self.thresholds, self.multipliers.len())
    }
}

fn validate_thresholds(
    start_height: Height,
    thresholds: &[Height],
    required: usize,
) -> Result<(), ValidationError> {
    if thresholds.len() < required {
        return Err(ValidationError::ThresholdTableTooShort { got: thresholds.len(), required });
    }
    let mut previous = start_height;
    for (index, &threshold) in thresholds.iter().enumerate() {
        if threshold <= previous {
            return Err(ValidationError::NonIncreasingThresholds { index });
        }
        previous = threshold;
    }
    Ok(())
}
