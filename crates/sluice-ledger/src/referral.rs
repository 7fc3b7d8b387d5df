//! Referral attribution index.
//!
//! Deposits made with a referrer add their gross amount to the
//! `(referrer, referred)` edge; withdrawals shrink the edge by the fraction
//! of stake withdrawn. The referred count only grows: an edge that decays to
//! zero still counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sluice_core::error::InvariantError;
use sluice_core::math::{checked_add, mul_div};
use sluice_core::types::{AccountId, Amount, amount_serde};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferralEdge {
    pub referrer: AccountId,
    pub referred: AccountId,
    #[serde(with = "amount_serde")]
    pub attributed_value: Amount,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReferralTotals {
    pub referrer: AccountId,
    #[serde(with = "amount_serde")]
    pub total_attributed_value: Amount,
    pub referred_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferralTracker {
    edges: BTreeMap<(AccountId, AccountId), Amount>,
    totals: BTreeMap<AccountId, ReferralTotals>,
}

impl ReferralTracker {
    pub fn attributed_value(&self, referrer: &AccountId, referred: &AccountId) -> Amount {
        self.edges.get(&(*referrer, *referred)).copied().unwrap_or(0)
    }

    pub fn totals(&self, referrer: &AccountId) -> ReferralTotals {
        self.totals
            .get(referrer)
            .copied()
            .unwrap_or(ReferralTotals { referrer: *referrer, ..ReferralTotals::default() })
    }

    /// Every edge originating at `referrer`.
    pub fn edges_of(&self, referrer: &AccountId) -> Vec<ReferralEdge> {
        self.edges
            .range((*referrer, AccountId::ZERO)..=(*referrer, AccountId([0xff; 20])))
            .map(|(&(referrer, referred), &attributed_value)| ReferralEdge { referrer, referred, attributed_value })
            .collect()
    }

    pub fn all_totals(&self) -> impl Iterator<Item = &ReferralTotals> {
        self.totals.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = ReferralEdge> + '_ {
        self.edges
            .iter()
            .map(|(&(referrer, referred), &attributed_value)| ReferralEdge { referrer, referred, attributed_value })
    }

    pub fn record(&mut self, referrer: AccountId, referred: AccountId, amount: Amount) -> Result<(), InvariantError> {
        let totals = self
            .totals
            .entry(referrer)
            .or_insert(ReferralTotals { referrer, ..ReferralTotals::default() });
        let key = (referrer, referred);
        if !self.edges.contains_key(&key) {
            totals.referred_count += 1;
        }
        let edge = self.edges.entry(key).or_default();
        *edge = checked_add(*edge, amount)?;
        totals.total_attributed_value = checked_add(totals.total_attributed_value, amount)?;
        Ok(())
    }

    /// Shrink the edge by `withdrawn / staked_before` of its value. Returns the decrement.
    pub fn reduce(
        &mut self,
        referrer: AccountId,
        referred: AccountId,
        withdrawn: Amount,
        staked_before: Amount,
    ) -> Result<Amount, InvariantError> {
        let current = self.attributed_value(&referrer, &referred);
        if current == 0 || staked_before == 0 {
            return Ok(0);
        }
        let decrement = mul_div(current, withdrawn, staked_before)?.min(current);
        self.apply_decrement(referrer, referred, decrement);
        Ok(decrement)
    }

    /// Zero the edge. Returns the decrement.
    pub fn clear(&mut self, referrer: AccountId, referred: AccountId) -> Amount {
        let current = self.attributed_value(&referrer, &referred);
        self.apply_decrement(referrer, referred, current);
        current
    }

    fn apply_decrement(&mut self, referrer: AccountId, referred: AccountId, decrement: Amount) {
        if let Some(edge) = self.edges.get_mut(&(referrer, referred)) {
            *edge -= decrement;
        }
        if let Some(totals) = self.totals.get_mut(&referrer) {
            totals.total_attributed_value = totals.total_attributed_value.saturating_sub(decrement);
        }
    }
}
