//! Reward-token book with capped supply and linear vesting.
//!
//! Every account has a spendable balance and a locked balance. Locked value
//! is released linearly between `lock_from_height` and `lock_to_height`,
//! measured from the account's last unlock, so each partial unlock releases a
//! fraction of what remains rather than of the original grant.
//!
//! Invariants kept by every method:
//! - `total_supply <= cap`
//! - `total_locked == sum(locked)` and `total_supply == sum(balance + locked)`
//! - `manual_minted <= manual_mint_limit`, never decreasing

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sluice_core::error::{InvariantError, LedgerError, NotFoundError, ValidationError};
use sluice_core::math::{checked_add, mul_div};
use sluice_core::types::{AccountId, Amount, Height, amount_serde};

/// Locked balance of one account.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VestingAccount {
    #[serde(with = "amount_serde")]
    pub locked: Amount,
    pub last_unlock_height: Height,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VestingLedger {
    balances: BTreeMap<AccountId, Amount>,
    vesting: BTreeMap<AccountId, VestingAccount>,
    total_supply: Amount,
    total_locked: Amount,
    cap: Amount,
    manual_minted: Amount,
    manual_mint_limit: Amount,
    lock_from_height: Height,
    lock_to_height: Height,
}

impl VestingLedger {
    pub fn new(
        cap: Amount,
        manual_mint_limit: Amount,
        lock_from_height: Height,
        lock_to_height: Height,
    ) -> Result<Self, ValidationError> {
        check_window(lock_from_height, lock_to_height)?;
        Ok(Self {
            balances: BTreeMap::new(),
            vesting: BTreeMap::new(),
            total_supply: 0,
            total_locked: 0,
            cap,
            manual_minted: 0,
            manual_mint_limit,
            lock_from_height,
            lock_to_height,
        })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn lock_of(&self, account: &AccountId) -> Amount {
        self.vesting.get(account).map_or(0, |v| v.locked)
    }

    pub fn vesting_account(&self, account: &AccountId) -> Option<&VestingAccount> {
        self.vesting.get(account)
    }

    pub fn last_unlock_height(&self, account: &AccountId) -> Height {
        self.vesting.get(account).map_or(0, |v| v.last_unlock_height)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn total_locked(&self) -> Amount {
        self.total_locked
    }

    pub fn cap(&self) -> Amount {
        self.cap
    }

    pub fn manual_minted(&self) -> Amount {
        self.manual_minted
    }

    pub fn manual_mint_limit(&self) -> Amount {
        self.manual_mint_limit
    }

    pub fn lock_window(&self) -> (Height, Height) {
        (self.lock_from_height, self.lock_to_height)
    }

    /// Every account with a spendable or locked balance, in id order.
    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        let mut ids: Vec<&AccountId> = self.balances.keys().chain(self.vesting.keys()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter()
    }

    /// Fails with `CapExceeded` if minting `amount` would breach the cap.
    pub fn ensure_cap(&self, amount: Amount) -> Result<(), InvariantError> {
        let exceeded = InvariantError::CapExceeded { cap: self.cap, supply: self.total_supply, requested: amount };
        match self.total_supply.checked_add(amount) {
            Some(next) if next <= self.cap => Ok(()),
            _ => Err(exceeded),
        }
    }

    /// Amount `account` could release at `height`.
    pub fn can_unlock_amount(&self, account: &AccountId, height: Height) -> Result<Amount, InvariantError> {
        let Some(entry) = self.vesting.get(account) else {
            return Ok(0);
        };
        if height <= self.lock_from_height || entry.locked == 0 {
            return Ok(0);
        }
        if height >= self.lock_to_height {
            return Ok(entry.locked);
        }
        let last = entry.last_unlock_height.max(self.lock_from_height);
        if height <= last {
            return Ok(0);
        }
        let elapsed = (height - last) as u128;
        let remaining = (self.lock_to_height - last) as u128;
        mul_div(entry.locked, elapsed, remaining)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Mint spendable tokens to `account`, bounded by the cap.
    pub fn mint(&mut self, account: AccountId, amount: Amount) -> Result<(), InvariantError> {
        self.ensure_cap(amount)?;
        self.total_supply += amount;
        let balance = self.balances.entry(account).or_default();
        *balance = checked_add(*balance, amount)?;
        Ok(())
    }

    /// Mint straight into `account`'s lock, bounded by the cap.
    pub fn lock(&mut self, account: AccountId, amount: Amount) -> Result<(), InvariantError> {
        self.ensure_cap(amount)?;
        self.total_supply += amount;
        self.add_locked(account, amount)
    }

    /// Move `amount` of `account`'s spendable balance into its lock.
    pub fn lock_balance(&mut self, account: AccountId, amount: Amount) -> Result<(), InvariantError> {
        self.debit(account, amount)?;
        self.add_locked(account, amount)
    }

    /// Release everything unlockable at `height` into the spendable balance.
    pub fn unlock(&mut self, account: AccountId, height: Height) -> Result<Amount, LedgerError> {
        let amount = self.can_unlock_amount(&account, height)?;
        if amount == 0 {
            return Err(NotFoundError::NothingToUnlock(account).into());
        }
        if let Some(entry) = self.vesting.get_mut(&account) {
            entry.locked -= amount;
            entry.last_unlock_height = height;
        }
        self.total_locked -= amount;
        let balance = self.balances.entry(account).or_default();
        *balance = checked_add(*balance, amount)?;
        Ok(amount)
    }

    /// Ad hoc mint outside the emission schedule; bounded by the manual
    /// limit and by the cap.
    pub fn manual_mint(&mut self, account: AccountId, amount: Amount) -> Result<(), InvariantError> {
        let over_limit = InvariantError::ManualMintLimitExceeded {
            limit: self.manual_mint_limit,
            minted: self.manual_minted,
            requested: amount,
        };
        match self.manual_minted.checked_add(amount) {
            Some(next) if next <= self.manual_mint_limit => {
                self.mint(account, amount)?;
                self.manual_minted = next;
                Ok(())
            }
            _ => Err(over_limit),
        }
    }

    pub fn transfer(&mut self, from: AccountId, to: AccountId, amount: Amount) -> Result<(), InvariantError> {
        self.debit(from, amount)?;
        let balance = self.balances.entry(to).or_default();
        *balance = checked_add(*balance, amount)?;
        Ok(())
    }

    pub fn set_cap(&mut self, cap: Amount) -> Result<(), ValidationError> {
        if cap < self.total_supply {
            return Err(ValidationError::CapBelowSupply { cap, supply: self.total_supply });
        }
        self.cap = cap;
        Ok(())
    }

    pub fn set_lock_window(&mut self, from: Height, to: Height) -> Result<(), ValidationError> {
        check_window(from, to)?;
        self.lock_from_height = from;
        self.lock_to_height = to;
        Ok(())
    }

    fn debit(&mut self, account: AccountId, amount: Amount) -> Result<(), InvariantError> {
        let available = self.balance_of(&account);
        if available < amount {
            return Err(InvariantError::InsufficientBalance { account, available, requested: amount });
        }
        if let Some(balance) = self.balances.get_mut(&account) {
            *balance -= amount;
        }
        Ok(())
    }

    fn add_locked(&mut self, account: AccountId, amount: Amount) -> Result<(), InvariantError> {
        let lock_from = self.lock_from_height;
        let entry = self.vesting.entry(account).or_default();
        entry.locked = checked_add(entry.locked, amount)?;
        if entry.last_unlock_height < lock_from {
            entry.last_unlock_height = lock_from;
        }
        self.total_locked = checked_add(self.total_locked, amount)?;
        Ok(())
    }
}

fn check_window(from: Height, to: Height) -> Result<(), ValidationError> {
    if from >= to {
        return Err(ValidationError::InvalidLockWindow { from, to });
    }
    Ok(())
}
