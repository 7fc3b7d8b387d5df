//! Trait interfaces for the Sluice ledger.
//!
//! These traits define the contracts at the ledger boundary:
//! - [`HeightSource`]: the injected monotonic height counter
//! - [`TokenView`]: read-only reward-token balances (the ledger implements)
//! - [`StakeView`]: read-only pool stakes (the ledger implements)
//!
//! Collaborators that only read (vaults, voting-power aggregators) depend on
//! the views, never on the ledger type itself.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::NotFoundError;
use crate::types::{AccountId, Amount, Height, PoolId};

/// Supplies the current height. Read once per ledger operation.
pub trait HeightSource: Send + Sync {
    fn current_height(&self) -> Height;
}

/// Height counter driven by hand, for tests and scripted replays.
///
/// Never moves backwards: [`advance_to`](Self::advance_to) ignores lower values.
#[derive(Debug, Default)]
pub struct ManualHeight(AtomicU64);

impl ManualHeight {
    pub fn new(height: Height) -> Self {
        Self(AtomicU64::new(height))
    }

    /// Move to `height` if it is ahead of the current value. Returns the resulting height.
    pub fn advance_to(&self, height: Height) -> Height {
        self.0.fetch_max(height, Ordering::SeqCst).max(height)
    }

    /// Move forward by `blocks`. Returns the resulting height.
    pub fn advance_by(&self, blocks: u64) -> Height {
        self.0.fetch_add(blocks, Ordering::SeqCst) + blocks
    }
}

impl HeightSource for ManualHeight {
    fn current_height(&self) -> Height {
        self.0.load(Ordering::SeqCst)
    }
}

impl<T: HeightSource + ?Sized> HeightSource for std::sync::Arc<T> {
    fn current_height(&self) -> Height {
        (**self).current_height()
    }
}

/// Read-only view of reward-token balances.
pub trait TokenView: Send + Sync {
    /// Spendable balance.
    fn balance_of(&self, account: &AccountId) -> Amount;

    /// Locked (vesting) balance.
    fn lock_of(&self, account: &AccountId) -> Amount;

    /// Spendable plus locked.
    ///
    /// Default implementation sums [`balance_of`](Self::balance_of) and [`lock_of`](Self::lock_of).
    fn total_balance_of(&self, account: &AccountId) -> Amount {
        self.balance_of(account) + self.lock_of(account)
    }

    /// Everything ever minted; bounded by the cap.
    fn total_supply(&self) -> Amount;

    /// Sum of every account's locked balance.
    fn total_lock(&self) -> Amount;

    /// Supply that is not locked.
    fn unlocked_supply(&self) -> Amount {
        self.circulating_supply() - self.total_lock()
    }

    /// Supply held by accounts, locked or not.
    fn circulating_supply(&self) -> Amount {
        self.total_supply()
    }
}

/// Read-only view of pool stakes.
pub trait StakeView: Send + Sync {
    fn pool_count(&self) -> usize;

    /// Amount `account` has staked in `pool`.
    fn staked_of(&self, pool: PoolId, account: &AccountId) -> Result<Amount, NotFoundError>;

    /// Total staked in `pool` across all accounts.
    fn pool_staked_total(&self, pool: PoolId) -> Result<Amount, NotFoundError>;
}
