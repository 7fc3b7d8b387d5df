//! # sluice-ledger
//! Staking-reward ledger: pool registry, stake accounting, referral tracking
//! and the capped, linearly vested reward token they mint into.
//!
//! All state lives in a single [`LedgerState`](state::LedgerState); the
//! [`Ledger`](ledger::Ledger) facade serializes operations behind one lock and
//! commits each one atomically.

pub mod auth;
pub mod config;
pub mod ledger;
pub mod payout;
pub mod pool;
pub mod referral;
pub mod stake;
pub mod state;
pub mod vesting;

pub use auth::{AdminCap, OwnerCap, Roles};
pub use config::LedgerConfig;
pub use ledger::Ledger;
pub use payout::{Fund, FundShare, PayoutSplit};
pub use stake::{DepositReceipt, RewardPayout, StakePosition, WithdrawReceipt};
pub use state::{LedgerSnapshot, LedgerState};
