//! Error types for the Sluice ledger.
//!
//! Every variant is raised before any state is mutated; the ledger facade
//! discards its working copy whenever an operation returns `Err`.
use thiserror::Error;

use crate::types::{AccountId, Amount, AssetId, PoolId};

/// Malformed input: zero amounts, broken tables, duplicate registrations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("amount must be non-zero")] ZeroAmount,
    #[error("asset {0} already has a pool")] DuplicatePool(AssetId),
    #[error("halving thresholds must strictly increase (index {index})")] NonIncreasingThresholds { index: usize },
    #[error("threshold table too short: {got} < {required} multipliers")] ThresholdTableTooShort { got: usize, required: usize },
    #[error("multiplier table longer than thresholds: {got} > {max}")] MultiplierTableTooLong { got: usize, max: usize },
    #[error("multiplier table is empty")] EmptyMultiplierTable,
    #[error("malformed fee table: {0}")] MalformedFeeTable(String),
    #[error("no fee tier covers elapsed {0}")] NoMatchingTier(u64),
    #[error("basis points out of range: {0}")] BpsOutOfRange(u32),
    #[error("payout shares exceed 100%: {0} bps")] PayoutSplitTooLarge(u32),
    #[error("invalid lock window: from {from} must be below to {to}")] InvalidLockWindow { from: u64, to: u64 },
    #[error("cap {cap} below current supply {supply}")] CapBelowSupply { cap: Amount, supply: Amount },
    #[error("invalid identifier: {0}")] InvalidIdentifier(String),
    #[error("reserved account {0}")] ReservedAccount(AccountId),
}

/// A privileged operation was invoked without the required role.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("{0} is not authorized")] NotAuthorized(AccountId),
    #[error("{0} is not the owner")] NotOwner(AccountId),
    #[error("owner cannot remove itself")] CannotRemoveSelf,
}

/// A global or per-account limit would be breached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("cap exceeded: supply {supply} + {requested} > cap {cap}")] CapExceeded { cap: Amount, supply: Amount, requested: Amount },
    #[error("manual mint limit exceeded: minted {minted} + {requested} > limit {limit}")] ManualMintLimitExceeded { limit: Amount, minted: Amount, requested: Amount },
    #[error("insufficient stake: requested {requested}, staked {available}")] InsufficientStake { requested: Amount, available: Amount },
    #[error("insufficient balance for {account}: have {available}, need {requested}")] InsufficientBalance { account: AccountId, available: Amount, requested: Amount },
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

/// The addressed entity does not exist or holds nothing to act on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("pool not found: {0}")] PoolNotFound(PoolId),
    #[error("nothing to unlock for {0}")] NothingToUnlock(AccountId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)] Validation(#[from] ValidationError),
    #[error(transparent)] Authorization(#[from] AuthorizationError),
    #[error(transparent)] Invariant(#[from] InvariantError),
    #[error(transparent)] NotFound(#[from] NotFoundError),
}
