//! Shared fixtures for the scenario and property tests.

use std::sync::Arc;

use sluice_core::constants::ONE_TOKEN;
use sluice_core::fees::DepositFee;
use sluice_core::traits::{HeightSource, ManualHeight};
use sluice_core::types::{AccountId, Amount, AssetId, Height, PoolId};
use sluice_ledger::config::PoolConfig;
use sluice_ledger::{AdminCap, Ledger, LedgerConfig, PayoutSplit};

pub type TestLedger = Ledger<Arc<ManualHeight>>;

/// Stake asset of the first pool in every fixture.
pub const LP: AssetId = AssetId([0x11; 20]);

pub const POOL: PoolId = PoolId(0);

/// Account id from a seed byte.
pub fn acct(seed: u8) -> AccountId {
    AccountId::from_seed(seed)
}

/// Parse a decimal token amount ("254.08") into base units.
pub fn tokens(value: &str) -> Amount {
    let (whole, frac) = value.split_once('.').unwrap_or((value, ""));
    assert!(frac.len() <= 18, "too many decimals in {value}");
    let whole: Amount = whole.parse().unwrap();
    let padded = format!("{frac:0<18}");
    whole * ONE_TOKEN + padded.parse::<Amount>().unwrap()
}

/// Address receiving the development fund mints and all stake fees.
pub fn dev_fund() -> AccountId {
    PayoutSplit::default().development.account
}

/// One pool (`LP`, weight 1), a one-token base reward, the default tables
/// and the given start and stage length.
pub fn config(start_height: Height, halving_interval: u64) -> LedgerConfig {
    LedgerConfig {
        start_height,
        halving_interval,
        base_reward_per_block: ONE_TOKEN,
        pools: vec![PoolConfig { stake_asset: LP, allocation_weight: 1 }],
        ..LedgerConfig::default()
    }
}

/// Same as [`config`] with no deposit fee.
pub fn config_without_deposit_fee(start_height: Height, halving_interval: u64) -> LedgerConfig {
    LedgerConfig { deposit_fee: DepositFee::NONE, ..config(start_height, halving_interval) }
}

pub fn ledger_at(config: &LedgerConfig, height: Height) -> TestLedger {
    Ledger::new(config, Arc::new(ManualHeight::new(height))).unwrap()
}

/// Move the ledger's height forward; never backwards.
pub fn advance(ledger: &TestLedger, height: Height) {
    ledger.height_source().advance_to(height);
    assert_eq!(ledger.height_source().current_height(), height, "height moved backwards");
}

pub fn admin(ledger: &TestLedger) -> AdminCap {
    ledger.admin_cap(ledger.owner()).unwrap()
}
