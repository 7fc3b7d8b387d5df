//! Ledger constants. All token amounts carry 18 implied decimals.

use crate::types::Amount;

/// One whole reward token.
pub const ONE_TOKEN: Amount = 1_000_000_000_000_000_000;

/// Scale applied to `acc_reward_per_share` so that per-share division keeps
/// twelve extra digits of precision.
pub const ACC_PRECISION: Amount = 1_000_000_000_000;

/// Denominator for every basis-point quantity.
pub const BPS_PRECISION: u32 = 10_000;

/// Default hard supply cap: 500 million tokens.
pub const DEFAULT_CAP: Amount = 500_000_000 * ONE_TOKEN;

/// Default ceiling on ad hoc manual mints: 50 thousand tokens.
pub const DEFAULT_MANUAL_MINT_LIMIT: Amount = 50_000 * ONE_TOKEN;

/// Default deposit fee, withheld and redistributed in full.
pub const DEFAULT_DEPOSIT_FEE_BPS: u32 = 75;

/// Default fraction of every farmer payout that is locked during the bonus window.
pub const DEFAULT_FARMER_LOCKED_BPS: u32 = 9_500;

/// Weekly emission multipliers, one per halving stage.
///
/// The table front-loads emission (256x in the first stage) and then
/// oscillates through several bonus waves before tapering to 1x.
pub const DEFAULT_MULTIPLIERS: [u64; 104] = [
    256, 128, 64, 32, 32, 16, 16, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 4, 4, 4, 4, 4, 4, 2, 2,
    2, 2, 2, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 4, 4, 4, 8, 8, 8, 8, 8, 16, 16, 16, 16, 16, 16, 16,
    16, 16, 16, 8, 8, 8, 8, 8, 8, 4, 4, 2, 2, 1, 1, 1, 1, 1, 1, 2, 2, 4, 4, 4, 4, 8, 8, 8, 8, 8,
    16, 16, 32, 32, 32, 32, 16, 8, 4, 2, 1, 1, 1, 1, 2, 2,
];

/// Default stage length in blocks (one week of 3-second blocks).
pub const DEFAULT_HALVING_INTERVAL: u64 = 201_600;

/// Default per-block base reward before multipliers.
pub const DEFAULT_BASE_REWARD_PER_BLOCK: Amount = ONE_TOKEN / 10;

/// Default withdrawal fee tiers as `(min_elapsed, max_elapsed, fee_bps)`.
///
/// The same rate is withheld from the withdrawer and redistributed to the
/// fee destination. `None` marks the open-ended last tier.
pub const DEFAULT_FEE_TIERS: [(u64, Option<u64>, u32); 8] = [
    (0, Some(0), 2_500),
    (1, Some(274), 800),
    (275, Some(6_600), 400),
    (6_601, Some(19_800), 200),
    (19_801, Some(33_000), 100),
    (33_001, Some(90_720), 50),
    (90_721, Some(181_440), 25),
    (181_441, None, 1),
];
