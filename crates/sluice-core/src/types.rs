//! Core ledger types: identifiers, amounts and heights.
//!
//! All token quantities are [`Amount`]s with 18 implied decimals
//! (see [`ONE_TOKEN`](crate::constants::ONE_TOKEN)).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Token quantity in base units.
pub type Amount = u128;

/// Externally supplied monotonic height.
pub type Height = u64;

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; 20]);

        impl $name {
            /// The all-zero identifier.
            pub const ZERO: Self = Self([0u8; 20]);

            pub fn from_bytes(bytes: [u8; 20]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 20] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 20]
            }

            /// Deterministic identifier with every byte set to `seed`.
            pub fn from_seed(seed: u8) -> Self {
                Self([seed; 20])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(digits)
                    .map_err(|_| ValidationError::InvalidIdentifier(s.to_string()))?;
                let bytes: [u8; 20] = bytes
                    .try_into()
                    .map_err(|_| ValidationError::InvalidIdentifier(s.to_string()))?;
                Ok(Self(bytes))
            }
        }

        impl From<[u8; 20]> for $name {
            fn from(bytes: [u8; 20]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_id! {
    /// A 20-byte account address, written as `0x`-prefixed hex.
    AccountId
}

hex_id! {
    /// A 20-byte identifier of a stakeable asset (an LP share token, say).
    AssetId
}

impl AccountId {
    /// Internal account that holds farmer rewards between accrual and payout.
    pub const REWARD_RESERVE: Self = Self(*b"sluice.rewardreserve");
}

/// Index of a pool in the registry, assigned in insertion order.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PoolId(pub u32);

impl PoolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render a base-unit amount as a decimal token string, trimming trailing zeros.
pub fn format_units(amount: Amount) -> String {
    let one = crate::constants::ONE_TOKEN;
    let whole = amount / one;
    let frac = amount % one;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:018}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Serde adapter for [`Amount`]: writes decimal strings, reads strings, integers
/// or whole floats small enough to be exact.
pub mod amount_serde {
    use super::Amount;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
        type Value = Amount;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
            Ok(v as Amount)
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
            u128::try_from(v).map_err(|_| E::custom(format!("negative amount: {v}")))
        }

        /// Whole floats are accepted only while every integer is exactly representable.
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
            const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
            if v >= 0.0 && v.fract() == 0.0 && v <= MAX_EXACT {
                Ok(v as Amount)
            } else {
                Err(E::custom(format!("amount {v} is not an exact integer; write it as a decimal string")))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
            v.trim()
                .replace('_', "")
                .parse()
                .map_err(|_| E::custom(format!("invalid amount: {v}")))
        }
    }
}
