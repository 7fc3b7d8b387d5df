//! # sluice-core
//! Foundation types, pure schedules and traits for the Sluice reward ledger.

pub mod constants;
pub mod emission;
pub mod error;
pub mod fees;
pub mod math;
pub mod traits;
pub mod types;
